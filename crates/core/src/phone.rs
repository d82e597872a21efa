//! Phone number candidate expansion
//!
//! The CRM stores phone numbers exactly as reps typed them, and the search
//! API only supports substring (`LIKE`) filters with no normalized phone
//! index. Recall therefore comes from enumerating the textual shapes a US
//! number is commonly stored in, not from normalizing stored data that this
//! service cannot rewrite.

/// Expand a free-form phone string into every representation worth searching.
///
/// The returned list is deduplicated and keeps insertion order (raw input
/// first, digits-only second) so callers get stable, debuggable output. Order
/// carries no matching semantics.
///
/// Inputs whose digit count is not 10+ or exactly 7 (extensions, short codes,
/// non-US lengths) fall through to the base pair only. This is a deliberate
/// coarse heuristic, not an international phone parser.
pub fn candidates(raw: &str) -> Vec<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut out: Vec<String> = Vec::with_capacity(11);
    push_unique(&mut out, raw.to_string());
    push_unique(&mut out, digits.clone());

    if digits.len() >= 10 {
        // Treat the final 10 digits as area + prefix + line; anything before
        // them is a country code we drop for the formatted variants.
        let last10 = &digits[digits.len() - 10..];
        let (area, rest) = last10.split_at(3);
        let (prefix, line) = rest.split_at(3);

        push_unique(&mut out, format!("{area}-{prefix}-{line}"));
        push_unique(&mut out, format!("({area}) {prefix}-{line}"));
        push_unique(&mut out, format!("{area}.{prefix}.{line}"));
        push_unique(&mut out, last10.to_string());
        push_unique(&mut out, format!("1{last10}"));
        push_unique(&mut out, format!("+1{last10}"));
        push_unique(&mut out, format!("+1-{area}-{prefix}-{line}"));
        // Area-code-free forms catch records stored as local numbers.
        push_unique(&mut out, format!("{prefix}-{line}"));
        push_unique(&mut out, format!("{prefix}{line}"));
    } else if digits.len() == 7 {
        let (prefix, line) = digits.split_at(3);
        push_unique(&mut out, format!("{prefix}-{line}"));
        push_unique(&mut out, format!("{prefix}.{line}"));
    }

    out
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !out.iter().any(|c| c == &candidate) {
        out.push(candidate);
    }
}
