//! SOQL statement construction
//!
//! Filters are assembled from typed clauses with every value escaped before
//! it reaches the statement, so tool arguments (phone strings in particular)
//! can never break out of their quoted literal.

use chrono::NaiveDate;

/// Escape a value for use inside a single-quoted SOQL string literal.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value for a LIKE pattern: literal escaping plus the LIKE
/// wildcards, so a stored `%` or `_` is matched literally.
pub fn escape_like(value: &str) -> String {
    let mut out = String::new();
    for c in escape(value).chars() {
        match c {
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            _ => out.push(c),
        }
    }
    out
}

/// Builder for simple SELECT statements over one object.
///
/// Clauses are ANDed together; `like_any` produces one OR group across the
/// given fields and values (the phone-candidate fan-out).
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    object: String,
    fields: Vec<String>,
    clauses: Vec<String>,
    limit: Option<u32>,
}

impl QueryBuilder {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            fields: Vec::new(),
            clauses: Vec::new(),
            limit: None,
        }
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// `field = 'value'` with escaping.
    pub fn eq(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("{field} = '{}'", escape(value)));
        self
    }

    /// `field = true|false`.
    pub fn eq_bool(mut self, field: &str, value: bool) -> Self {
        self.clauses.push(format!("{field} = {value}"));
        self
    }

    /// Date equality; SOQL dates are unquoted `YYYY-MM-DD` literals.
    pub fn on_date(mut self, field: &str, date: NaiveDate) -> Self {
        self.clauses
            .push(format!("{field} = {}", date.format("%Y-%m-%d")));
        self
    }

    /// One OR group of substring matches: every `field LIKE '%value%'`
    /// combination for the given fields and values.
    pub fn like_any<S: AsRef<str>>(mut self, fields: &[&str], values: &[S]) -> Self {
        let mut alternatives = Vec::with_capacity(fields.len() * values.len());
        for value in values {
            let pattern = escape_like(value.as_ref());
            if pattern.is_empty() {
                continue;
            }
            for field in fields {
                alternatives.push(format!("{field} LIKE '%{pattern}%'"));
            }
        }
        if !alternatives.is_empty() {
            self.clauses.push(format!("({})", alternatives.join(" OR ")));
        }
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> String {
        let fields = if self.fields.is_empty() {
            "Id".to_string()
        } else {
            self.fields.join(", ")
        };

        let mut statement = format!("SELECT {fields} FROM {}", self.object);
        if !self.clauses.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(&self.clauses.join(" AND "));
        }
        if let Some(limit) = self.limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }
        statement
    }
}
