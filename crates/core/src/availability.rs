//! Business-hours availability computation
//!
//! Given a day's booked intervals and the office hours, compute the open
//! appointment slots. All arithmetic runs in a single naive civil-time frame:
//! stored timestamps are taken at face value as business-local clock time and
//! compared without timezone-database conversion. Daylight-saving transitions
//! are therefore not corrected for; `chrono-tz` conversion at the ingestion
//! boundary would be the fix if that ever matters in practice.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Office hours and slot granularity for one business calendar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusinessHours {
    /// First bookable hour of the day (0-23).
    pub open_hour: u32,
    /// Closing hour, exclusive (0-24). No slot may end after it.
    pub close_hour: u32,
    /// Slot length in minutes.
    pub slot_minutes: u32,
}

impl BusinessHours {
    /// open < close, positive slot length, close within the day.
    pub fn is_valid(&self) -> bool {
        self.open_hour < self.close_hour && self.close_hour <= 24 && self.slot_minutes > 0
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 22,
            slot_minutes: 30,
        }
    }
}

/// One reserved range read from the calendar. Immutable once read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Result of an availability computation for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayAvailability {
    /// Non-business day (or unusable configuration): nothing is offered.
    Closed,
    /// Open slot labels in chronological order, 12-hour clock form.
    Open(Vec<String>),
}

impl DayAvailability {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Compute the free slots for `date`.
///
/// Weekends are closed outright. Candidate starts run from `open_hour:00` in
/// `slot_minutes` steps; a candidate whose end would pass `close_hour:00` is
/// dropped, so a trailing partial window is never offered. A booking consumes
/// the slot containing each step point walked from its start (inclusive) to
/// its end (exclusive): partial overlap at the head of a booking still takes
/// the whole slot. Degenerate intervals (`end <= start`) are ignored, and an
/// invalid `hours` fails closed rather than guessing.
pub fn available_slots(
    date: NaiveDate,
    booked: &[BookedInterval],
    hours: &BusinessHours,
) -> DayAvailability {
    if !hours.is_valid() {
        tracing::warn!(
            open = hours.open_hour,
            close = hours.close_hour,
            slot = hours.slot_minutes,
            "unusable business hours, offering no availability"
        );
        return DayAvailability::Closed;
    }

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return DayAvailability::Closed;
    }

    let open_min = i64::from(hours.open_hour) * 60;
    let close_min = i64::from(hours.close_hour) * 60;
    let step = i64::from(hours.slot_minutes);

    let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let day_end = day_start + chrono::Duration::days(1);

    let mut taken: Vec<i64> = Vec::new();
    for interval in booked {
        if interval.end <= interval.start {
            continue;
        }
        if interval.end <= day_start || interval.start >= day_end {
            continue;
        }

        // Walk in slot-length steps from the booking's own start so the
        // touched points keep the booking's phase, skipping whole steps that
        // land before the requested day.
        let mut t = interval.start;
        if t < day_start {
            let behind = (day_start - t).num_minutes();
            let skip = (behind + step - 1) / step;
            t += chrono::Duration::minutes(skip * step);
        }
        while t < interval.end && t < day_end {
            let minute_of_day = i64::from(t.hour()) * 60 + i64::from(t.minute());
            let offset = minute_of_day - open_min;
            let slot_start = open_min + offset.div_euclid(step) * step;
            if !taken.contains(&slot_start) {
                taken.push(slot_start);
            }
            t += chrono::Duration::minutes(step);
        }
    }

    let mut slots = Vec::new();
    let mut m = open_min;
    while m + step <= close_min {
        if !taken.contains(&m) {
            slots.push(format_12h(m));
        }
        m += step;
    }
    DayAvailability::Open(slots)
}

/// Render minutes-from-midnight as a 12-hour clock label (`9:00 AM`).
///
/// Display only; slot comparison always runs on the 24-hour representation.
pub fn format_12h(minutes_from_midnight: i64) -> String {
    let hour = minutes_from_midnight / 60;
    let minute = minutes_from_midnight % 60;
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{minute:02} {meridiem}")
}

/// Parse a slot label back into minutes from midnight.
///
/// Accepts the 12-hour form this module emits (`3:00 PM`, case-insensitive)
/// and the plain 24-hour form (`15:00`).
pub fn parse_slot_label(label: &str) -> Option<i64> {
    let trimmed = label.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (clock, meridiem) = match upper.strip_suffix("AM") {
        Some(rest) => (rest.trim_end(), Some(false)),
        None => match upper.strip_suffix("PM") {
            Some(rest) => (rest.trim_end(), Some(true)),
            None => (upper.as_str(), None),
        },
    };

    let (h, m) = clock.split_once(':')?;
    let hour: i64 = h.trim().parse().ok()?;
    let minute: i64 = m.trim().parse().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (pm, hour) {
                (false, 12) => 0,
                (false, h) => h,
                (true, 12) => 12,
                (true, h) => h + 12,
            }
        }
        None => {
            if hour > 23 {
                return None;
            }
            hour
        }
    };

    Some(hour * 60 + minute)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours() -> BusinessHours {
        BusinessHours::default()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    // 2026-08-05 is a Wednesday, 2026-08-08 a Saturday, 2026-08-09 a Sunday.
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    }

    #[test]
    fn weekend_is_closed_even_with_bookings() {
        let saturday = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 9).unwrap();
        let booked = vec![BookedInterval {
            start: at(saturday, 10, 0),
            end: at(saturday, 11, 0),
        }];

        assert_eq!(available_slots(saturday, &booked, &hours()), DayAvailability::Closed);
        assert_eq!(available_slots(sunday, &[], &hours()), DayAvailability::Closed);
    }

    #[test]
    fn empty_weekday_offers_the_full_grid() {
        let result = available_slots(wednesday(), &[], &hours());
        let DayAvailability::Open(slots) = result else {
            panic!("weekday should be open");
        };
        assert_eq!(slots.len(), 26);
        assert_eq!(slots.first().unwrap(), "9:00 AM");
        assert_eq!(slots.last().unwrap(), "9:30 PM");
    }

    #[test]
    fn exact_slot_booking_removes_only_that_slot() {
        let day = wednesday();
        let booked = vec![BookedInterval {
            start: at(day, 9, 0),
            end: at(day, 9, 30),
        }];

        let DayAvailability::Open(slots) = available_slots(day, &booked, &hours()) else {
            panic!("weekday should be open");
        };
        assert_eq!(slots.len(), 25);
        assert!(!slots.contains(&"9:00 AM".to_string()));
        assert!(slots.contains(&"9:30 AM".to_string()));
    }

    #[test]
    fn off_grid_booking_consumes_the_slots_it_walks() {
        let day = wednesday();
        let booked = vec![BookedInterval {
            start: at(day, 9, 15),
            end: at(day, 10, 15),
        }];

        let DayAvailability::Open(slots) = available_slots(day, &booked, &hours()) else {
            panic!("weekday should be open");
        };
        assert!(!slots.contains(&"9:00 AM".to_string()));
        assert!(!slots.contains(&"9:30 AM".to_string()));
        assert!(slots.contains(&"10:00 AM".to_string()));
        assert_eq!(slots.len(), 24);
    }

    #[test]
    fn inverted_and_zero_length_intervals_are_ignored() {
        let day = wednesday();
        let booked = vec![
            BookedInterval {
                start: at(day, 11, 0),
                end: at(day, 10, 0),
            },
            BookedInterval {
                start: at(day, 14, 0),
                end: at(day, 14, 0),
            },
        ];

        let DayAvailability::Open(slots) = available_slots(day, &booked, &hours()) else {
            panic!("weekday should be open");
        };
        assert_eq!(slots.len(), 26);
    }

    #[test]
    fn bookings_on_other_days_do_not_leak_in() {
        let day = wednesday();
        let tuesday = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        let booked = vec![BookedInterval {
            start: at(tuesday, 9, 0),
            end: at(tuesday, 17, 0),
        }];

        let DayAvailability::Open(slots) = available_slots(day, &booked, &hours()) else {
            panic!("weekday should be open");
        };
        assert_eq!(slots.len(), 26);
    }

    #[test]
    fn trailing_partial_window_is_never_offered() {
        let short = BusinessHours {
            open_hour: 9,
            close_hour: 12,
            slot_minutes: 45,
        };
        let DayAvailability::Open(slots) = available_slots(wednesday(), &[], &short) else {
            panic!("weekday should be open");
        };
        // 9:00, 9:45, 10:30, 11:15 all end by noon; 12:00 would run past close.
        assert_eq!(slots, vec!["9:00 AM", "9:45 AM", "10:30 AM", "11:15 AM"]);
    }

    #[test]
    fn invalid_hours_fail_closed() {
        let upside_down = BusinessHours {
            open_hour: 18,
            close_hour: 9,
            slot_minutes: 30,
        };
        assert!(available_slots(wednesday(), &[], &upside_down).is_closed());

        let zero_step = BusinessHours {
            open_hour: 9,
            close_hour: 17,
            slot_minutes: 0,
        };
        assert!(available_slots(wednesday(), &[], &zero_step).is_closed());
    }

    #[test]
    fn noon_and_midnight_labels() {
        assert_eq!(format_12h(0), "12:00 AM");
        assert_eq!(format_12h(12 * 60), "12:00 PM");
        assert_eq!(format_12h(12 * 60 + 30), "12:30 PM");
        assert_eq!(format_12h(21 * 60 + 30), "9:30 PM");
    }

    #[test]
    fn slot_labels_round_trip() {
        for minutes in [9 * 60, 12 * 60, 13 * 60 + 30, 21 * 60 + 30] {
            assert_eq!(parse_slot_label(&format_12h(minutes)), Some(minutes));
        }
        assert_eq!(parse_slot_label("15:00"), Some(15 * 60));
        assert_eq!(parse_slot_label("3:00 pm"), Some(15 * 60));
        assert_eq!(parse_slot_label("12:00 AM"), Some(0));
        assert_eq!(parse_slot_label("25:00"), None);
        assert_eq!(parse_slot_label("noonish"), None);
    }
}
