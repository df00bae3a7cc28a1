//! Week arithmetic. A check-in is keyed by the Monday of its week.

use chrono::{Datelike, Duration, NaiveDate};

/// Label format used in charts and pages.
pub const WEEK_FORMAT: &str = "%Y-%m-%d";

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `YYYY-MM-DD` label for a week start.
pub fn format_week(week: NaiveDate) -> String {
    week.format(WEEK_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_is_its_own_week_start() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn sunday_maps_back_six_days() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn week_crossing_year_boundary() {
        let new_year = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(week_start(new_year), NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(format_week(week_start(new_year)), "2024-12-30");
    }
}
