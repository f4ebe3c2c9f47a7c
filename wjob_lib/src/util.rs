use chrono::{DateTime, Utc};

pub const RECORD_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// UTC timestamp as written into records, no zone suffix
pub fn record_timestamp(at: DateTime<Utc>) -> String {
    at.format(RECORD_DATETIME_FORMAT).to_string()
}

/// share of `done` in `total` as percent
pub fn progress_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * done as f64 / total as f64
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_record_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!("2024-05-01 09:03:07", record_timestamp(at));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(0.0, progress_percent(0, 3));
        assert!((progress_percent(1, 3) - 33.333).abs() < 0.01);
        assert_eq!(100.0, progress_percent(3, 3));
        assert_eq!(100.0, progress_percent(0, 0));
    }
}
