//! Fixed-timezone date helpers.
//!
//! All date-only comparisons happen in Asia/Tokyo (UTC+9, no DST). Instants
//! stay UTC everywhere; the shift happens at the comparison boundary.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Asia::Tokyo;
use chrono_tz::Tz;

/// The nominal time zone of the calendar view.
pub const NOMINAL_TZ: Tz = Tokyo;

/// JST calendar date of a UTC instant.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&NOMINAL_TZ).date_naive()
}

/// JST hour-of-day of a UTC instant.
pub fn local_hour(at: DateTime<Utc>) -> u32 {
    at.with_timezone(&NOMINAL_TZ).hour()
}

/// Today's date in JST.
pub fn local_today() -> NaiveDate {
    local_date(Utc::now())
}

/// UTC instant of JST midnight on `date`.
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    // Tokyo has a fixed UTC offset, so local midnight is never ambiguous.
    NOMINAL_TZ
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .expect("Asia/Tokyo has a fixed UTC offset")
        .with_timezone(&Utc)
}

/// The seven JST dates of the Monday-started week containing `anchor`.
pub fn week_days(anchor: NaiveDate) -> [NaiveDate; 7] {
    let monday = anchor - Duration::days(anchor.weekday().num_days_from_monday() as i64);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_date_shifts_across_midnight() {
        // 16:00 UTC is 01:00 JST the next day.
        let at = Utc.with_ymd_and_hms(2025, 1, 9, 16, 0, 0).unwrap();
        assert_eq!(local_date(at), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!(local_hour(at), 1);
    }

    #[test]
    fn test_local_midnight_is_nine_hours_behind() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let midnight = local_midnight(date);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2025, 1, 9, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_week_days_starts_on_monday() {
        // 2025-01-10 is a Friday.
        let week = week_days(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!(week[0], NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert_eq!(week[4], NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!(week[6], NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());
    }
}
