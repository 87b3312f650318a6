use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::AppError;

/// Wire format of booking dates, `dd-mm-yyyy`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";
/// Wire format of slot times, `hh:mm:ss`.
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
        AppError::Validation(format!("invalid date '{s}', use 'dd-mm-yyyy'"))
    })
}

pub fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(|_| {
        AppError::Validation(format!("invalid time '{s}', use 'hh:mm:ss'"))
    })
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// End of a slot of `hours` starting at `start`. A slot must last at least an
/// hour and finish before midnight of the same day.
pub fn end_time(start: NaiveTime, hours: i64) -> Result<NaiveTime, AppError> {
    if hours < 1 {
        return Err(AppError::Validation("hour must be at least 1".to_string()));
    }
    if hours >= 24 {
        return Err(AppError::Validation(
            "a booking cannot extend past midnight".to_string(),
        ));
    }

    let (end, wrapped_secs) = start.overflowing_add_signed(Duration::hours(hours));
    if wrapped_secs != 0 {
        return Err(AppError::Validation(
            "a booking cannot extend past midnight".to_string(),
        ));
    }
    Ok(end)
}

/// `start <= t < end`
pub fn in_time_span_start(start: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    t >= start && t < end
}

/// `start < t <= end`
pub fn in_time_span_end(start: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    t > start && t <= end
}

/// Rejects a booking date before today, or a start time already gone today.
pub fn ensure_not_past(
    date: NaiveDate,
    start: NaiveTime,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    if date < now.date() {
        return Err(AppError::Validation(
            "booking date cannot be in the past".to_string(),
        ));
    }
    if date == now.date() && start < now.time() {
        return Err(AppError::Validation(
            "start time cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn now(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        let date = parse_date("15-06-2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert_eq!(format_date(&date), "15-06-2025");

        let time = parse_time("14:30:00").unwrap();
        assert_eq!(time, t("14:30"));
        assert_eq!(format_time(&time), "14:30:00");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(parse_date("2025-06-15"), Err(AppError::Validation(_))));
        assert!(matches!(parse_date("31-02-2025"), Err(AppError::Validation(_))));
        assert!(matches!(parse_time("14-30-00"), Err(AppError::Validation(_))));
        assert!(matches!(parse_time("25:00:00"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_end_time() {
        assert_eq!(end_time(t("14:00"), 2).unwrap(), t("16:00"));
        assert_eq!(end_time(t("22:30"), 1).unwrap(), t("23:30"));
        assert!(end_time(t("14:00"), 0).is_err());
        assert!(end_time(t("23:00"), 1).is_err());
        assert!(end_time(t("20:00"), 5).is_err());
    }

    #[test]
    fn test_time_spans_are_half_open() {
        let (start, end) = (t("14:00"), t("15:00"));

        assert!(in_time_span_start(start, end, t("14:00")));
        assert!(in_time_span_start(start, end, t("14:59")));
        assert!(!in_time_span_start(start, end, t("15:00")));
        assert!(!in_time_span_start(start, end, t("13:59")));

        assert!(!in_time_span_end(start, end, t("14:00")));
        assert!(in_time_span_end(start, end, t("14:30")));
        assert!(in_time_span_end(start, end, t("15:00")));
        assert!(!in_time_span_end(start, end, t("15:01")));
    }

    #[test]
    fn test_ensure_not_past() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let clock = now("2025-06-15 12:00");

        assert!(ensure_not_past(today, t("13:00"), clock).is_ok());
        assert!(ensure_not_past(today, t("11:00"), clock).is_err());
        assert!(ensure_not_past(yesterday, t("13:00"), clock).is_err());
    }
}
