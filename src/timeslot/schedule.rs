//! Weekday and time-of-day handling for timeslot availability.

use chrono::{Datelike, NaiveDate, NaiveTime, Utc, Weekday};

/// Times offered when a timeslot does not list its own.
pub const DEFAULT_TIMES: &[&str] = &[
    "09:00", "10:00", "11:00", "14:00", "15:00", "16:00", "17:00", "19:00", "20:00",
];

const WEEKDAY_NAMES: &[(Weekday, &str, &str, &str, &str)] = &[
    (Weekday::Mon, "월", "월요일", "mon", "monday"),
    (Weekday::Tue, "화", "화요일", "tue", "tuesday"),
    (Weekday::Wed, "수", "수요일", "wed", "wednesday"),
    (Weekday::Thu, "목", "목요일", "thu", "thursday"),
    (Weekday::Fri, "금", "금요일", "fri", "friday"),
    (Weekday::Sat, "토", "토요일", "sat", "saturday"),
    (Weekday::Sun, "일", "일요일", "sun", "sunday"),
];

pub fn parse_weekday(name: &str) -> Option<Weekday> {
    let name = name.trim().to_lowercase();
    WEEKDAY_NAMES
        .iter()
        .find(|(_, short, long, en_short, en_long)| {
            name == *short || name == *long || name == *en_short || name == *en_long
        })
        .map(|(day, ..)| *day)
}

/// Stored form of a weekday.
pub fn weekday_label(day: Weekday) -> &'static str {
    WEEKDAY_NAMES
        .iter()
        .find(|(d, ..)| *d == day)
        .map(|(_, short, ..)| *short)
        .unwrap_or("월")
}

/// Accepts `H:MM` or `HH:MM`, returns the zero-padded form.
pub fn normalize_time(value: &str) -> Option<String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// Dates are compared against the UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Whether `date` falls on one of `available_days`. Unrecognised stored
/// names are ignored, an empty list allows every day.
pub fn is_available_on(available_days: &[String], date: NaiveDate) -> bool {
    if available_days.is_empty() {
        return true;
    }
    let weekday = date.weekday();
    available_days
        .iter()
        .filter_map(|d| parse_weekday(d))
        .any(|d| d == weekday)
}

/// The slot's own times, or [`DEFAULT_TIMES`] when it lists none.
pub fn offered_times(available_times: &[String]) -> Vec<String> {
    if available_times.is_empty() {
        DEFAULT_TIMES.iter().map(|t| t.to_string()).collect()
    } else {
        available_times.to_vec()
    }
}
