//! Field normalizers applied before values reach MailChimp.
//!
//! Each normalizer returns `Some(normalized)` on a match and `None` when the
//! input cannot be normalized, so callers can tell "no match" apart from a
//! legitimately empty field. Values that fail to normalize are dropped from
//! the outgoing payload.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month};

const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]-[month padding:none]-[day padding:none]"),
    format_description!("[month]/[day]/[year]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
    format_description!("[month]-[day]-[year]"),
    format_description!("[month padding:none]-[day padding:none]-[year]"),
];

/// Normalize a date-ish value to zero-padded `MM/DD`.
///
/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY`, `MM-DD-YYYY` (padded or not) and bare
/// `MM/DD` / `MM-DD`. MailChimp birthday merge fields only carry month and
/// day, which is why the year is discarded.
pub fn normalize_date(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = Date::parse(trimmed, format) {
            return Some(format_month_day(date.month(), date.day()));
        }
    }
    month_day(trimmed)
}

/// Bare month/day input carries no year; anchor on a leap year so Feb 29
/// stays accepted.
fn month_day(value: &str) -> Option<String> {
    let (month, day) = value.split_once(['/', '-'])?;
    let month: u8 = month.trim().parse().ok()?;
    let day: u8 = day.trim().parse().ok()?;
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(2000, month, day).ok()?;
    Some(format_month_day(date.month(), date.day()))
}

fn format_month_day(month: Month, day: u8) -> String {
    format!("{:02}/{:02}", u8::from(month), day)
}

/// Normalize a US zip code: the input unchanged iff it is exactly five ASCII
/// digits.
pub fn normalize_zip_code(input: &str) -> Option<String> {
    if input.len() == 5 && input.bytes().all(|b| b.is_ascii_digit()) {
        Some(input.to_string())
    } else {
        None
    }
}
