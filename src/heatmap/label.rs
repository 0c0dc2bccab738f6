use chrono::{DateTime, Local, TimeZone};

/// Fit an author name to exactly `width` characters.
pub fn fit_author(author: &str, width: usize) -> String {
    let truncated: String = author.chars().take(width).collect();
    format!("{:<width$}", truncated, width = width)
}

/// Format `YYYY/MM/DD AUTHOR` for `time` as seen in `tz`.
///
/// Timestamps chrono cannot represent get a blank date of the same width.
pub fn format_label_in<Tz: TimeZone>(time: i64, author: &str, width: usize, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let date = match DateTime::from_timestamp(time, 0) {
        Some(utc) => utc.with_timezone(tz).format("%Y/%m/%d").to_string(),
        None => " ".repeat(10),
    };
    format!("{} {}", date, fit_author(author, width))
}

/// Format a gutter label using the local time zone.
pub fn format_label(time: i64, author: &str, width: usize) -> String {
    format_label_in(time, author, width, &Local)
}
