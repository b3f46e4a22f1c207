//! Date/time utilities for scrapper.
//!
//! Feed documents carry publication dates in several grammars. The fetcher
//! passes them through as raw strings and [`parse_pub_date`] turns them into
//! UTC timestamps, one entry at a time.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Date format used in digests ("Jan 02, 2006").
pub const DIGEST_DATE_FORMAT: &str = "%b %d, %Y";

/// Naive formats tried after RFC 2822 and RFC 3339, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A publication date that matched none of the accepted grammars.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized publication date: {raw:?}")]
pub struct DateParseError {
    /// The raw string as it appeared in the feed.
    pub raw: String,
}

/// Parse a feed publication date.
///
/// Accepts RFC 2822 (`Mon, 02 Jan 2006 15:04:05 -0700`, weekday optional,
/// `GMT`/`UTC` zone names), RFC 3339 and `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateParseError {
            raw: raw.to_string(),
        });
    }

    let rfc2822 = match trimmed.strip_suffix(" UTC") {
        Some(head) => format!("{head} +0000"),
        None => trimmed.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc2822(&rfc2822) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(DateParseError {
        raw: raw.to_string(),
    })
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC if the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Parse a timestamp read back from the database.
///
/// Accepts RFC 3339 and the SQLite `datetime('now')` format.
pub fn parse_db_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
