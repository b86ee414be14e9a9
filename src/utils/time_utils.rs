use chrono::{DateTime, Duration, NaiveDate, Utc};

// chrono formatting reference:
// https://docs.rs/chrono/latest/chrono/format/strftime/index.html
const DATE_FORMAT_USCOMPACT: &'static str = "%Y-%m-%d";

pub enum DateFormat {
  // What the JSON API sends out.
  Iso,
  // Sitemap "lastmod" and AdSense day keys.
  USCompact,
  // RSS wants this one.
  Rfc2822
}

fn to_datetime(timestamp: i64) -> DateTime<Utc> {
  // Out of range timestamps end up as the epoch, they can
  // only come from a corrupted database.
  DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default()
}

pub fn timestamp_to_date_string(timestamp: i64, format: DateFormat) -> String {
  let d = to_datetime(timestamp);
  match format {
    DateFormat::Iso => d.to_rfc3339(),
    DateFormat::USCompact => d.format(DATE_FORMAT_USCOMPACT).to_string(),
    DateFormat::Rfc2822 => d.to_rfc2822()
  }
}

pub fn current_timestamp() -> i64 {
  Utc::now().timestamp()
}

pub fn current_datetime_rfc2822() -> String {
  Utc::now().to_rfc2822()
}

// Day key used by the AdSense counters, e.g. "2021-03-07".
pub fn current_day() -> String {
  Utc::now().format(DATE_FORMAT_USCOMPACT).to_string()
}

// Timestamp of the start of the day that was `days` days ago.
pub fn days_ago_timestamp(days: u32) -> i64 {
  let today = Utc::now().date_naive();
  let start = today - Duration::days(days.into());
  start.and_hms_opt(0, 0, 0)
    .map(|dt| dt.and_utc().timestamp())
    .unwrap_or(0)
}

// Returns None for anything that isn't a valid YYYY-MM-DD day.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value, DATE_FORMAT_USCOMPACT).ok()
}

// RFC 3339 datetime, like the ones the API sends out, to
// a unix timestamp.
pub fn parse_datetime(value: &str) -> Option<i64> {
  DateTime::parse_from_rfc3339(value.trim())
    .ok()
    .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iso_format() {
    let timestamp: i64 = 1615150740;
    let result = timestamp_to_date_string(timestamp, DateFormat::Iso);
    assert_eq!("2021-03-07T20:59:00+00:00", result);
  }

  #[test]
  fn compact_and_rss_formats() {
    let timestamp: i64 = 1615150740;
    assert_eq!(
      "2021-03-07", 
      timestamp_to_date_string(timestamp, DateFormat::USCompact)
    );
    assert_eq!(
      "Sun, 7 Mar 2021 20:59:00 +0000",
      timestamp_to_date_string(timestamp, DateFormat::Rfc2822)
    );
    // Days aren't zero-padded, two-digit days print as is.
    assert_eq!(
      "Mon, 15 Mar 2021 20:59:00 +0000",
      timestamp_to_date_string(timestamp + 8 * 86400, DateFormat::Rfc2822)
    );
  }

  #[test]
  fn parse_day_rejects_garbage() {
    assert!(parse_day("2021-03-07").is_some());
    assert!(parse_day("2021-13-07").is_none());
    assert!(parse_day("yesterday").is_none());
  }

  #[test]
  fn days_ago_is_in_the_past() {
    let now = current_timestamp();
    let week_ago = days_ago_timestamp(7);
    assert!(week_ago < now);
    assert!(now - week_ago <= 8 * 86400);
  }

  #[test]
  fn parse_datetime_reads_what_we_write() {
    let written = timestamp_to_date_string(1615150740, DateFormat::Iso);
    assert_eq!(parse_datetime(&written), Some(1615150740));
    assert_eq!(parse_datetime("2021-03-07T21:59:00+01:00"), Some(1615150740));
    assert_eq!(parse_datetime("next tuesday"), None);
  }
}
