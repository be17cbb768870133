use chrono::{DateTime, Local, TimeZone};

// Same date format the old API was using: dd/MM/yyyy HH:mm:ssZ
// chrono formatting reference:
// https://docs.rs/chrono/0.4.19/chrono/format/strftime/index.html
const DATE_FORMAT: &'static str = "%d/%m/%Y %k:%M:%S%:z";

pub fn timestamp_to_date_string(timestamp: i64) -> String {
  let d = Local.timestamp(timestamp, 0);
  d.format(DATE_FORMAT).to_string()
}

// Update requests carry dates as strings, in the same format
// we serialize them in. Returns None when the string doesn't
// parse, the caller decides if that's a 400 or not.
pub fn date_string_to_timestamp(date: &str) -> Option<i64> {
  DateTime::parse_from_str(date, DATE_FORMAT)
    .map(|d| d.timestamp())
    .ok()
}

pub fn current_timestamp() -> i64 {
  Local::now().timestamp()
}
