//! Fixed-precision RFC 3339 timestamps.
//!
//! Lists order by the stored `created_at` string, so every writer uses the
//! same width: microseconds and a `Z` suffix.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(at))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    DateTime::<Utc>::deserialize(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn strings_sort_chronologically() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let whole = format(&base);
        let millis = format(&(base + chrono::Duration::milliseconds(120)));
        let nanos = format(&(base + chrono::Duration::nanoseconds(120_456_789)));

        assert_eq!(whole, "2025-03-01T12:00:00.000000Z");
        assert_eq!(millis.len(), whole.len());
        assert_eq!(nanos.len(), whole.len());
        assert!(whole < millis && millis < nanos);
    }
}
