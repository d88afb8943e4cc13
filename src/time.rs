//! Civil time of the Spanish peninsular market.
//!
//! Every bucketing decision (day, week, month, year, tariff hour) goes through [`localize`]
//! so that all of them agree on the boundaries, including across DST switches.

use std::fmt::{Display, Formatter};

use chrono::{
    DateTime,
    Datelike,
    Days,
    Months,
    NaiveDate,
    NaiveDateTime,
    TimeZone,
    Timelike,
    Utc,
};
use chrono_tz::{Europe::Madrid, Tz};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{DeserializeAs, SerializeAs};
use tracing::debug;

pub const TIMEZONE: Tz = Madrid;

#[must_use]
pub fn localize<T: TimeZone>(timestamp: &DateTime<T>) -> DateTime<Tz> {
    timestamp.with_timezone(&TIMEZONE)
}

/// Local calendar date of the timestamp.
#[must_use]
pub fn local_date<T: TimeZone>(timestamp: &DateTime<T>) -> NaiveDate {
    localize(timestamp).date_naive()
}

/// Local calendar date and hour of the timestamp.
#[must_use]
pub fn local_hour<T: TimeZone>(timestamp: &DateTime<T>) -> (NaiveDate, u32) {
    let local = localize(timestamp);
    (local.date_naive(), local.hour())
}

/// Monday to Friday. Public holidays are not recognised and count as weekdays.
#[must_use]
pub fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() < 5
}

/// Monday of the calendar week containing the date.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Last day of the month containing the date.
#[must_use]
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date) + Months::new(1) - Days::new(1)
}

/// Inclusive iterator over the dates `start..=end`.
pub fn dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}

#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parse a collaborator-supplied timestamp.
///
/// Accepts RFC 3339 (with `Z` or an explicit offset), naive date-times and bare dates.
/// Timestamps without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.to_utc());
    }
    if let Ok(timestamp) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(timestamp.to_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(timestamp.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|timestamp| timestamp.and_utc())
}

/// [`serde_with`] adapter over [`parse_timestamp`].
///
/// A missing or malformed timestamp becomes `None`, so that a single bad record gets skipped
/// instead of failing the whole batch.
pub struct LenientTimestamp;

impl<'de> DeserializeAs<'de, Option<DateTime<Utc>>> for LenientTimestamp {
    fn deserialize_as<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        let timestamp = text.as_deref().and_then(parse_timestamp);
        if timestamp.is_none() && let Some(text) = text {
            debug!(%text, "malformed timestamp");
        }
        Ok(timestamp)
    }
}

impl SerializeAs<Option<DateTime<Utc>>> for LenientTimestamp {
    fn serialize_as<S: Serializer>(
        source: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match source {
            Some(timestamp) => serializer.serialize_some(&timestamp.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    #[test]
    fn test_localize_summer_time() {
        let timestamp = Utc.with_ymd_and_hms(2025, 7, 1, 22, 30, 0).unwrap();
        assert_eq!(local_hour(&timestamp), (NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(), 0));
    }

    #[test]
    fn test_localize_winter_time() {
        let timestamp = Utc.with_ymd_and_hms(2025, 1, 15, 22, 30, 0).unwrap();
        assert_eq!(local_hour(&timestamp), (NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), 23));
    }

    #[test]
    fn test_week_start() {
        let sunday = NaiveDate::from_ymd_opt(2025, 2, 2).unwrap();
        assert_eq!(sunday.weekday(), Weekday::Sun);
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());
    }

    #[test]
    fn test_month_end() {
        assert_eq!(
            month_end(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        assert_eq!(
            month_end(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
    }

    #[test]
    fn test_is_weekday() {
        assert!(is_weekday(NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()));
        assert!(!is_weekday(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap()));
        assert!(!is_weekday(NaiveDate::from_ymd_opt(2025, 1, 19).unwrap()));
        // Epiphany.
        assert!(is_weekday(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()));
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-15T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-15T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-15T10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-15"),
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()),
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_year_month_previous() {
        let january = YearMonth { year: 2025, month: 1 };
        assert_eq!(january.previous(), YearMonth { year: 2024, month: 12 });
        let july = YearMonth { year: 2025, month: 7 };
        assert_eq!(july.previous(), YearMonth { year: 2025, month: 6 });
    }

    #[test]
    fn test_dates() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert_eq!(dates(start, end).count(), 4);
        assert_eq!(dates(end, start).count(), 0);
    }
}
