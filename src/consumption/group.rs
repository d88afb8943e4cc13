use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, Datelike, Days, NaiveDate, Timelike};
use chrono_tz::Tz;
use tracing::debug;

use crate::{
    consumption::record::ConsumptionRecord,
    quantity::KilowattHours,
    time::{YearMonth, localize, week_start},
};

/// Bucketing of local timestamps.
pub trait Granularity {
    type Key: Copy + Ord + Debug;

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key;
}

/// Local date and hour.
#[derive(Copy, Clone, Debug)]
pub struct Hourly;

impl Granularity for Hourly {
    type Key = (NaiveDate, u32);

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key {
        (timestamp.date_naive(), timestamp.hour())
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Daily;

impl Granularity for Daily {
    type Key = NaiveDate;

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key {
        timestamp.date_naive()
    }
}

/// Seven-day windows aligned so that one of them ends today, keyed by their last date.
#[derive(Copy, Clone, Debug)]
pub struct TrailingWeekly {
    pub today: NaiveDate,
}

impl Granularity for TrailingWeekly {
    type Key = NaiveDate;

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key {
        let n_days = (self.today - timestamp.date_naive()).num_days();
        let n_weeks = n_days.div_euclid(7);
        let offset = Days::new(n_weeks.unsigned_abs() * 7);
        if n_weeks >= 0 { self.today - offset } else { self.today + offset }
    }
}

/// Calendar week keyed by its Monday.
#[derive(Copy, Clone, Debug)]
pub struct CalendarWeekly;

impl Granularity for CalendarWeekly {
    type Key = NaiveDate;

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key {
        week_start(timestamp.date_naive())
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Monthly;

impl Granularity for Monthly {
    type Key = YearMonth;

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key {
        YearMonth::of(timestamp.date_naive())
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Yearly;

impl Granularity for Yearly {
    type Key = i32;

    fn key_of(&self, timestamp: &DateTime<Tz>) -> Self::Key {
        timestamp.year()
    }
}

/// Sum the readings per local bucket. Readings without a timestamp are skipped.
#[must_use]
pub fn group_by<G: Granularity>(
    records: &[ConsumptionRecord],
    granularity: &G,
) -> BTreeMap<G::Key, KilowattHours> {
    let mut groups = BTreeMap::new();
    for record in records {
        let Some(start_time) = record.start_time else {
            debug!(?record, "skipping reading without a timestamp");
            continue;
        };
        *groups.entry(granularity.key_of(&localize(&start_time))).or_insert(KilowattHours::ZERO) +=
            record.consumption;
    }
    groups
}
