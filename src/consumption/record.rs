use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{quantity::KilowattHours, time::LenientTimestamp};

/// One metered hourly interval.
#[must_use]
#[serde_as]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    /// `None` when the source sent a missing or malformed timestamp.
    #[serde(default, alias = "date")]
    #[serde_as(as = "LenientTimestamp")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, alias = "value")]
    pub consumption: KilowattHours,
}

impl ConsumptionRecord {
    pub const fn new(start_time: DateTime<Utc>, consumption: KilowattHours) -> Self {
        Self { start_time: Some(start_time), consumption }
    }
}

/// Merge recent and historical readings by start time, recent readings winning.
///
/// The result is sorted chronologically. Readings without a timestamp are dropped.
#[must_use]
pub fn merge(
    recent: &[ConsumptionRecord],
    historical: &[ConsumptionRecord],
) -> Vec<ConsumptionRecord> {
    let mut merged = BTreeMap::new();
    for record in historical.iter().chain(recent) {
        if let Some(start_time) = record.start_time {
            merged.insert(start_time, *record);
        }
    }
    merged.into_values().collect()
}
