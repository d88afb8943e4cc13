use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::{consumption::group::Granularity, quantity::KilowattHours, time::localize};

/// Bucket to report: the one containing "now", or the latest one with data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportingPeriod<K> {
    pub key: K,
    pub total: KilowattHours,

    /// Whether the bucket contains "now", as opposed to being a fallback.
    pub is_current: bool,
}

/// Pick the bucket to report, `None` when there is no data at all.
#[must_use]
pub fn select_reporting_period<G: Granularity, Tz: TimeZone>(
    groups: &BTreeMap<G::Key, KilowattHours>,
    granularity: &G,
    now: &DateTime<Tz>,
) -> Option<ReportingPeriod<G::Key>> {
    let current = granularity.key_of(&localize(now));
    if let Some(total) = groups.get(&current) {
        return Some(ReportingPeriod { key: current, total: *total, is_current: true });
    }
    groups
        .last_key_value()
        .map(|(key, total)| ReportingPeriod { key: *key, total: *total, is_current: false })
}
