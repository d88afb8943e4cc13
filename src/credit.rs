//! Loyalty and solar credits.

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tracing::{debug, instrument};

use crate::{
    consumption::{ConsumptionRecord, Hourly, group_by},
    quantity::{Cost, KilowattHourRate},
    tariff::{MarketPriceRecord, TariffConfig},
    time::{LenientTimestamp, YearMonth, local_date, local_hour},
};

pub const SUN_CLUB: &str = "SUN_CLUB";

/// Prefix of the SUN CLUB power-up reason codes.
pub const SUN_CLUB_POWER_UP: &str = "SUN_CLUB_POWER_UP";

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, alias = "amount")]
    pub amount_cents: i64,

    #[serde(default, alias = "createdAt")]
    #[serde_as(as = "LenientTimestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default = "unknown_reason_code", alias = "reasonCode")]
    pub reason_code: String,
}

fn unknown_reason_code() -> String {
    "UNKNOWN".to_string()
}

impl CreditRecord {
    pub const fn amount(&self) -> Cost {
        Cost::from_cents(self.amount_cents)
    }

    /// Deduplication key: the ID, or the creation time of credits without one.
    fn key(&self) -> Option<CreditKey> {
        match (&self.id, self.created_at) {
            (Some(id), _) if !id.is_empty() => Some(CreditKey::Id(id.clone())),
            (_, Some(created_at)) => Some(CreditKey::CreatedAt(created_at)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum CreditKey {
    Id(String),
    CreatedAt(DateTime<Utc>),
}

/// Merge recent and historical credits, recent ones replacing historical ones with the same key.
///
/// The historical order is kept, new recent credits are appended. Credits with neither
/// an ID nor a creation time cannot be deduplicated and are dropped.
#[must_use]
pub fn merge(recent: &[CreditRecord], historical: &[CreditRecord]) -> Vec<CreditRecord> {
    let mut merged: Vec<CreditRecord> = Vec::with_capacity(recent.len() + historical.len());
    let mut index = HashMap::new();
    for credit in historical.iter().chain(recent) {
        let Some(key) = credit.key() else {
            debug!(?credit, "dropping credit without an ID or creation time");
            continue;
        };
        match index.entry(key) {
            Entry::Occupied(entry) => merged[*entry.get()] = credit.clone(),
            Entry::Vacant(entry) => {
                entry.insert(merged.len());
                merged.push(credit.clone());
            }
        }
    }
    merged
}

#[must_use]
pub fn bucket_by_reason_code(credits: &[CreditRecord]) -> BTreeMap<&str, Vec<&CreditRecord>> {
    let mut buckets: BTreeMap<&str, Vec<&CreditRecord>> = BTreeMap::new();
    for credit in credits {
        buckets.entry(credit.reason_code.as_str()).or_default().push(credit);
    }
    buckets
}

/// Credit totals in euros, rounded to cents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CreditTotals {
    pub by_reason_code: BTreeMap<String, Cost>,

    /// Only the reason codes with a positive total this month.
    pub current_month_by_reason_code: BTreeMap<String, Cost>,

    pub current_month: Cost,
    pub last_month: Cost,
    pub total: Cost,

    pub sun_club: Cost,

    /// All the `SUN_CLUB_POWER_UP*` reason codes together.
    pub sun_club_power_up: Cost,
}

/// Sum the merged credits by reason code and by local calendar month.
#[must_use]
pub fn totals<Tz: TimeZone>(credits: &[CreditRecord], now: &DateTime<Tz>) -> CreditTotals {
    let current_month = YearMonth::of(local_date(now));
    let last_month = current_month.previous();

    let mut totals = CreditTotals::default();
    for credit in credits {
        let amount = credit.amount();
        totals.total += amount;
        *totals.by_reason_code.entry(credit.reason_code.clone()).or_default() += amount;
        let Some(created_at) = credit.created_at else {
            continue;
        };
        let month = YearMonth::of(local_date(&created_at));
        if month >= current_month {
            totals.current_month += amount;
            *totals.current_month_by_reason_code.entry(credit.reason_code.clone()).or_default() +=
                amount;
        } else if month == last_month {
            totals.last_month += amount;
        }
    }

    totals.current_month_by_reason_code.retain(|_, total| *total > Cost::ZERO);
    for (reason_code, total) in &totals.by_reason_code {
        if reason_code == SUN_CLUB {
            totals.sun_club += *total;
        } else if reason_code.starts_with(SUN_CLUB_POWER_UP) {
            totals.sun_club_power_up += *total;
        }
    }

    CreditTotals {
        by_reason_code: round_all(totals.by_reason_code),
        current_month_by_reason_code: round_all(totals.current_month_by_reason_code),
        current_month: totals.current_month.round_to_cents(),
        last_month: totals.last_month.round_to_cents(),
        total: totals.total.round_to_cents(),
        sun_club: totals.sun_club.round_to_cents(),
        sun_club_power_up: totals.sun_club_power_up.round_to_cents(),
    }
}

fn round_all(totals: BTreeMap<String, Cost>) -> BTreeMap<String, Cost> {
    totals.into_iter().map(|(reason_code, total)| (reason_code, total.round_to_cents())).collect()
}

/// Credits expected for this month's consumption in the discount window.
///
/// Each discounted hour earns `consumption × market price × discount percentage`.
/// `None` without a discount window or without any data.
#[must_use]
#[instrument(skip_all)]
pub fn estimated_credits<Tz: TimeZone>(
    config: &TariffConfig,
    consumption: &[ConsumptionRecord],
    market_prices: &[MarketPriceRecord],
    now: &DateTime<Tz>,
) -> Option<Cost> {
    let discount = config.discount()?;
    if consumption.is_empty() || market_prices.is_empty() {
        return None;
    }
    let mut prices = HashMap::new();
    for record in market_prices {
        prices.entry(local_hour(&record.start_time)).or_insert(record.price_per_kwh);
    }
    let current_month = YearMonth::of(local_date(now));
    let credits: Cost = group_by(consumption, &Hourly)
        .into_iter()
        .filter(|((date, hour), _)| {
            YearMonth::of(*date) >= current_month && discount.contains(*hour)
        })
        .filter_map(|(key, consumption)| {
            let price: KilowattHourRate = *prices.get(&key)?;
            Some(consumption * price * discount.percentage)
        })
        .sum();
    Some(credits.max(Cost::ZERO).round_to_cents())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        quantity::KilowattHours,
        tariff::{PricingModel, TariffSettings, TimeStructure},
    };

    fn credit(
        id: Option<&str>,
        amount_cents: i64,
        created_at: &str,
        reason_code: &str,
    ) -> CreditRecord {
        CreditRecord {
            id: id.map(ToString::to_string),
            amount_cents,
            created_at: Some(created_at.parse().unwrap()),
            reason_code: reason_code.to_string(),
        }
    }

    #[test]
    fn test_deserialize() {
        let credit: CreditRecord = serde_json::from_str(
            r#"{"id": "1", "amount": 250, "createdAt": "2025-01-15T10:00:00Z", "reasonCode": "SUN_CLUB"}"#,
        )
        .unwrap();
        assert_eq!(credit.amount_cents, 250);
        assert_eq!(credit.reason_code, SUN_CLUB);
        let credit: CreditRecord = serde_json::from_str(r#"{"amount": 100}"#).unwrap();
        assert_eq!(credit.reason_code, "UNKNOWN");
        assert_eq!(credit.created_at, None);
    }

    #[test]
    fn test_merge_recent_wins() {
        let historical = [
            credit(Some("a"), 100, "2025-01-01T10:00:00Z", SUN_CLUB),
            credit(Some("b"), 200, "2025-01-02T10:00:00Z", SUN_CLUB),
        ];
        let recent = [
            credit(Some("b"), 250, "2025-01-02T10:00:00Z", "SUN_CLUB_POWER_UP_X"),
            credit(Some("c"), 300, "2025-01-03T10:00:00Z", SUN_CLUB),
        ];
        let merged = merge(&recent, &historical);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id.as_deref(), Some("a"));
        assert_eq!(merged[1], recent[0]);
        assert_eq!(merged[2], recent[1]);
    }

    #[test]
    fn test_merge_by_creation_time() {
        let historical = [credit(None, 100, "2025-01-01T10:00:00Z", SUN_CLUB)];
        let recent = [
            credit(Some(""), 150, "2025-01-01T10:00:00Z", SUN_CLUB),
            CreditRecord {
                id: None,
                amount_cents: 1,
                created_at: None,
                reason_code: SUN_CLUB.into(),
            },
        ];
        let merged = merge(&recent, &historical);
        assert_eq!(merged, [recent[0].clone()]);
    }

    #[test]
    fn test_bucket_by_reason_code() {
        let credits = [
            credit(Some("a"), 100, "2025-01-01T10:00:00Z", SUN_CLUB),
            credit(Some("b"), 200, "2025-01-02T10:00:00Z", "REFERRAL"),
            credit(Some("c"), 300, "2025-01-03T10:00:00Z", SUN_CLUB),
        ];
        let buckets = bucket_by_reason_code(&credits);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[SUN_CLUB].len(), 2);
        assert_eq!(buckets["REFERRAL"][0].id.as_deref(), Some("b"));
    }

    #[test]
    fn test_totals() {
        let credits = [
            // 2025-01-31T23:30 UTC is already February in Madrid.
            credit(Some("a"), 1000, "2025-01-31T23:30:00Z", SUN_CLUB),
            credit(Some("b"), 250, "2025-02-10T10:00:00Z", "SUN_CLUB_POWER_UP_2025"),
            credit(Some("c"), 333, "2025-01-15T10:00:00Z", SUN_CLUB),
            credit(Some("d"), 500, "2024-12-15T10:00:00Z", "REFERRAL"),
            credit(Some("e"), -100, "2025-02-11T10:00:00Z", "REFERRAL"),
            // Undated credits count toward the totals only.
            CreditRecord {
                created_at: None,
                ..credit(Some("f"), 700, "2025-02-12T10:00:00Z", "REFERRAL")
            },
        ];
        let now: DateTime<Utc> = "2025-02-15T12:00:00Z".parse().unwrap();
        let totals = totals(&credits, &now);
        assert_abs_diff_eq!(totals.current_month.0, 11.5);
        assert_abs_diff_eq!(totals.last_month.0, 3.33);
        assert_abs_diff_eq!(totals.total.0, 26.83);
        assert_abs_diff_eq!(totals.by_reason_code[SUN_CLUB].0, 13.33);
        assert_abs_diff_eq!(totals.by_reason_code["REFERRAL"].0, 11.0);
        assert_abs_diff_eq!(totals.sun_club.0, 13.33);
        assert_abs_diff_eq!(totals.sun_club_power_up.0, 2.5);
        assert_eq!(
            totals.current_month_by_reason_code.keys().collect::<Vec<_>>(),
            [SUN_CLUB, "SUN_CLUB_POWER_UP_2025"],
        );
    }

    #[test]
    fn test_estimated_credits() {
        let config: TariffConfig = TariffSettings::builder()
            .pricing_model(PricingModel::Market)
            .time_structure(TimeStructure::SingleRate)
            .discount_start_hour(12)
            .discount_end_hour(18)
            .discount_percentage(0.5)
            .build()
            .try_into()
            .unwrap();
        let consumption = [
            // 13:00 local, discounted.
            ConsumptionRecord::new("2025-02-03T12:00:00Z".parse().unwrap(), KilowattHours(2.0)),
            // 20:00 local, not discounted.
            ConsumptionRecord::new("2025-02-03T19:00:00Z".parse().unwrap(), KilowattHours(5.0)),
            // Last month.
            ConsumptionRecord::new("2025-01-31T12:00:00Z".parse().unwrap(), KilowattHours(7.0)),
        ];
        let prices = [
            MarketPriceRecord {
                start_time: "2025-02-03T13:00:00+01:00".parse().unwrap(),
                price_per_kwh: KilowattHourRate(0.2),
            },
            MarketPriceRecord {
                start_time: "2025-02-03T20:00:00+01:00".parse().unwrap(),
                price_per_kwh: KilowattHourRate(0.3),
            },
            MarketPriceRecord {
                start_time: "2025-01-31T13:00:00+01:00".parse().unwrap(),
                price_per_kwh: KilowattHourRate(0.4),
            },
        ];
        let now: DateTime<Utc> = "2025-02-15T12:00:00Z".parse().unwrap();
        let credits = estimated_credits(&config, &consumption, &prices, &now).unwrap();
        assert_abs_diff_eq!(credits.0, 0.2);
    }

    #[test]
    fn test_estimated_credits_without_discount() {
        let config: TariffConfig = TariffSettings::builder()
            .pricing_model(PricingModel::Market)
            .time_structure(TimeStructure::SingleRate)
            .build()
            .try_into()
            .unwrap();
        let consumption =
            [ConsumptionRecord::new("2025-02-03T12:00:00Z".parse().unwrap(), KilowattHours(2.0))];
        let now: DateTime<Utc> = "2025-02-15T12:00:00Z".parse().unwrap();
        assert_eq!(estimated_credits(&config, &consumption, &[], &now), None);
    }
}
