use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::{
    quantity::KilowattHourRate,
    tariff::price::CalculatedPriceRecord,
    time::{local_hour, localize},
};

/// Statistics of one day's calculated prices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceSummary {
    pub mean: KilowattHourRate,
    pub min: KilowattHourRate,
    pub max: KilowattHourRate,

    /// Local start of the cheapest hour, `HH:00`. The earliest one wins a tie.
    pub cheapest_hour: String,

    /// Price of the hour containing "now", if published.
    pub current: Option<KilowattHourRate>,

    /// `price_HHh` to price.
    pub hourly: BTreeMap<String, KilowattHourRate>,
}

impl PriceSummary {
    /// Summarize the prices, `None` when nothing has been published yet.
    #[must_use]
    pub fn new<Tz: TimeZone>(prices: &[CalculatedPriceRecord], now: &DateTime<Tz>) -> Option<Self> {
        let min = prices.iter().map(|record| record.price_per_kwh).min()?;
        let max = prices.iter().map(|record| record.price_per_kwh).max()?;
        let cheapest = prices.iter().min_by_key(|record| record.price_per_kwh)?;
        #[expect(clippy::cast_precision_loss)]
        let mean = prices.iter().map(|record| record.price_per_kwh).sum::<KilowattHourRate>()
            / prices.len() as f64;
        Some(Self {
            mean: mean.round_to_micros(),
            min,
            max,
            cheapest_hour: localize(&cheapest.start_time).format("%H:00").to_string(),
            current: current_price(prices, now),
            hourly: hourly_prices(prices),
        })
    }
}

/// Price of the local hour containing `now`.
#[must_use]
pub fn current_price<Tz: TimeZone>(
    prices: &[CalculatedPriceRecord],
    now: &DateTime<Tz>,
) -> Option<KilowattHourRate> {
    let now = local_hour(now);
    prices
        .iter()
        .find(|record| local_hour(&record.start_time) == now)
        .map(|record| record.price_per_kwh)
}

/// Per-hour attributes keyed by `price_HHh` of the local hour.
#[must_use]
pub fn hourly_prices(prices: &[CalculatedPriceRecord]) -> BTreeMap<String, KilowattHourRate> {
    prices
        .iter()
        .map(|record| {
            let (_, hour) = local_hour(&record.start_time);
            (format!("price_{hour:02}h"), record.price_per_kwh)
        })
        .collect()
}
