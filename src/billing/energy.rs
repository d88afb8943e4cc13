use std::collections::BTreeMap;

use chrono::NaiveDate;
use itertools::Itertools;

use crate::{
    consumption::{ConsumptionRecord, Daily, Hourly, group_by},
    quantity::{Cost, KilowattHourRate, KilowattHours},
    tariff::{CalculatedPriceRecord, PricingModel, TariffConfig},
    time::{is_weekday, local_date, local_hour},
};

/// Matches hourly consumption against hourly prices.
#[must_use]
pub struct EnergyCostCalculator<'a> {
    config: &'a TariffConfig,
    prices: &'a [CalculatedPriceRecord],
    hourly_consumption: BTreeMap<(NaiveDate, u32), KilowattHours>,
    daily_consumption: BTreeMap<NaiveDate, KilowattHours>,

    /// First published price of each local hour.
    hourly_prices: BTreeMap<(NaiveDate, u32), KilowattHourRate>,
}

impl<'a> EnergyCostCalculator<'a> {
    pub fn new(
        config: &'a TariffConfig,
        consumption: &[ConsumptionRecord],
        prices: &'a [CalculatedPriceRecord],
    ) -> Self {
        let mut hourly_prices = BTreeMap::new();
        for record in prices {
            hourly_prices.entry(local_hour(&record.start_time)).or_insert(record.price_per_kwh);
        }
        Self {
            config,
            prices,
            hourly_consumption: group_by(consumption, &Hourly),
            daily_consumption: group_by(consumption, &Daily),
            hourly_prices,
        }
    }

    #[must_use]
    pub const fn daily_consumption(&self) -> &BTreeMap<NaiveDate, KilowattHours> {
        &self.daily_consumption
    }

    pub fn day_consumption(&self, date: NaiveDate) -> KilowattHours {
        self.daily_consumption.get(&date).copied().unwrap_or(KilowattHours::ZERO)
    }

    /// Energy cost of the local date, before power, fees and taxes.
    ///
    /// For the market model, each consumed hour is priced by the published price of the
    /// same hour. When no hour matches, the whole day is priced at the day's average price,
    /// and then at the average of all known prices. `None` means no price is known at all.
    #[must_use]
    pub fn day_energy_cost(&self, date: NaiveDate) -> Option<Cost> {
        let hours = self.hourly_consumption.range((date, 0)..=(date, 23));
        if self.config.pricing_model() == PricingModel::Fixed {
            let weekday = is_weekday(date);
            return Some(
                hours
                    .filter_map(|((_, hour), consumption)| {
                        Some(*consumption * self.config.fixed_rate(*hour, weekday)?)
                    })
                    .sum(),
            );
        }
        let matched = hours
            .filter_map(|(key, consumption)| Some(*consumption * *self.hourly_prices.get(key)?))
            .collect_vec();
        if matched.is_empty() {
            let price = self.day_average_price(date).or_else(|| self.average_price())?;
            Some(self.day_consumption(date) * price)
        } else {
            Some(matched.into_iter().sum())
        }
    }

    /// Average price of the local date.
    ///
    /// For the fixed model, this is the average contracted rate over the day's hours.
    #[must_use]
    pub fn day_average_price(&self, date: NaiveDate) -> Option<KilowattHourRate> {
        if self.config.pricing_model() == PricingModel::Fixed {
            let weekday = is_weekday(date);
            return mean((0..24).filter_map(|hour| self.config.fixed_rate(hour, weekday)));
        }
        mean(
            self.prices
                .iter()
                .filter(|record| local_date(&record.start_time) == date)
                .map(|record| record.price_per_kwh),
        )
    }

    /// Average of all known prices.
    #[must_use]
    pub fn average_price(&self) -> Option<KilowattHourRate> {
        mean(self.prices.iter().map(|record| record.price_per_kwh))
    }
}

#[expect(clippy::cast_precision_loss)]
fn mean(prices: impl Iterator<Item = KilowattHourRate>) -> Option<KilowattHourRate> {
    let (sum, count) = prices.fold((KilowattHourRate::ZERO, 0_usize), |(sum, count), price| {
        (sum + price, count + 1)
    });
    (count != 0).then(|| sum / count as f64)
}
