use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    billing::energy::EnergyCostCalculator,
    consumption::{ConsumptionRecord, Daily, select_reporting_period},
    quantity::Cost,
    tariff::{CalculatedPriceRecord, TariffConfig, calculate_power_cost},
};

/// Taxed cost. Components keep full precision until [`CostBreakdown::rounded`].
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    /// Energy, power and management fee.
    pub base: Cost,

    /// Meter rental and the like.
    pub other_concepts: Cost,

    pub electricity_tax: Cost,
    pub vat: Cost,
    pub total: Cost,
}

impl CostBreakdown {
    /// Electricity tax on the subtotal, then VAT on the tax-inclusive subtotal.
    pub fn new(config: &TariffConfig, base: Cost, other_concepts: Cost) -> Self {
        let (electricity_tax, vat) = apply_taxes(config, base + other_concepts);
        Self {
            base,
            other_concepts,
            electricity_tax,
            vat,
            total: base + other_concepts + electricity_tax + vat,
        }
    }

    pub fn rounded(self) -> Self {
        Self {
            base: self.base.round_to_cents(),
            other_concepts: self.other_concepts.round_to_cents(),
            electricity_tax: self.electricity_tax.round_to_cents(),
            vat: self.vat.round_to_cents(),
            total: self.total.round_to_cents(),
        }
    }
}

/// Electricity tax and VAT of the taxable subtotal.
pub fn apply_taxes(config: &TariffConfig, subtotal: Cost) -> (Cost, Cost) {
    let electricity_tax = subtotal * config.electricity_tax_rate();
    let vat = (subtotal + electricity_tax) * config.vat_rate();
    (electricity_tax, vat)
}

/// Cost of one day from its energy cost and the optional daily charges.
pub fn calculate_daily_cost(
    config: &TariffConfig,
    energy_cost: Cost,
    power_cost: Option<Cost>,
    management_fee_daily: Option<Cost>,
    target_date: NaiveDate,
) -> CostBreakdown {
    let base = energy_cost
        + power_cost.unwrap_or(Cost::ZERO)
        + management_fee_daily.unwrap_or(Cost::ZERO);
    let other_concepts = config.other_concepts_rate().unwrap_or(Cost::ZERO);
    let breakdown = CostBreakdown::new(config, base, other_concepts);
    debug!(%target_date, %energy_cost, total = %breakdown.total, "calculated daily cost");
    breakdown
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyCost {
    pub date: NaiveDate,
    pub is_today: bool,

    /// Latest date with consumption data.
    pub data_available_until: NaiveDate,

    pub breakdown: CostBreakdown,
}

/// Cost of today, or of the latest day with consumption.
///
/// `None` when there is no consumption, or no price for the market model.
#[must_use]
#[instrument(skip_all)]
pub fn daily_cost<Tz: TimeZone>(
    config: &TariffConfig,
    consumption: &[ConsumptionRecord],
    prices: &[CalculatedPriceRecord],
    now: &DateTime<Tz>,
) -> Option<DailyCost> {
    let calculator = EnergyCostCalculator::new(config, consumption, prices);
    let data_available_until = *calculator.daily_consumption().keys().next_back()?;
    let period = select_reporting_period(calculator.daily_consumption(), &Daily, now)?;
    let energy_cost = calculator.day_energy_cost(period.key)?;
    let power_cost = config
        .power()
        .map(|power| calculate_power_cost(config, power, period.key).total_cost);
    let breakdown = calculate_daily_cost(
        config,
        energy_cost,
        power_cost,
        config.management_fee_daily(),
        period.key,
    );
    Some(DailyCost {
        date: period.key,
        is_today: period.is_current,
        data_available_until,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Utc;

    use super::*;
    use crate::{
        quantity::{KilowattHourRate, KilowattHours},
        tariff::{PricingModel, TariffSettings, TimeStructure},
    };

    fn settings() -> TariffSettings {
        TariffSettings::builder()
            .pricing_model(PricingModel::Market)
            .time_structure(TimeStructure::SingleRate)
            .build()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_tax_stacking() {
        let config: TariffConfig =
            TariffSettings { electricity_tax_rate: 0.0511, vat_rate: 0.21, ..settings() }
                .try_into()
                .unwrap();
        let breakdown = calculate_daily_cost(&config, Cost(100.0), None, None, date());
        assert_abs_diff_eq!(breakdown.base.0, 100.0);
        assert_abs_diff_eq!(breakdown.electricity_tax.0, 5.11, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.vat.0, 22.0731, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.total.0, 127.1831, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.rounded().total.0, 127.18);
        assert_eq!(breakdown.other_concepts, Cost::ZERO);
    }

    #[test]
    fn test_optional_charges() {
        let config: TariffConfig = TariffSettings {
            electricity_tax_rate: 0.0,
            vat_rate: 0.0,
            other_concepts_rate: Some(0.03),
            ..settings()
        }
        .try_into()
        .unwrap();
        let breakdown =
            calculate_daily_cost(&config, Cost(1.0), Some(Cost(0.5)), Some(Cost(0.2)), date());
        assert_abs_diff_eq!(breakdown.base.0, 1.7, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.other_concepts.0, 0.03);
        assert_abs_diff_eq!(breakdown.total.0, 1.73, epsilon = 1e-9);
    }

    #[test]
    fn test_daily_cost_falls_back_to_latest_day() {
        let config: TariffConfig = TariffSettings {
            electricity_tax_rate: 0.0,
            vat_rate: 0.0,
            management_fee_monthly: Some(3.0),
            ..settings()
        }
        .try_into()
        .unwrap();
        let consumption = [ConsumptionRecord::new(
            "2025-01-14T09:00:00Z".parse().unwrap(),
            KilowattHours(2.0),
        )];
        let prices = [CalculatedPriceRecord {
            start_time: "2025-01-14T10:00:00+01:00".parse().unwrap(),
            price_per_kwh: KilowattHourRate(0.1),
        }];
        let now: DateTime<Utc> = "2025-01-15T12:00:00Z".parse().unwrap();
        let cost = daily_cost(&config, &consumption, &prices, &now).unwrap();
        assert_eq!(cost.date, NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());
        assert!(!cost.is_today);
        assert_abs_diff_eq!(cost.breakdown.base.0, 0.2 + 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_daily_cost_without_prices() {
        let config: TariffConfig = settings().try_into().unwrap();
        let consumption = [ConsumptionRecord::new(
            "2025-01-14T09:00:00Z".parse().unwrap(),
            KilowattHours(2.0),
        )];
        let now: DateTime<Utc> = "2025-01-15T12:00:00Z".parse().unwrap();
        assert_eq!(daily_cost(&config, &consumption, &[], &now), None);
    }
}
