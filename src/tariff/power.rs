use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::{
    quantity::{Cost, Kilowatts},
    tariff::config::TariffConfig,
};

/// Contracted power charge of one day, apportioned between the power periods.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PowerCost {
    pub p1_cost: Cost,
    pub p2_cost: Cost,
    pub total_cost: Cost,
}

/// Daily *potencia* charge: `power × period rate × period hours / 24` for each period.
///
/// Without configured power rates, the charge is zero.
pub fn calculate_power_cost(config: &TariffConfig, power: Kilowatts, date: NaiveDate) -> PowerCost {
    let Some((peak_rate, valley_rate)) = config.power_rates() else {
        warn!("power rates are not configured");
        return PowerCost::default();
    };
    let (peak_hours, valley_hours) = config.period_hours().power_hours(date);
    let p1_cost = (power * peak_rate * (f64::from(peak_hours) / 24.0)).round_to(6);
    let p2_cost = (power * valley_rate * (f64::from(valley_hours) / 24.0)).round_to(6);
    PowerCost { p1_cost, p2_cost, total_cost: (p1_cost + p2_cost).round_to(6) }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::tariff::{PricingModel, TariffSettings, TimeStructure};

    fn config(with_rates: bool) -> TariffConfig {
        let settings = TariffSettings::builder()
            .pricing_model(PricingModel::Market)
            .time_structure(TimeStructure::TimeOfUse)
            .build();
        let settings = if with_rates {
            TariffSettings { power_p1_rate: Some(0.12), power_p2_rate: Some(0.03), ..settings }
        } else {
            settings
        };
        settings.try_into().unwrap()
    }

    #[test]
    fn test_weekday() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let cost = calculate_power_cost(&config(true), Kilowatts(4.6), wednesday);
        assert_abs_diff_eq!(cost.p1_cost.0, 4.6 * 0.12 * 8.0 / 24.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cost.p2_cost.0, 4.6 * 0.03 * 16.0 / 24.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cost.total_cost.0, 0.184 + 0.092, epsilon = 1e-6);
    }

    #[test]
    fn test_weekend_is_valley() {
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 19).unwrap();
        let cost = calculate_power_cost(&config(true), Kilowatts(4.6), sunday);
        assert_eq!(cost.p1_cost, Cost::ZERO);
        assert_abs_diff_eq!(cost.p2_cost.0, 4.6 * 0.03, epsilon = 1e-6);
        assert_eq!(cost.total_cost, cost.p2_cost);
    }

    #[test]
    fn test_missing_rates() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(
            calculate_power_cost(&config(false), Kilowatts(4.6), wednesday),
            PowerCost::default(),
        );
    }
}
