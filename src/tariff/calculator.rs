use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::{
    quantity::KilowattHourRate,
    tariff::{
        config::{Pricing, TariffConfig},
        price::{CalculatedPriceRecord, MarketPriceRecord},
    },
    time::{is_weekday, local_hour},
};

/// Map market prices onto the consumer prices of the tariff.
///
/// The output follows the input sorted by start time. The target date is only used
/// for diagnostics: every record is priced by its own local hour.
#[must_use]
#[instrument(skip_all, fields(n_prices = market_prices.len(), %target_date))]
pub fn calculate_prices(
    market_prices: &[MarketPriceRecord],
    config: &TariffConfig,
    target_date: NaiveDate,
) -> Vec<CalculatedPriceRecord> {
    let prices = market_prices
        .iter()
        .sorted_by_key(|record| record.start_time)
        .map(|record| {
            let (date, hour) = local_hour(&record.start_time);
            CalculatedPriceRecord {
                start_time: record.start_time,
                price_per_kwh: hourly_price(config, record.price_per_kwh, hour, is_weekday(date)),
            }
        })
        .collect_vec();
    debug!(n_calculated = prices.len(), "calculated prices");
    prices
}

/// Consumer price of a single local hour, rounded to micro-euros.
pub fn hourly_price(
    config: &TariffConfig,
    market_price: KilowattHourRate,
    hour: u32,
    is_weekday: bool,
) -> KilowattHourRate {
    let price = match config.pricing() {
        Pricing::FixedSingleRate(rate) => *rate,
        Pricing::FixedTimeOfUse(rates) => {
            rates.get(config.period_hours().energy_period(hour, is_weekday))
        }
        Pricing::Market(_) => {
            let price = match config.zero_price_threshold() {
                Some(threshold) if market_price < threshold => KilowattHourRate::ZERO,
                _ => market_price,
            };
            match config.discount() {
                Some(discount) if discount.contains(hour) => discount.apply(price),
                _ => price,
            }
        }
    };
    price.round_to_micros()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone};

    use super::*;
    use crate::tariff::{PricingModel, TariffSettings, TimeStructure};

    /// 24 hourly records of the Madrid winter day, with varying prices.
    fn day(year: i32, month: u32, day: u32) -> Vec<MarketPriceRecord> {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let midnight: DateTime<FixedOffset> =
            offset.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap();
        (0..24_i32)
            .map(|hour| MarketPriceRecord {
                start_time: midnight + Duration::hours(i64::from(hour)),
                price_per_kwh: KilowattHourRate(0.01_f64.mul_add(f64::from(hour), 0.05)),
            })
            .collect()
    }

    fn market(settings: impl FnOnce(TariffSettings) -> TariffSettings) -> TariffConfig {
        let base = TariffSettings::builder()
            .pricing_model(PricingModel::Market)
            .time_structure(TimeStructure::SingleRate)
            .build();
        settings(base).try_into().unwrap()
    }

    fn fixed_time_of_use() -> TariffConfig {
        TariffSettings::builder()
            .pricing_model(PricingModel::Fixed)
            .time_structure(TimeStructure::TimeOfUse)
            .p1_rate(0.25)
            .p2_rate(0.18)
            .p3_rate(0.09)
            .build()
            .try_into()
            .unwrap()
    }

    #[test]
    fn test_fixed_single_rate() {
        let config: TariffConfig = TariffSettings::builder()
            .pricing_model(PricingModel::Fixed)
            .time_structure(TimeStructure::SingleRate)
            .fixed_rate(0.15)
            .build()
            .try_into()
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let prices = calculate_prices(&day(2025, 1, 15), &config, date);
        assert_eq!(prices.len(), 24);
        for price in prices {
            assert_abs_diff_eq!(price.price_per_kwh.0, 0.15);
        }
    }

    #[test]
    fn test_fixed_time_of_use_weekday() {
        let config = fixed_time_of_use();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let prices = calculate_prices(&day(2025, 1, 15), &config, date);
        assert_abs_diff_eq!(prices[3].price_per_kwh.0, 0.09);
        assert_abs_diff_eq!(prices[9].price_per_kwh.0, 0.18);
        assert_abs_diff_eq!(prices[12].price_per_kwh.0, 0.25);
        assert_abs_diff_eq!(prices[23].price_per_kwh.0, 0.18);
    }

    #[test]
    fn test_fixed_time_of_use_weekend() {
        let config = fixed_time_of_use();
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 18).unwrap();
        for price in calculate_prices(&day(2025, 1, 18), &config, saturday) {
            assert_abs_diff_eq!(price.price_per_kwh.0, 0.09);
        }
    }

    #[test]
    fn test_weekday_holiday_is_priced_as_weekday() {
        // Epiphany, a Monday.
        let config = fixed_time_of_use();
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let prices = calculate_prices(&day(2025, 1, 6), &config, date);
        assert_abs_diff_eq!(prices[12].price_per_kwh.0, 0.25);
        assert_abs_diff_eq!(prices[3].price_per_kwh.0, 0.09);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let config = market(|settings| settings);
        let start_time = "2025-01-15T10:00:00+01:00".parse().unwrap();
        let input = [
            MarketPriceRecord { start_time, price_per_kwh: KilowattHourRate(0.3) },
            MarketPriceRecord { start_time, price_per_kwh: KilowattHourRate(0.1) },
        ];
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let prices = calculate_prices(&input, &config, date);
        assert_eq!(prices.len(), 2);
        assert_abs_diff_eq!(prices[0].price_per_kwh.0, 0.3);
        assert_abs_diff_eq!(prices[1].price_per_kwh.0, 0.1);
    }

    #[test]
    fn test_market_discount_window() {
        let config = market(|settings| TariffSettings {
            discount_start_hour: Some(12),
            discount_end_hour: Some(18),
            discount_percentage: Some(0.45),
            ..settings
        });
        let price = KilowattHourRate(0.20);
        assert_abs_diff_eq!(hourly_price(&config, price, 14, true).0, 0.11);
        assert_abs_diff_eq!(hourly_price(&config, price, 20, true).0, 0.20);
        assert_abs_diff_eq!(hourly_price(&config, price, 18, true).0, 0.20);
        assert_abs_diff_eq!(hourly_price(&config, price, 12, false).0, 0.11);
    }

    #[test]
    fn test_market_localizes_hour() {
        let config = market(|settings| TariffSettings {
            discount_start_hour: Some(12),
            discount_end_hour: Some(18),
            discount_percentage: Some(0.5),
            ..settings
        });
        // 12:00 UTC is 13:00 in Madrid, in the window; 10:00 UTC is 11:00, outside.
        let inside = MarketPriceRecord {
            start_time: "2025-01-15T12:00:00Z".parse().unwrap(),
            price_per_kwh: KilowattHourRate(0.2),
        };
        let outside = MarketPriceRecord {
            start_time: "2025-01-15T10:00:00Z".parse().unwrap(),
            price_per_kwh: KilowattHourRate(0.2),
        };
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let prices = calculate_prices(&[inside, outside], &config, date);
        assert_eq!(prices[0].start_time, outside.start_time);
        assert_abs_diff_eq!(prices[0].price_per_kwh.0, 0.2);
        assert_abs_diff_eq!(prices[1].price_per_kwh.0, 0.1);
    }

    #[test]
    fn test_zero_price_threshold() {
        let config = market(|settings| TariffSettings {
            zero_price_threshold: Some(0.05),
            ..settings
        });
        assert_abs_diff_eq!(hourly_price(&config, KilowattHourRate(0.049), 3, true).0, 0.0);
        assert_abs_diff_eq!(hourly_price(&config, KilowattHourRate(0.05), 3, true).0, 0.05);
    }

    #[test]
    fn test_rounding() {
        let config = market(|settings| settings);
        assert_abs_diff_eq!(
            hourly_price(&config, KilowattHourRate(0.123_456_789), 3, true).0,
            0.123_457,
        );
    }

    #[test]
    fn test_empty() {
        let config = market(|settings| settings);
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert!(calculate_prices(&[], &config, date).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let config = market(|settings| TariffSettings {
            discount_start_hour: Some(0),
            discount_end_hour: Some(8),
            discount_percentage: Some(0.3),
            ..settings
        });
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let input = day(2025, 1, 15);
        let first = calculate_prices(&input, &config, date);
        let second = calculate_prices(&input, &config, date);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap(),
        );
    }
}
