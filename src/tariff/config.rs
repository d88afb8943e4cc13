use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    quantity::{Cost, KilowattDayRate, KilowattHourRate, Kilowatts},
    tariff::period::{EnergyPeriod, HourSet, PeriodHours, PeriodRates},
};

/// Spanish *Impuesto Especial sobre la Electricidad*.
pub const DEFAULT_ELECTRICITY_TAX_RATE: f64 = 0.051_126_963_2;

pub const DEFAULT_VAT_RATE: f64 = 0.21;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("hour {hour} is assigned to both {first} and {second}")]
    OverlappingHour { hour: u32, first: EnergyPeriod, second: EnergyPeriod },

    #[error("hour {0} is not assigned to any period")]
    UnassignedHour(u32),

    #[error("hour {0} is outside of 0-23")]
    HourOutOfRange(u32),

    #[error("`{0}` is required by the selected pricing model")]
    MissingRate(&'static str),

    #[error("discount window requires start hour, end hour and percentage together")]
    PartialDiscount,

    #[error("discount hour {0} is outside of 0-23")]
    DiscountHourOutOfRange(u32),

    #[error("discount percentage {0} is outside of [0, 1]")]
    DiscountPercentageOutOfRange(f64),

    #[error("`{name}` must be a finite non-negative number, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Contracted rates, market prices are ignored.
    #[display("fixed")]
    Fixed,

    /// Market price, possibly discounted.
    #[display("market")]
    Market,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum TimeStructure {
    #[display("single rate")]
    SingleRate,

    #[display("time of use")]
    TimeOfUse,
}

/// Raw finished tariff configuration, as stored by the host.
///
/// Keys match the integration's config entry. Turn it into a [`TariffConfig`]
/// to validate it.
#[derive(Clone, Debug, Serialize, Deserialize, Builder)]
pub struct TariffSettings {
    pub pricing_model: PricingModel,
    pub time_structure: TimeStructure,

    #[serde(default)]
    pub fixed_rate: Option<f64>,

    #[serde(default)]
    pub p1_rate: Option<f64>,

    #[serde(default)]
    pub p2_rate: Option<f64>,

    #[serde(default)]
    pub p3_rate: Option<f64>,

    #[serde(default)]
    pub p1_hours_weekdays: Option<Vec<u32>>,

    #[serde(default)]
    pub p2_hours_weekdays: Option<Vec<u32>>,

    #[serde(default)]
    pub p3_hours_weekdays: Option<Vec<u32>>,

    /// €/kW/day.
    #[serde(default)]
    pub power_p1_rate: Option<f64>,

    /// €/kW/day.
    #[serde(default)]
    pub power_p2_rate: Option<f64>,

    #[serde(default)]
    pub solar_surplus_rate: Option<f64>,

    #[serde(default)]
    pub management_fee_monthly: Option<f64>,

    #[serde(default)]
    pub discount_start_hour: Option<u32>,

    #[serde(default)]
    pub discount_end_hour: Option<u32>,

    #[serde(default)]
    pub discount_percentage: Option<f64>,

    /// Market prices strictly below the threshold are zeroed.
    #[serde(default)]
    pub zero_price_threshold: Option<f64>,

    #[serde(default = "default_electricity_tax_rate")]
    #[builder(default = DEFAULT_ELECTRICITY_TAX_RATE)]
    pub electricity_tax_rate: f64,

    #[serde(default = "default_vat_rate")]
    #[builder(default = DEFAULT_VAT_RATE)]
    pub vat_rate: f64,

    /// Meter rental and the like, €/day.
    #[serde(default)]
    pub other_concepts_rate: Option<f64>,

    /// Contracted power.
    #[serde(default)]
    pub power_kw: Option<f64>,
}

const fn default_electricity_tax_rate() -> f64 {
    DEFAULT_ELECTRICITY_TAX_RATE
}

const fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

/// How the per-kWh price is derived, the product of pricing model and time structure.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Pricing {
    FixedSingleRate(KilowattHourRate),
    FixedTimeOfUse(PeriodRates),

    /// The time structure is informational: market prices are already hourly.
    Market(TimeStructure),
}

impl Pricing {
    #[must_use]
    pub const fn model(&self) -> PricingModel {
        match self {
            Self::FixedSingleRate(_) | Self::FixedTimeOfUse(_) => PricingModel::Fixed,
            Self::Market(_) => PricingModel::Market,
        }
    }

    #[must_use]
    pub const fn time_structure(&self) -> TimeStructure {
        match self {
            Self::FixedSingleRate(_) => TimeStructure::SingleRate,
            Self::FixedTimeOfUse(_) => TimeStructure::TimeOfUse,
            Self::Market(time_structure) => *time_structure,
        }
    }
}

/// Market price discount window, `start_hour <= hour < end_hour` in local time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Discount {
    pub start_hour: u32,
    pub end_hour: u32,
    pub percentage: f64,
}

impl Discount {
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn apply(&self, price: KilowattHourRate) -> KilowattHourRate {
        price * (1.0 - self.percentage)
    }
}

/// Validated tariff configuration.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct TariffConfig {
    pricing: Pricing,
    period_hours: PeriodHours,
    power_peak_rate: Option<KilowattDayRate>,
    power_valley_rate: Option<KilowattDayRate>,
    solar_surplus_rate: Option<KilowattHourRate>,
    management_fee_monthly: Option<Cost>,
    discount: Option<Discount>,
    zero_price_threshold: Option<KilowattHourRate>,
    electricity_tax_rate: f64,
    vat_rate: f64,
    other_concepts_rate: Option<Cost>,
    power: Option<Kilowatts>,
}

impl TariffConfig {
    #[must_use]
    pub const fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    #[must_use]
    pub const fn pricing_model(&self) -> PricingModel {
        self.pricing.model()
    }

    #[must_use]
    pub const fn period_hours(&self) -> &PeriodHours {
        &self.period_hours
    }

    /// Peak and valley contracted power rates, if both are configured.
    #[must_use]
    pub fn power_rates(&self) -> Option<(KilowattDayRate, KilowattDayRate)> {
        self.power_peak_rate.zip(self.power_valley_rate)
    }

    #[must_use]
    pub const fn solar_surplus_rate(&self) -> Option<KilowattHourRate> {
        self.solar_surplus_rate
    }

    #[must_use]
    pub const fn management_fee_monthly(&self) -> Option<Cost> {
        self.management_fee_monthly
    }

    /// Monthly management fee spread over a nominal 30-day month.
    #[must_use]
    pub fn management_fee_daily(&self) -> Option<Cost> {
        self.management_fee_monthly.map(|fee| fee / 30.0)
    }

    #[must_use]
    pub const fn discount(&self) -> Option<&Discount> {
        self.discount.as_ref()
    }

    #[must_use]
    pub const fn zero_price_threshold(&self) -> Option<KilowattHourRate> {
        self.zero_price_threshold
    }

    #[must_use]
    pub const fn electricity_tax_rate(&self) -> f64 {
        self.electricity_tax_rate
    }

    #[must_use]
    pub const fn vat_rate(&self) -> f64 {
        self.vat_rate
    }

    /// €/day.
    #[must_use]
    pub const fn other_concepts_rate(&self) -> Option<Cost> {
        self.other_concepts_rate
    }

    #[must_use]
    pub const fn power(&self) -> Option<Kilowatts> {
        self.power
    }

    /// Contracted rate of the local hour, or `None` for the market model.
    #[must_use]
    pub fn fixed_rate(&self, hour: u32, is_weekday: bool) -> Option<KilowattHourRate> {
        match &self.pricing {
            Pricing::FixedSingleRate(rate) => Some(*rate),
            Pricing::FixedTimeOfUse(rates) => {
                Some(rates.get(self.period_hours.energy_period(hour, is_weekday)))
            }
            Pricing::Market(_) => None,
        }
    }
}

impl TryFrom<TariffSettings> for TariffConfig {
    type Error = ConfigError;

    fn try_from(settings: TariffSettings) -> Result<Self, Self::Error> {
        let pricing = match (settings.pricing_model, settings.time_structure) {
            (PricingModel::Fixed, TimeStructure::SingleRate) => {
                Pricing::FixedSingleRate(required_rate("fixed_rate", settings.fixed_rate)?.into())
            }
            (PricingModel::Fixed, TimeStructure::TimeOfUse) => Pricing::FixedTimeOfUse(PeriodRates {
                peak: required_rate("p1_rate", settings.p1_rate)?.into(),
                standard: required_rate("p2_rate", settings.p2_rate)?.into(),
                off_peak: required_rate("p3_rate", settings.p3_rate)?.into(),
            }),
            (PricingModel::Market, time_structure) => Pricing::Market(time_structure),
        };

        let default_hours = PeriodHours::default();
        let period_hours = PeriodHours::try_new(
            hour_set(settings.p1_hours_weekdays, default_hours.peak())?,
            hour_set(settings.p2_hours_weekdays, default_hours.standard())?,
            hour_set(settings.p3_hours_weekdays, default_hours.off_peak())?,
        )?;

        let discount = match (
            settings.discount_start_hour,
            settings.discount_end_hour,
            settings.discount_percentage,
        ) {
            (None, None, None) => None,
            (Some(start_hour), Some(end_hour), Some(percentage)) => {
                if let Some(hour) = [start_hour, end_hour].into_iter().find(|hour| *hour > 23) {
                    return Err(ConfigError::DiscountHourOutOfRange(hour));
                }
                if !(0.0..=1.0).contains(&percentage) {
                    return Err(ConfigError::DiscountPercentageOutOfRange(percentage));
                }
                Some(Discount { start_hour, end_hour, percentage })
            }
            _ => return Err(ConfigError::PartialDiscount),
        };

        Ok(Self {
            pricing,
            period_hours,
            power_peak_rate: optional_rate("power_p1_rate", settings.power_p1_rate)?
                .map(Into::into),
            power_valley_rate: optional_rate("power_p2_rate", settings.power_p2_rate)?
                .map(Into::into),
            solar_surplus_rate: optional_rate("solar_surplus_rate", settings.solar_surplus_rate)?
                .map(Into::into),
            management_fee_monthly: optional_rate(
                "management_fee_monthly",
                settings.management_fee_monthly,
            )?
            .map(Into::into),
            discount,
            zero_price_threshold: optional_rate(
                "zero_price_threshold",
                settings.zero_price_threshold,
            )?
            .map(Into::into),
            electricity_tax_rate: required_rate(
                "electricity_tax_rate",
                Some(settings.electricity_tax_rate),
            )?,
            vat_rate: required_rate("vat_rate", Some(settings.vat_rate))?,
            other_concepts_rate: optional_rate("other_concepts_rate", settings.other_concepts_rate)?
                .map(Into::into),
            power: optional_rate("power_kw", settings.power_kw)?.map(Into::into),
        })
    }
}

fn optional_rate(name: &'static str, value: Option<f64>) -> Result<Option<f64>, ConfigError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(ConfigError::InvalidRate { name, value })
        }
        _ => Ok(value),
    }
}

fn required_rate(name: &'static str, value: Option<f64>) -> Result<f64, ConfigError> {
    optional_rate(name, value)?.ok_or(ConfigError::MissingRate(name))
}

fn hour_set(hours: Option<Vec<u32>>, default: HourSet) -> Result<HourSet, ConfigError> {
    hours.map_or(Ok(default), HourSet::try_from_hours)
}
