//! Tariff configuration and the per-kWh price rules.

mod calculator;
mod config;
mod period;
mod power;
mod price;
mod summary;

pub use self::{
    calculator::{calculate_prices, hourly_price},
    config::{
        ConfigError,
        DEFAULT_ELECTRICITY_TAX_RATE,
        DEFAULT_VAT_RATE,
        Discount,
        Pricing,
        PricingModel,
        TariffConfig,
        TariffSettings,
        TimeStructure,
    },
    period::{EnergyPeriod, HourSet, PeriodHours, PeriodRates, PowerPeriod},
    power::{PowerCost, calculate_power_cost},
    price::{CalculatedPriceRecord, MarketPriceRecord, PriceRecord},
    summary::{PriceSummary, current_price, hourly_prices},
};
