use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::quantity::KilowattHourRate;

/// One hour's per-kWh price.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub start_time: DateTime<FixedOffset>,

    #[serde(alias = "price")]
    pub price_per_kwh: KilowattHourRate,
}

/// Published wholesale or regulated price, as received from the price source.
pub type MarketPriceRecord = PriceRecord;

/// Final consumer price after the tariff rules.
pub type CalculatedPriceRecord = PriceRecord;
