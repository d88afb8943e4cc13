use std::{fs, path::Path};

use chrono::NaiveDate;
use serde::Deserialize;
use tarifa::{
    billing::{InvoicePeriod, normalize_invoice_amount},
    consumption::{self, ConsumptionRecord},
    credit::{self, CreditRecord},
    tariff::{MarketPriceRecord, TariffConfig, TariffSettings},
};

use crate::prelude::*;

/// Data fetched by the collaborators in one refresh cycle.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub today_prices: Vec<MarketPriceRecord>,
    pub tomorrow_prices: Vec<MarketPriceRecord>,
    pub consumption: Vec<ConsumptionRecord>,
    pub historical_consumption: Vec<ConsumptionRecord>,
    pub last_invoice: Option<LastInvoice>,
    pub credits: Vec<CreditRecord>,
    pub historical_credits: Vec<CreditRecord>,
}

/// Last invoice as reported by the account, the amount being either in euros or in cents.
#[derive(Deserialize)]
pub struct LastInvoice {
    start: NaiveDate,
    end: NaiveDate,
    amount: f64,
}

impl Snapshot {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read the snapshot `{}`", path.display()))?;
        let snapshot: Self =
            serde_json::from_str(&contents).context("failed to parse the snapshot")?;
        info!(
            n_today_prices = snapshot.today_prices.len(),
            n_tomorrow_prices = snapshot.tomorrow_prices.len(),
            n_consumption = snapshot.consumption.len() + snapshot.historical_consumption.len(),
            n_credits = snapshot.credits.len() + snapshot.historical_credits.len(),
            "loaded the snapshot",
        );
        Ok(snapshot)
    }

    pub fn consumption(&self) -> Vec<ConsumptionRecord> {
        consumption::merge(&self.consumption, &self.historical_consumption)
    }

    pub fn credits(&self) -> Vec<CreditRecord> {
        credit::merge(&self.credits, &self.historical_credits)
    }

    pub fn last_invoice(&self) -> Option<InvoicePeriod> {
        self.last_invoice.as_ref().map(|invoice| InvoicePeriod {
            start: invoice.start,
            end: invoice.end,
            amount: normalize_invoice_amount(invoice.amount),
        })
    }
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_tariff(path: &Path) -> Result<TariffConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read the tariff `{}`", path.display()))?;
    let settings: TariffSettings =
        toml::from_str(&contents).context("failed to parse the tariff")?;
    info!(%settings.pricing_model, %settings.time_structure, "loaded the tariff");
    TariffConfig::try_from(settings).context("invalid tariff")
}
