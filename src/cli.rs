use std::path::PathBuf;

use chrono::{DateTime, Days, Utc};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tarifa::{
    billing::{InvoiceEstimator, daily_cost},
    consumption::{DailyRollup, MonthlyRollup, WeeklyRollup, YearlyRollup},
    credit::{estimated_credits, totals},
    tariff::{PriceSummary, calculate_prices},
    time::local_date,
};

use crate::{
    prelude::*,
    snapshot::{Snapshot, read_tariff},
    tables::{
        build_consumption_table,
        build_cost_table,
        build_credits_table,
        build_invoice_table,
        build_price_summary_table,
        build_prices_table,
    },
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Tariff configuration, TOML.
    #[clap(long = "tariff", env = "TARIFA_TARIFF")]
    tariff_path: PathBuf,

    /// Fetched prices, consumption, invoice and credits, JSON.
    #[clap(long = "snapshot", env = "TARIFA_SNAPSHOT")]
    snapshot_path: PathBuf,

    /// Pretend it is this moment instead of now.
    #[clap(long, env = "TARIFA_NOW")]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Subcommand)]
pub enum Command {
    /// Today's and tomorrow's consumer prices.
    #[clap(name = "prices")]
    Prices,

    /// Daily, weekly, monthly and yearly consumption.
    #[clap(name = "consumption")]
    Consumption,

    /// Cost of today, or of the latest day with consumption.
    #[clap(name = "cost")]
    Cost,

    /// Next invoice estimate.
    #[clap(name = "invoice")]
    Invoice,

    /// Credit totals and this month's estimate.
    #[clap(name = "credits")]
    Credits,
}

impl Args {
    pub fn run(self) -> Result {
        let config = read_tariff(&self.tariff_path)?;
        let snapshot = Snapshot::read(&self.snapshot_path)?;
        let now = self.now.unwrap_or_else(Utc::now);
        let today = local_date(&now);
        let tomorrow = today.checked_add_days(Days::new(1)).context("date overflow")?;
        let today_prices = calculate_prices(&snapshot.today_prices, &config, today);
        let tomorrow_prices = calculate_prices(&snapshot.tomorrow_prices, &config, tomorrow);

        match self.command {
            Command::Prices => {
                let rows = snapshot
                    .today_prices
                    .iter()
                    .sorted_by_key(|record| record.start_time)
                    .zip(&today_prices)
                    .chain(
                        snapshot
                            .tomorrow_prices
                            .iter()
                            .sorted_by_key(|record| record.start_time)
                            .zip(&tomorrow_prices),
                    )
                    .collect_vec();
                println!("{}", build_prices_table(&rows));
                let Some(summary) = PriceSummary::new(&today_prices, &now) else {
                    warn!(%today, "no prices published");
                    return Ok(());
                };
                println!("{}", build_price_summary_table(&summary));
            }

            Command::Consumption => {
                let consumption = snapshot.consumption();
                ensure!(!consumption.is_empty(), "no consumption in the snapshot");
                println!(
                    "{}",
                    build_consumption_table(
                        DailyRollup::new(&consumption, &now).as_ref(),
                        WeeklyRollup::new(&consumption, &now).as_ref(),
                        MonthlyRollup::new(&consumption, &now).as_ref(),
                        YearlyRollup::new(&consumption, &now).as_ref(),
                    ),
                );
            }

            Command::Cost => {
                let prices = today_prices.iter().chain(&tomorrow_prices).copied().collect_vec();
                let cost = daily_cost(&config, &snapshot.consumption(), &prices, &now)
                    .context("not enough data to calculate the daily cost")?;
                println!("{}", build_cost_table(&cost));
            }

            Command::Invoice => {
                let last_invoice =
                    snapshot.last_invoice().context("no last invoice in the snapshot")?;
                info!(
                    %last_invoice.start,
                    %last_invoice.end,
                    %last_invoice.amount,
                    "last invoice",
                );
                let prices = today_prices.iter().chain(&tomorrow_prices).copied().collect_vec();
                let consumption = snapshot.consumption();
                let estimate = InvoiceEstimator::builder()
                    .config(&config)
                    .last_invoice(&last_invoice)
                    .consumption(&consumption)
                    .prices(&prices)
                    .now(now)
                    .build()
                    .estimate()
                    .context("not enough data to estimate the next invoice")?;
                println!("{}", build_invoice_table(&estimate.rounded()));
            }

            Command::Credits => {
                let credits = snapshot.credits();
                let totals = totals(&credits, &now);
                let market_prices = snapshot
                    .today_prices
                    .iter()
                    .chain(&snapshot.tomorrow_prices)
                    .copied()
                    .collect_vec();
                let estimated =
                    estimated_credits(&config, &snapshot.consumption(), &market_prices, &now);
                println!("{}", build_credits_table(&totals, estimated));
            }
        }

        Ok(())
    }
}
