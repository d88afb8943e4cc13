use bon::Builder;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    billing::{cost::apply_taxes, energy::EnergyCostCalculator},
    consumption::ConsumptionRecord,
    quantity::{Cost, KilowattHours},
    tariff::{CalculatedPriceRecord, PricingModel, TariffConfig, calculate_power_cost},
    time::{dates, local_date, month_end},
};

/// Last billed period.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub amount: Cost,
}

impl InvoicePeriod {
    /// The period following this one.
    ///
    /// It starts the day after and lasts as long, but never extends past the end of
    /// the month it starts in.
    #[must_use]
    pub fn next_period(&self) -> Option<BillingPeriod> {
        if self.end < self.start {
            return None;
        }
        let nominal_days = (self.end - self.start).num_days().unsigned_abs() + 1;
        let start = self.end.checked_add_days(Days::new(1))?;
        let naive_end = start.checked_add_days(Days::new(nominal_days - 1))?;
        let end = if (naive_end.year(), naive_end.month()) == (start.year(), start.month()) {
            naive_end
        } else {
            month_end(start)
        };
        Some(BillingPeriod { start, end, nominal_days })
    }
}

/// Amounts above 1000 are taken as cents.
pub fn normalize_invoice_amount(amount: f64) -> Cost {
    if amount > 1000.0 { Cost(amount / 100.0) } else { Cost(amount) }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,

    /// Inclusive.
    pub end: NaiveDate,

    /// Length of the previous period, before clamping to the month end.
    pub nominal_days: u64,
}

impl BillingPeriod {
    #[must_use]
    pub fn n_days(&self) -> u64 {
        (self.end - self.start).num_days().unsigned_abs() + 1
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        dates(self.start, self.end)
    }
}

/// Projected next invoice. Amounts keep full precision until [`InvoiceEstimate::rounded`].
///
/// This is a heuristic: the average elapsed day is projected onto the remaining days.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvoiceEstimate {
    pub period: BillingPeriod,
    pub days_elapsed: u64,
    pub days_remaining: u64,
    pub actual_energy_cost: Cost,
    pub projected_energy_cost: Cost,
    pub power_cost: Cost,
    pub management_fee: Cost,
    pub other_concepts: Cost,
    pub base_total: Cost,
    pub electricity_tax: Cost,
    pub vat: Cost,
    pub total: Cost,
}

impl InvoiceEstimate {
    pub fn rounded(self) -> Self {
        Self {
            actual_energy_cost: self.actual_energy_cost.round_to_cents(),
            projected_energy_cost: self.projected_energy_cost.round_to_cents(),
            power_cost: self.power_cost.round_to_cents(),
            management_fee: self.management_fee.round_to_cents(),
            other_concepts: self.other_concepts.round_to_cents(),
            base_total: self.base_total.round_to_cents(),
            electricity_tax: self.electricity_tax.round_to_cents(),
            vat: self.vat.round_to_cents(),
            total: self.total.round_to_cents(),
            ..self
        }
    }
}

#[derive(Builder)]
pub struct InvoiceEstimator<'a> {
    config: &'a TariffConfig,
    last_invoice: &'a InvoicePeriod,
    consumption: &'a [ConsumptionRecord],

    /// Calculated prices known so far, normally today's and tomorrow's.
    prices: &'a [CalculatedPriceRecord],

    now: DateTime<Utc>,
}

impl InvoiceEstimator<'_> {
    /// `None` until the next period starts, or when there is no data to project from.
    #[must_use]
    #[instrument(skip_all, fields(now = %self.now))]
    pub fn estimate(&self) -> Option<InvoiceEstimate> {
        let period = self.last_invoice.next_period()?;
        let today = local_date(&self.now);
        if today < period.start {
            debug!(%period.start, "next billing period has not started yet");
            return None;
        }
        if self.consumption.is_empty()
            || (self.prices.is_empty() && self.config.pricing_model() == PricingModel::Market)
        {
            debug!("not enough data to estimate");
            return None;
        }

        let (days_elapsed, days_remaining) = if today > period.end {
            (period.n_days(), 0)
        } else {
            let days_elapsed = (today - period.start).num_days().unsigned_abs() + 1;
            (days_elapsed, (period.end - today).num_days().unsigned_abs())
        };
        if days_elapsed == 0 {
            return None;
        }

        let calculator = EnergyCostCalculator::new(self.config, self.consumption, self.prices);
        let elapsed_end = today.min(period.end);
        let actual_energy_cost: Cost = dates(period.start, elapsed_end)
            .map(|date| calculator.day_energy_cost(date).unwrap_or(Cost::ZERO))
            .sum();
        let consumed: KilowattHours =
            dates(period.start, elapsed_end).map(|date| calculator.day_consumption(date)).sum();
        #[expect(clippy::cast_precision_loss)]
        let average_daily_consumption = consumed / days_elapsed as f64;

        let projected_energy_cost: Cost = today
            .succ_opt()
            .into_iter()
            .flat_map(|tomorrow| dates(tomorrow, period.end))
            .filter_map(|date| {
                let price =
                    calculator.day_average_price(date).or_else(|| calculator.average_price())?;
                Some(average_daily_consumption * price)
            })
            .sum();

        let power_cost = self.config.power().map_or(Cost::ZERO, |power| {
            period
                .dates()
                .map(|date| calculate_power_cost(self.config, power, date).total_cost)
                .sum()
        });
        let management_fee = self.config.management_fee_monthly().unwrap_or(Cost::ZERO);
        #[expect(clippy::cast_precision_loss)]
        let other_concepts = self
            .config
            .other_concepts_rate()
            .map_or(Cost::ZERO, |rate| rate * period.nominal_days as f64);

        let base_total = actual_energy_cost
            + projected_energy_cost
            + power_cost
            + management_fee
            + other_concepts;
        let (electricity_tax, vat) = apply_taxes(self.config, base_total);
        let estimate = InvoiceEstimate {
            period,
            days_elapsed,
            days_remaining,
            actual_energy_cost,
            projected_energy_cost,
            power_cost,
            management_fee,
            other_concepts,
            base_total,
            electricity_tax,
            vat,
            total: base_total + electricity_tax + vat,
        };
        debug!(days_elapsed, days_remaining, total = %estimate.total, "estimated next invoice");
        Some(estimate)
    }
}
