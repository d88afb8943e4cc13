//! Daily cost and next invoice estimation.

mod cost;
mod energy;
mod invoice;

pub use self::{
    cost::{CostBreakdown, DailyCost, calculate_daily_cost, daily_cost},
    energy::EnergyCostCalculator,
    invoice::{
        BillingPeriod,
        InvoiceEstimate,
        InvoiceEstimator,
        InvoicePeriod,
        normalize_invoice_amount,
    },
};
