use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use tarifa::{
    billing::{DailyCost, InvoiceEstimate},
    consumption::{DailyRollup, MonthlyRollup, WeeklyRollup, YearlyRollup},
    credit::CreditTotals,
    quantity::Cost,
    tariff::{CalculatedPriceRecord, MarketPriceRecord, PriceSummary},
    time::localize,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_prices_table(prices: &[(&MarketPriceRecord, &CalculatedPriceRecord)]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Hour", "Market", "Price"]);
    for (market, calculated) in prices {
        let start_time = localize(&calculated.start_time);
        table.add_row(vec![
            Cell::new(start_time.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(start_time.format("%H:%M")),
            Cell::new(market.price_per_kwh)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(calculated.price_per_kwh).set_alignment(CellAlignment::Right).fg(
                if calculated.price_per_kwh < market.price_per_kwh {
                    Color::Green
                } else {
                    Color::Reset
                },
            ),
        ]);
    }
    table
}

pub fn build_price_summary_table(summary: &PriceSummary) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Mean", "Min", "Max", "Cheapest", "Current"]);
    table.add_row(vec![
        Cell::new(summary.mean),
        Cell::new(summary.min).fg(Color::Green),
        Cell::new(summary.max).fg(Color::Red),
        Cell::new(&summary.cheapest_hour),
        summary.current.map_or_else(|| Cell::new("-").add_attribute(Attribute::Dim), Cell::new),
    ]);
    table
}

pub fn build_consumption_table(
    daily: Option<&DailyRollup>,
    weekly: Option<&WeeklyRollup>,
    monthly: Option<&MonthlyRollup>,
    yearly: Option<&YearlyRollup>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Rollup", "Period", "Current", "Total", "Breakdown"]);
    if let Some(daily) = daily {
        let breakdown = daily
            .labelled_hours()
            .filter(|(_, total)| total.0 > 0.0)
            .map(|(label, total)| format!("{label}: {total}"));
        table.add_row(row("Day", daily.date, daily.is_today, daily.total, breakdown));
    }
    if let Some(weekly) = weekly {
        let breakdown = weekly.daily.iter().map(|(date, total)| format!("{date}: {total}"));
        let period = format!("{} - {}", weekly.start, weekly.end);
        table.add_row(row("Week", period, weekly.is_current, weekly.total, breakdown));
    }
    if let Some(monthly) = monthly {
        let breakdown = monthly.labelled_weeks().map(|(label, total)| format!("{label}: {total}"));
        table.add_row(row("Month", monthly.month, monthly.is_current, monthly.total, breakdown));
    }
    if let Some(yearly) = yearly {
        let breakdown = yearly.labelled_months().map(|(label, total)| format!("{label}: {total}"));
        table.add_row(row("Year", yearly.year, yearly.is_current, yearly.total, breakdown));
    }
    table
}

fn row(
    rollup: &str,
    period: impl ToString,
    is_current: bool,
    total: impl ToString,
    breakdown: impl Iterator<Item = String>,
) -> Vec<Cell> {
    vec![
        Cell::new(rollup),
        Cell::new(period.to_string()),
        if is_current {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkYellow)
        },
        Cell::new(total.to_string()).set_alignment(CellAlignment::Right),
        Cell::new(breakdown.collect::<Vec<_>>().join("\n")).add_attribute(Attribute::Dim),
    ]
}

pub fn build_cost_table(cost: &DailyCost) -> Table {
    let breakdown = cost.breakdown.rounded();
    let mut table = new_table();
    table.set_header(vec!["Date", "Today", "Base", "Other", "Tax", "VAT", "Total"]);
    table.add_row(vec![
        Cell::new(cost.date),
        Cell::new(if cost.is_today { "yes" } else { "no" }),
        amount_cell(breakdown.base).add_attribute(Attribute::Dim),
        amount_cell(breakdown.other_concepts).add_attribute(Attribute::Dim),
        amount_cell(breakdown.electricity_tax).add_attribute(Attribute::Dim),
        amount_cell(breakdown.vat).add_attribute(Attribute::Dim),
        amount_cell(breakdown.total).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn build_invoice_table(estimate: &InvoiceEstimate) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Concept", "Amount"]);
    table.add_row(vec![
        Cell::new(format!("{} - {}", estimate.period.start, estimate.period.end)),
        Cell::new(format!("{} + {} days", estimate.days_elapsed, estimate.days_remaining))
            .set_alignment(CellAlignment::Right),
    ]);
    for (concept, amount) in [
        ("Actual energy", estimate.actual_energy_cost),
        ("Projected energy", estimate.projected_energy_cost),
        ("Power", estimate.power_cost),
        ("Management fee", estimate.management_fee),
        ("Other concepts", estimate.other_concepts),
        ("Base", estimate.base_total),
        ("Electricity tax", estimate.electricity_tax),
        ("VAT", estimate.vat),
    ] {
        table.add_row(vec![Cell::new(concept), amount_cell(amount).add_attribute(Attribute::Dim)]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        amount_cell(estimate.total).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn build_credits_table(totals: &CreditTotals, estimated: Option<Cost>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Reason", "This month", "All time"]);
    for (reason_code, total) in &totals.by_reason_code {
        let current_month = totals.current_month_by_reason_code.get(reason_code);
        table.add_row(vec![
            Cell::new(reason_code),
            current_month.map_or_else(
                || Cell::new("-").add_attribute(Attribute::Dim),
                |total| amount_cell(*total),
            ),
            amount_cell(*total).add_attribute(Attribute::Dim),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        amount_cell(totals.current_month).add_attribute(Attribute::Bold),
        amount_cell(totals.total).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Last month").add_attribute(Attribute::Dim),
        amount_cell(totals.last_month),
        Cell::new(""),
    ]);
    if let Some(estimated) = estimated {
        table.add_row(vec![
            Cell::new("Estimated").add_attribute(Attribute::Dim),
            amount_cell(estimated).fg(Color::Green),
            Cell::new(""),
        ]);
    }
    table
}

fn amount_cell(amount: Cost) -> Cell {
    Cell::new(amount).set_alignment(CellAlignment::Right).fg(if amount < Cost::ZERO {
        Color::Red
    } else {
        Color::Reset
    })
}
