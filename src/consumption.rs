//! Consumption grouping, reporting period selection and rollups.

mod group;
mod memo;
mod record;
mod rollup;
mod select;

pub use self::{
    group::{
        CalendarWeekly,
        Daily,
        Granularity,
        Hourly,
        Monthly,
        TrailingWeekly,
        Yearly,
        group_by,
    },
    memo::Memoized,
    record::{ConsumptionRecord, merge},
    rollup::{DailyRollup, MonthlyRollup, WeeklyRollup, YearlyRollup},
    select::{ReportingPeriod, select_reporting_period},
};
