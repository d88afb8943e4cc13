//! Reporting totals with their breakdowns.
//!
//! Every rollup reports the period containing "now" when it has data, and otherwise falls
//! back to the most recent period with data.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Month, NaiveDate, TimeZone};
use serde::Serialize;

use crate::{
    consumption::{
        group::{Daily, Hourly, Monthly, group_by},
        record::ConsumptionRecord,
        select::select_reporting_period,
    },
    quantity::KilowattHours,
    time::{YearMonth, dates, local_date, month_end, month_start, week_start},
};

const PRECISION: i32 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyRollup {
    pub date: NaiveDate,
    pub is_today: bool,
    pub total: KilowattHours,

    /// Consumption of each local hour, zero when missing.
    pub hourly: [KilowattHours; 24],

    /// Latest date with any data.
    pub data_available_until: NaiveDate,
}

impl DailyRollup {
    #[must_use]
    pub fn new<Tz: TimeZone>(records: &[ConsumptionRecord], now: &DateTime<Tz>) -> Option<Self> {
        let daily = group_by(records, &Daily);
        let data_available_until = *daily.keys().next_back()?;
        let period = select_reporting_period(&daily, &Daily, now)?;
        let hourly_totals = group_by(records, &Hourly);
        let mut hourly = [KilowattHours::ZERO; 24];
        for ((_, hour), total) in hourly_totals.range((period.key, 0)..=(period.key, 23)) {
            hourly[*hour as usize] = total.round_to(PRECISION);
        }
        Some(Self {
            date: period.key,
            is_today: period.is_current,
            total: period.total.round_to(PRECISION),
            hourly,
            data_available_until,
        })
    }

    /// `hour_HH` attributes.
    pub fn labelled_hours(&self) -> impl Iterator<Item = (String, KilowattHours)> {
        self.hourly.iter().enumerate().map(|(hour, total)| (format!("hour_{hour:02}"), *total))
    }
}

/// Seven days ending today, or ending on the latest date with data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeeklyRollup {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_current: bool,
    pub total: KilowattHours,

    /// Days of the window that have data, in order.
    pub daily: Vec<(NaiveDate, KilowattHours)>,

    pub data_available_until: NaiveDate,
}

impl WeeklyRollup {
    #[must_use]
    pub fn new<Tz: TimeZone>(records: &[ConsumptionRecord], now: &DateTime<Tz>) -> Option<Self> {
        let daily = group_by(records, &Daily);
        let data_available_until = *daily.keys().next_back()?;
        let today = local_date(now);
        Self::window(&daily, today, true)
            .or_else(|| Self::window(&daily, data_available_until, false))
            .map(|rollup| Self { data_available_until, ..rollup })
    }

    /// The rollup only changes with the local date.
    #[must_use]
    pub fn memo_key<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
        local_date(now)
    }

    fn window(
        daily: &BTreeMap<NaiveDate, KilowattHours>,
        end: NaiveDate,
        is_current: bool,
    ) -> Option<Self> {
        let start = end - Days::new(6);
        let days: Vec<_> = daily.range(start..=end).map(|(date, total)| (*date, *total)).collect();
        let total: KilowattHours = days.iter().map(|(_, total)| *total).sum();
        (total > KilowattHours::ZERO).then(|| Self {
            start,
            end,
            is_current,
            total: total.round_to(PRECISION),
            daily: days
                .into_iter()
                .map(|(date, total)| (date, total.round_to(PRECISION)))
                .collect(),
            data_available_until: end,
        })
    }
}

/// Month so far, broken down by calendar week.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyRollup {
    pub month: YearMonth,
    pub is_current: bool,
    pub total: KilowattHours,

    /// Keyed by the Monday of each calendar week, which may fall into the previous month.
    pub weekly: BTreeMap<NaiveDate, KilowattHours>,

    /// Latest month with any data.
    pub data_available_until: YearMonth,
}

impl MonthlyRollup {
    #[must_use]
    pub fn new<Tz: TimeZone>(records: &[ConsumptionRecord], now: &DateTime<Tz>) -> Option<Self> {
        let daily = group_by(records, &Daily);
        let data_available_until = YearMonth::of(*daily.keys().next_back()?);
        let today = local_date(now);

        let current = Self::sum(&daily, month_start(today), today);
        let (month, (total, weekly), is_current) = if current.0 > KilowattHours::ZERO {
            (YearMonth::of(today), current, true)
        } else {
            let first_day = data_available_until.first_day()?;
            (data_available_until, Self::sum(&daily, first_day, month_end(first_day)), false)
        };
        Some(Self {
            month,
            is_current,
            total: total.round_to(PRECISION),
            weekly: weekly
                .into_iter()
                .map(|(week, total)| (week, total.round_to(PRECISION)))
                .collect(),
            data_available_until,
        })
    }

    /// The rollup is refreshed once per calendar week.
    #[must_use]
    pub fn memo_key<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
        week_start(local_date(now))
    }

    /// `week_N` attributes, numbered chronologically from one.
    pub fn labelled_weeks(&self) -> impl Iterator<Item = (String, KilowattHours)> {
        self.weekly.values().enumerate().map(|(i, total)| (format!("week_{}", i + 1), *total))
    }

    fn sum(
        daily: &BTreeMap<NaiveDate, KilowattHours>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> (KilowattHours, BTreeMap<NaiveDate, KilowattHours>) {
        let mut total = KilowattHours::ZERO;
        let mut weekly = BTreeMap::new();
        for date in dates(start, end) {
            if let Some(value) = daily.get(&date) {
                total += *value;
                *weekly.entry(week_start(date)).or_insert(KilowattHours::ZERO) += *value;
            }
        }
        (total, weekly)
    }
}

/// Year so far, broken down by month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct YearlyRollup {
    pub year: i32,
    pub is_current: bool,
    pub total: KilowattHours,
    pub monthly: BTreeMap<u32, KilowattHours>,

    /// Latest year with any data.
    pub data_available_until: i32,
}

impl YearlyRollup {
    #[must_use]
    pub fn new<Tz: TimeZone>(records: &[ConsumptionRecord], now: &DateTime<Tz>) -> Option<Self> {
        let monthly = group_by(records, &Monthly);
        let latest = *monthly.keys().next_back()?;
        let today = local_date(now);

        let current = Self::sum(&monthly, today.year(), today.month());
        let (year, (total, months), is_current) =
            if current.0 > KilowattHours::ZERO || latest.year == today.year() {
                (today.year(), current, true)
            } else {
                (latest.year, Self::sum(&monthly, latest.year, 12), false)
            };
        Some(Self {
            year,
            is_current,
            total: total.round_to(PRECISION),
            monthly: months
                .into_iter()
                .map(|(month, total)| (month, total.round_to(PRECISION)))
                .collect(),
            data_available_until: latest.year,
        })
    }

    /// The rollup is refreshed once per calendar month.
    pub fn memo_key<Tz: TimeZone>(now: &DateTime<Tz>) -> YearMonth {
        YearMonth::of(local_date(now))
    }

    /// Lowercase English month name attributes.
    pub fn labelled_months(&self) -> impl Iterator<Item = (String, KilowattHours)> {
        self.monthly.iter().filter_map(|(month, total)| {
            let month = u8::try_from(*month).ok().and_then(|month| Month::try_from(month).ok())?;
            Some((month.name().to_lowercase(), *total))
        })
    }

    fn sum(
        monthly: &BTreeMap<YearMonth, KilowattHours>,
        year: i32,
        last_month: u32,
    ) -> (KilowattHours, BTreeMap<u32, KilowattHours>) {
        let months: BTreeMap<_, _> = monthly
            .range(YearMonth { year, month: 1 }..=YearMonth { year, month: last_month })
            .map(|(key, total)| (key.month, *total))
            .collect();
        (months.values().copied().sum(), months)
    }
}
