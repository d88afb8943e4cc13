use std::fmt::{Debug, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    quantity::KilowattHourRate,
    tariff::config::ConfigError,
    time::is_weekday,
};

/// Energy billing period.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum EnergyPeriod {
    /// *Punta*.
    #[display("P1")]
    Peak,

    /// *Llano*.
    #[display("P2")]
    Standard,

    /// *Valle*.
    #[display("P3")]
    OffPeak,
}

/// Contracted power billing period: energy P2 and P3 collapse into the valley.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum PowerPeriod {
    #[display("P1")]
    Peak,

    #[display("P2")]
    Valley,
}

/// Set of hours of the day, `0..24`.
#[must_use]
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct HourSet(u32);

impl HourSet {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self((1 << 24) - 1);

    pub fn try_from_hours(hours: impl IntoIterator<Item = u32>) -> Result<Self, ConfigError> {
        let mut this = Self::EMPTY;
        for hour in hours {
            if hour >= 24 {
                return Err(ConfigError::HourOutOfRange(hour));
            }
            this.0 |= 1 << hour;
        }
        Ok(this)
    }

    #[must_use]
    pub const fn contains(self, hour: u32) -> bool {
        hour < 24 && (self.0 & (1 << hour)) != 0
    }

    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..24).filter(move |hour| self.contains(*hour))
    }
}

impl Debug for HourSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Weekday assignment of every hour to exactly one energy period.
///
/// Weekends are entirely [`EnergyPeriod::OffPeak`] regardless of the assignment.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PeriodHours {
    peak: HourSet,
    standard: HourSet,
    off_peak: HourSet,
}

impl Default for PeriodHours {
    /// Official Octopus Energy España split.
    fn default() -> Self {
        Self {
            peak: HourSet((0b1111 << 11) | (0b1111 << 19)),
            standard: HourSet((0b11 << 9) | (0b1111 << 15) | (1 << 23)),
            off_peak: HourSet(0b1_1111_1111),
        }
    }
}

impl PeriodHours {
    /// Build the assignment, failing unless the three sets partition `0..24`.
    pub fn try_new(
        peak: HourSet,
        standard: HourSet,
        off_peak: HourSet,
    ) -> Result<Self, ConfigError> {
        let sets = [
            (EnergyPeriod::Peak, peak),
            (EnergyPeriod::Standard, standard),
            (EnergyPeriod::OffPeak, off_peak),
        ];
        for (i, (first, lhs)) in sets.iter().enumerate() {
            for (second, rhs) in &sets[i + 1..] {
                if let Some(hour) = lhs.intersection(*rhs).iter().next() {
                    return Err(ConfigError::OverlappingHour {
                        hour,
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        let covered = peak.union(standard).union(off_peak);
        if let Some(hour) = (0..24).find(|hour| !covered.contains(*hour)) {
            return Err(ConfigError::UnassignedHour(hour));
        }
        Ok(Self { peak, standard, off_peak })
    }

    pub const fn peak(&self) -> HourSet {
        self.peak
    }

    pub const fn standard(&self) -> HourSet {
        self.standard
    }

    pub const fn off_peak(&self) -> HourSet {
        self.off_peak
    }

    #[must_use]
    pub fn energy_period(&self, hour: u32, is_weekday: bool) -> EnergyPeriod {
        if !is_weekday {
            EnergyPeriod::OffPeak
        } else if self.peak.contains(hour) {
            EnergyPeriod::Peak
        } else if self.standard.contains(hour) {
            EnergyPeriod::Standard
        } else if self.off_peak.contains(hour) {
            EnergyPeriod::OffPeak
        } else {
            // Unreachable with a validated partition.
            warn!(hour, "hour is not in any period definition, defaulting to P2");
            EnergyPeriod::Standard
        }
    }

    #[must_use]
    pub const fn power_period(&self, hour: u32, is_weekday: bool) -> PowerPeriod {
        if is_weekday && self.peak.contains(hour) { PowerPeriod::Peak } else { PowerPeriod::Valley }
    }

    /// Number of hours of the date in the peak and valley power periods.
    #[must_use]
    pub fn power_hours(&self, date: NaiveDate) -> (u32, u32) {
        let weekday = is_weekday(date);
        let peak = (0..24)
            .filter(|hour| self.power_period(*hour, weekday) == PowerPeriod::Peak)
            .count();
        #[expect(clippy::cast_possible_truncation)]
        let peak = peak as u32;
        (peak, 24 - peak)
    }
}

/// Fixed per-kWh rate of each energy period.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PeriodRates {
    pub peak: KilowattHourRate,
    pub standard: KilowattHourRate,
    pub off_peak: KilowattHourRate,
}

impl PeriodRates {
    pub const fn get(&self, period: EnergyPeriod) -> KilowattHourRate {
        match period {
            EnergyPeriod::Peak => self.peak,
            EnergyPeriod::Standard => self.standard,
            EnergyPeriod::OffPeak => self.off_peak,
        }
    }
}
