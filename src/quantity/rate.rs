quantity!(KilowattHourRate, suffix: "€/kWh", precision: 6);

// Contracted power rate, euro per kilowatt per day.
quantity!(KilowattDayRate, suffix: "€/kW/day", precision: 6);

impl KilowattHourRate {
    /// Round to micro-euros, the precision of every published per-kWh price.
    pub fn round_to_micros(self) -> Self {
        self.round_to(6)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_round_to_micros() {
        assert_abs_diff_eq!(KilowattHourRate::from(0.20 * 0.55).round_to_micros().0, 0.11);
        assert_abs_diff_eq!(KilowattHourRate::from(0.123_456_7).round_to_micros().0, 0.123_457);
    }

    #[test]
    fn test_ordering() {
        assert!(KilowattHourRate::from(0.1) < KilowattHourRate::from(0.2));
        assert_eq!(
            KilowattHourRate::from(0.1).max(KilowattHourRate::ZERO),
            KilowattHourRate::from(0.1),
        );
    }
}
