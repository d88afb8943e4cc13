quantity!(Cost, suffix: "€", precision: 2);

impl Cost {
    pub const ONE_CENT: Self = Self(0.01);

    #[expect(clippy::cast_precision_loss)]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents as f64 / 100.0)
    }

    /// Round to euro cents, the precision of every presented amount.
    pub fn round_to_cents(self) -> Self {
        self.round_to(2)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_from_cents() {
        assert_abs_diff_eq!(Cost::from_cents(1234).0, 12.34);
        assert_abs_diff_eq!(Cost::from_cents(-5).0, -0.05);
    }

    #[test]
    fn test_round_to_cents() {
        assert_abs_diff_eq!(Cost::from(127.1831).round_to_cents().0, 127.18);
        assert_abs_diff_eq!(Cost::from(0.005_1).round_to_cents().0, 0.01);
    }

    #[test]
    fn test_display() {
        assert_eq!(Cost::from(3.456).to_string(), "3.46 €");
    }
}
