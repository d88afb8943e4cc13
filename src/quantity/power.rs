use std::ops::Mul;

use crate::quantity::{cost::Cost, rate::KilowattDayRate};

quantity!(Kilowatts, suffix: "kW", precision: 2);

impl Mul<KilowattDayRate> for Kilowatts {
    /// Contracted power charge for one whole day.
    type Output = Cost;

    fn mul(self, rhs: KilowattDayRate) -> Self::Output {
        Cost(self.0 * rhs.0)
    }
}
