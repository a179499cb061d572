use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of money as an integer number of minor units (cents).
///
/// Amounts are stored and compared as integers; conversion to and from
/// floating point major units only happens at the display and wire
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn from_minor(cents: i64) -> Self {
        Money(cents)
    }

    /// Convert major units to cents, rounding half away from zero so that
    /// negative amounts convert symmetrically.
    pub fn from_major(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.to_major())
    }
}
