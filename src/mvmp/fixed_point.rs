//! # Two-Register Decimals
//!
//! The controller reports several quantities as an integer register and a
//! separate "fraction" register. The fraction is not a fixed-width decimal:
//! its digits are written after the decimal point verbatim, so a fraction
//! register of `5` means `.5` and `50` means `.50`.

use std::fmt;

use serde::{Serialize, Serializer};

/// A value composed from an integer register and a fraction register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedDecimal {
    pub integer: u32,
    pub fraction: u32,
}

impl FixedDecimal {
    /// Join the two registers
    ///
    /// # Examples
    ///
    /// ```
    /// use mvmp_bridge::mvmp::fixed_point::FixedDecimal;
    ///
    /// let current = FixedDecimal::compose(10, 5);
    /// assert_eq!(current.to_string(), "10.5");
    /// assert_eq!(current.value(), 10.5);
    /// ```
    pub fn compose(integer: u32, fraction: u32) -> Self {
        Self { integer, fraction }
    }

    /// Numeric value, parsed from the concatenated digit string
    pub fn value(&self) -> f64 {
        // "<digits>.<digits>" always parses
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.integer, self.fraction)
    }
}

impl From<FixedDecimal> for f64 {
    fn from(decimal: FixedDecimal) -> Self {
        decimal.value()
    }
}

impl Serialize for FixedDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}
