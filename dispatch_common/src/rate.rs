use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sqlite_codec::decimal_text_codec;

/// A fraction between 0 and 1 inclusive, such as a commission rate or a fee rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

decimal_text_codec!(Rate);

#[derive(Debug, Clone, Error)]
#[error("Not a valid rate: {0}")]
pub struct RateConversionError(String);

impl TryFrom<Decimal> for Rate {
    type Error = RateConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(RateConversionError(format!("{value} is outside the range [0, 1]")));
        }
        Ok(Self(value))
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl FromStr for Rate {
    type Err = RateConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim()).map_err(|e| RateConversionError(format!("{s}. {e}")))?;
        Self::try_from(value)
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}

impl Rate {
    /// Builds a rate from an integer mantissa and a scale, e.g. `Rate::new(15, 2)` is 0.15.
    pub fn new(num: i64, scale: u32) -> Result<Self, RateConversionError> {
        Self::try_from(Decimal::new(num, scale))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}
