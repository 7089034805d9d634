//! Value types shared by the dispatch engine and server.
//!
//! Currency amounts and fractional rates are exact decimals. Nothing in here rounds except `Display`.
mod money;
mod rate;
mod sqlite_codec;

pub mod op;

pub use money::{Money, MoneyConversionError, CURRENCY_DECIMAL_PLACES};
pub use rate::{Rate, RateConversionError};
