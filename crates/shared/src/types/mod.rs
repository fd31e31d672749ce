//! Shared value types.

pub mod money;

pub use money::{MoneyError, format_amount, parse_amount, round2};
