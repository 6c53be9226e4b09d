//! Error types for identifier and amount parsing

use thiserror::Error;

/// Failure to parse an identifier from its textual form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseIdError {
    #[error("Address must not be empty")]
    EmptyAddress,

    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Failure to construct an amount.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
    #[error("Amount must be positive: {0}")]
    NotPositive(String),

    #[error("Invalid amount: {0}")]
    Parse(String),
}
