//! Error types for the wallet ledger

use crate::types::{Currency, Money};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Validation errors (`InvalidAmount`, `InvalidCurrency`,
/// `SameCurrencyConversion`) are detected before any mutation and are
/// always recoverable by fixing the input. `InsufficientFunds` and
/// `RateNotFound` are business-rule failures with structured detail.
/// `CommitFailure` is internal and never leaves partial state behind.
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is not parseable, not positive, over-bound, or too precise
    #[error("Invalid amount: {reason}")]
    InvalidAmount {
        /// What was wrong with the amount
        reason: String,
    },

    /// Currency code outside the configured allow-list
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Conversion source and target are the same currency
    #[error("Cannot convert {0} to itself")]
    SameCurrencyConversion(Currency),

    /// Balance too low for the requested operation
    #[error("Insufficient funds in {currency} wallet: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Wallet currency
        currency: Currency,
        /// Amount the caller asked for
        requested: Money,
        /// Balance actually held
        available: Money,
    },

    /// No conversion rate configured for the ordered pair
    #[error("FX rate not found for {from} to {to}")]
    RateNotFound {
        /// Source currency
        from: Currency,
        /// Target currency
        to: Currency,
    },

    /// Atomicity violation detected at the store layer (internal)
    #[error("Commit failure: {0}")]
    CommitFailure(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// True if retrying with corrected input can succeed
    ///
    /// `CommitFailure` deliberately reports false: it is unexpected and
    /// carries no retry guarantee.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount { .. }
                | Error::InvalidCurrency(_)
                | Error::SameCurrencyConversion(_)
                | Error::InsufficientFunds { .. }
                | Error::RateNotFound { .. }
        )
    }
}
