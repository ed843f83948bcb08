//! Multi-currency wallet ledger
//!
//! Per-user currency balances kept exactly consistent with an
//! append-only transaction log.
//!
//! # Architecture
//!
//! - **Exact money**: all amounts are fixed-scale decimals, never floats
//! - **Single writer**: one logical writer task serializes every mutation
//! - **Atomic commit**: balance updates and their log record land in one
//!   write batch or not at all
//! - **Replayable**: stored balances can always be re-derived from the
//!   transaction log and reconciled against it
//!
//! # Invariants
//!
//! - Money is never created or destroyed except through Fund/Withdraw
//! - Conversion debits and credits atomically; no partial state
//! - Balances are never negative
//! - Transactions are never modified or deleted

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod rates;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{Config, RateEntry};
pub use error::{Error, Result};
pub use ledger::{Ledger, ReconcileReport};
pub use rates::RateTable;
pub use storage::Storage;
pub use types::{Conversion, Currency, Money, Transaction, TransactionKind, UserId, Wallet};
