//! Conversion rate table
//!
//! Pure lookup of an ordered currency pair to a multiplier. The table is
//! static configuration injected at engine construction; live-rate
//! updates are an external concern.

use crate::config::RateEntry;
use crate::types::Currency;
use crate::{Error, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Ordered-pair conversion multipliers
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl RateTable {
    /// Build from configuration entries
    ///
    /// Rejects non-positive rates and duplicate pairs. Same-currency
    /// pairs are never looked up here, so configuring one is an error.
    pub fn from_entries(entries: &[RateEntry]) -> Result<Self> {
        let mut rates = HashMap::with_capacity(entries.len());

        for entry in entries {
            if entry.rate <= Decimal::ZERO {
                return Err(Error::Config(format!(
                    "rate for {} to {} must be positive, got {}",
                    entry.from, entry.to, entry.rate
                )));
            }
            if entry.from == entry.to {
                return Err(Error::Config(format!(
                    "same-currency rate configured for {}",
                    entry.from
                )));
            }
            if rates.insert((entry.from, entry.to), entry.rate).is_some() {
                return Err(Error::Config(format!(
                    "duplicate rate for {} to {}",
                    entry.from, entry.to
                )));
            }
        }

        Ok(Self { rates })
    }

    /// Look up the multiplier for an ordered pair
    ///
    /// Callers must reject same-currency conversion before calling.
    pub fn rate(&self, from: Currency, to: Currency) -> Result<Decimal> {
        self.rates
            .get(&(from, to))
            .copied()
            .ok_or(Error::RateNotFound { from, to })
    }
}
