//! Main ledger orchestration layer
//!
//! The engine behind the five wallet operations: Fund, Withdraw,
//! Convert, Balances, Reconcile. Every operation is two-phase: a pure
//! validation step that touches nothing, then an atomic commit through
//! the single-writer actor. A failed validation is a no-op; a failed
//! commit writes nothing; partial application is never observable.
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{Config, Currency, Ledger, Money, UserId};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     let user = UserId::new("alice");
//!     ledger.fund(&user, Currency::USD, Money::parse("1000")?).await?;
//!     ledger.convert(&user, Currency::USD, Currency::MXN, Money::parse("1000")?).await?;
//!
//!     let report = ledger.reconcile(&user)?;
//!     assert!(report.ok);
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    rates::RateTable,
    types::{Conversion, Currency, Money, Transaction, TransactionKind, UserId, Wallet},
    Config, Error, Result, Storage,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let rates = Arc::new(RateTable::from_entries(&config.rates)?);
        let metrics = Metrics::new().map_err(|e| Error::Other(format!("metrics: {}", e)))?;

        let handle = spawn_ledger_actor(storage.clone(), rates, metrics.clone());

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    /// Add funds to a user's wallet, creating it on first use
    ///
    /// Returns the updated wallet.
    pub async fn fund(&self, user: &UserId, currency: Currency, amount: Money) -> Result<Wallet> {
        validate_positive(amount)?;
        self.handle.fund(user.clone(), currency, amount).await
    }

    /// Remove funds from a user's wallet
    ///
    /// A wallet that was never funded counts as a zero balance, so any
    /// withdrawal from it fails with `InsufficientFunds`.
    pub async fn withdraw(
        &self,
        user: &UserId,
        currency: Currency,
        amount: Money,
    ) -> Result<Wallet> {
        validate_positive(amount)?;
        self.handle.withdraw(user.clone(), currency, amount).await
    }

    /// Convert between two of a user's currency wallets
    ///
    /// The debit, the credit, and the Convert transaction land in one
    /// atomic commit; no state between them is ever observable.
    pub async fn convert(
        &self,
        user: &UserId,
        from: Currency,
        to: Currency,
        amount: Money,
    ) -> Result<Conversion> {
        if from == to {
            return Err(Error::SameCurrencyConversion(from));
        }
        validate_positive(amount)?;
        self.handle.convert(user.clone(), from, to, amount).await
    }

    /// Snapshot of a user's balances per currency (pure read)
    pub fn balances(&self, user: &UserId) -> Result<BTreeMap<Currency, Money>> {
        Ok(self
            .storage
            .wallets_for(user)?
            .into_iter()
            .map(|w| (w.currency, w.balance))
            .collect())
    }

    /// A user's transaction history, newest first (pure read)
    pub fn transactions(&self, user: &UserId) -> Result<Vec<Transaction>> {
        self.storage.transactions_for(user)
    }

    /// Replay the transaction log and compare against stored balances
    ///
    /// For each currency, expected = Σ fund − Σ withdraw − Σ convert-out
    /// + Σ convert-in, rounded to 2 dp; compared against the stored
    /// balance rounded the same way, over the union of currencies seen
    /// on either side. Both sides come from one storage snapshot, so a
    /// commit landing mid-call cannot skew the comparison. Detection
    /// only: mismatches are reported, never repaired. Idempotent for an
    /// unchanged ledger.
    pub fn reconcile(&self, user: &UserId) -> Result<ReconcileReport> {
        let (wallets, transactions) = self.storage.snapshot_for(user)?;

        let mut derived: BTreeMap<Currency, Decimal> = BTreeMap::new();
        for tx in &transactions {
            match &tx.kind {
                TransactionKind::Fund { currency } => {
                    *derived.entry(*currency).or_default() += tx.amount.amount();
                }
                TransactionKind::Withdraw { currency } => {
                    *derived.entry(*currency).or_default() -= tx.amount.amount();
                }
                TransactionKind::Convert {
                    from,
                    to,
                    result_amount,
                } => {
                    *derived.entry(*from).or_default() -= tx.amount.amount();
                    *derived.entry(*to).or_default() += result_amount.amount();
                }
            }
        }

        let mut stored: BTreeMap<Currency, Decimal> = BTreeMap::new();
        for wallet in wallets {
            stored.insert(wallet.currency, wallet.balance.rounded());
        }

        // Union of currencies on either side, both rounded to 2 dp
        let mut expected = BTreeMap::new();
        let mut current = BTreeMap::new();
        for currency in derived.keys().chain(stored.keys()).copied() {
            expected.insert(
                currency,
                derived.get(&currency).copied().unwrap_or_default().round_dp(2),
            );
            current.insert(
                currency,
                stored.get(&currency).copied().unwrap_or_default(),
            );
        }

        let mismatches = expected
            .iter()
            .filter(|(c, e)| current.get(c) != Some(e))
            .count();
        self.metrics.set_reconcile_mismatches(mismatches as i64);

        if mismatches > 0 {
            tracing::warn!(
                user = %user,
                mismatches,
                "Reconciliation mismatch detected"
            );
        }

        Ok(ReconcileReport {
            expected,
            current,
            ok: mismatches == 0,
        })
    }

    /// Metrics collector (for scraping endpoints)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

/// Outcome of replaying the transaction log against stored balances
///
/// Values are 2-dp-rounded decimals; `expected` and `current` always
/// carry the same key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Balances derived from the transaction log
    pub expected: BTreeMap<Currency, Decimal>,
    /// Balances currently stored
    pub current: BTreeMap<Currency, Decimal>,
    /// True only if every currency matches exactly at 2 dp
    pub ok: bool,
}

/// Operation inputs must be strictly positive
fn validate_positive(amount: Money) -> Result<()> {
    if amount.is_zero() {
        return Err(Error::InvalidAmount {
            reason: "amount must be positive".to_string(),
        });
    }
    Ok(())
}

// Commit-phase operations, run only on the single-writer actor so the
// load-check-commit sequence can never interleave with another mutation.

/// Load-or-create, credit, commit wallet + Fund record
pub(crate) fn apply_fund(
    storage: &Storage,
    user: &UserId,
    currency: Currency,
    amount: Money,
) -> Result<Wallet> {
    let mut wallet = storage.get_or_create(user, currency)?;
    wallet.balance = wallet.balance.checked_add(amount)?;

    let tx = Transaction::fund(user.clone(), currency, amount);
    storage.commit(std::slice::from_ref(&wallet), Some(&tx))?;

    Ok(wallet)
}

/// Check funds, debit, commit wallet + Withdraw record
pub(crate) fn apply_withdraw(
    storage: &Storage,
    user: &UserId,
    currency: Currency,
    amount: Money,
) -> Result<Wallet> {
    let mut wallet = storage.get_or_create(user, currency)?;
    if wallet.balance < amount {
        return Err(Error::InsufficientFunds {
            currency,
            requested: amount,
            available: wallet.balance,
        });
    }
    wallet.balance = wallet.balance.checked_sub(amount)?;

    let tx = Transaction::withdraw(user.clone(), currency, amount);
    storage.commit(std::slice::from_ref(&wallet), Some(&tx))?;

    Ok(wallet)
}

/// Debit source, credit target at the configured rate, commit both
/// wallets + one Convert record in a single batch
pub(crate) fn apply_convert(
    storage: &Storage,
    rates: &RateTable,
    user: &UserId,
    from: Currency,
    to: Currency,
    amount: Money,
) -> Result<Conversion> {
    let mut source = storage.get_or_create(user, from)?;

    // Cheap check first: no rate lookup for funds the user does not have
    if source.balance < amount {
        return Err(Error::InsufficientFunds {
            currency: from,
            requested: amount,
            available: source.balance,
        });
    }

    let rate = rates.rate(from, to)?;
    let result = amount.convert(rate)?;

    let mut target = storage.get_or_create(user, to)?;
    source.balance = source.balance.checked_sub(amount)?;
    target.balance = target.balance.checked_add(result)?;

    let tx = Transaction::convert(user.clone(), from, to, amount, result);
    storage.commit(&[source.clone(), target.clone()], Some(&tx))?;

    Ok(Conversion {
        from: source,
        to: target,
    })
}
