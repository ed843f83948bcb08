//! Actor-based concurrency for the ledger
//!
//! All mutating operations flow through a single tokio task:
//! - One logical writer serializes every read-modify-write, so two
//!   concurrent operations can never interleave between loading a
//!   balance and committing it
//! - Each message is validated and committed fully before the next is
//!   taken; the caller's oneshot resolves only after the write batch is
//!   durable, there is no asynchronous completion
//! - Bounded mailbox provides backpressure
//!
//! Reads bypass the actor and go straight to storage.

use crate::ledger::{apply_convert, apply_fund, apply_withdraw};
use crate::metrics::Metrics;
use crate::rates::RateTable;
use crate::types::{Conversion, Currency, Money, UserId, Wallet};
use crate::{Error, Result, Storage};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Fund a wallet
    Fund {
        /// Owning user
        user: UserId,
        /// Wallet currency
        currency: Currency,
        /// Amount to add
        amount: Money,
        /// Response channel
        response: oneshot::Sender<Result<Wallet>>,
    },

    /// Withdraw from a wallet
    Withdraw {
        /// Owning user
        user: UserId,
        /// Wallet currency
        currency: Currency,
        /// Amount to remove
        amount: Money,
        /// Response channel
        response: oneshot::Sender<Result<Wallet>>,
    },

    /// Convert between two currency wallets
    Convert {
        /// Owning user
        user: UserId,
        /// Debited currency
        from: Currency,
        /// Credited currency
        to: Currency,
        /// Amount debited from the source wallet
        amount: Money,
        /// Response channel
        response: oneshot::Sender<Result<Conversion>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger mutations
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Injected rate table
    rates: Arc<RateTable>,

    /// Metrics collector
    metrics: Metrics,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        rates: Arc<RateTable>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            storage,
            rates,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                other => self.handle_message(other),
            }
        }
    }

    /// Handle a single mutation fully before returning
    fn handle_message(&self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Fund {
                user,
                currency,
                amount,
                response,
            } => {
                let result = self.timed("fund", || {
                    apply_fund(&self.storage, &user, currency, amount)
                });
                let _ = response.send(result);
            }

            LedgerMessage::Withdraw {
                user,
                currency,
                amount,
                response,
            } => {
                let result = self.timed("withdraw", || {
                    apply_withdraw(&self.storage, &user, currency, amount)
                });
                let _ = response.send(result);
            }

            LedgerMessage::Convert {
                user,
                from,
                to,
                amount,
                response,
            } => {
                let result = self.timed("convert", || {
                    apply_convert(&self.storage, &self.rates, &user, from, to, amount)
                });
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    fn timed<T>(&self, kind: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = op();
        match &result {
            Ok(_) => {
                self.metrics.record_operation(kind);
                self.metrics
                    .record_commit_duration(start.elapsed().as_secs_f64());
            }
            Err(e) => {
                self.metrics.record_failure(kind);
                tracing::debug!(kind, error = %e, "Operation rejected");
            }
        }
        result
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Fund a wallet
    pub async fn fund(&self, user: UserId, currency: Currency, amount: Money) -> Result<Wallet> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Fund {
                user,
                currency,
                amount,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Withdraw from a wallet
    pub async fn withdraw(
        &self,
        user: UserId,
        currency: Currency,
        amount: Money,
    ) -> Result<Wallet> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Withdraw {
                user,
                currency,
                amount,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Convert between two currency wallets
    pub async fn convert(
        &self,
        user: UserId,
        from: Currency,
        to: Currency,
        amount: Money,
    ) -> Result<Conversion> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Convert {
                user,
                from,
                to,
                amount,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    rates: Arc<RateTable>,
    metrics: Metrics,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rates, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
