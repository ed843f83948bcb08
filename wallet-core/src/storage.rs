//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Current balances (key: user prefix + currency code)
//! - `transactions` - Append-only transaction log (key: user prefix + tx id)
//!
//! The user prefix is the big-endian byte length of the user ID followed
//! by its raw bytes, so no user's key range can overlap another's no
//! matter what the opaque ID contains. Transaction keys embed a UUIDv7,
//! so a forward prefix scan yields a user's records in commit order. All
//! mutations go through
//! [`Storage::commit`], a single `WriteBatch` that lands entirely or not
//! at all.

use crate::{
    types::{Currency, Transaction, UserId, Wallet},
    Config, Error, Result,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Balances are small and frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    // User IDs are opaque external strings, so they cannot be spliced into
    // keys raw: a length prefix keeps `alice` and `alice|x` in disjoint
    // key ranges.
    fn user_prefix(user: &UserId) -> Vec<u8> {
        let bytes = user.as_str().as_bytes();
        let mut key = Vec::with_capacity(4 + bytes.len());
        key.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        key.extend_from_slice(bytes);
        key
    }

    fn wallet_key(user: &UserId, currency: Currency) -> Vec<u8> {
        let mut key = Self::user_prefix(user);
        key.extend_from_slice(currency.code().as_bytes());
        key
    }

    fn transaction_key(user: &UserId, id: Uuid) -> Vec<u8> {
        let mut key = Self::user_prefix(user);
        key.extend_from_slice(id.as_bytes());
        key
    }

    // Wallet operations

    /// Get a wallet if it has ever been committed
    pub fn get_wallet(&self, user: &UserId, currency: Currency) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let key = Self::wallet_key(user, currency);

        match self.db.get_cf(cf, &key)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get an existing wallet or a fresh zero-balance one
    ///
    /// The returned wallet is in memory only: it is not persisted until
    /// included in a [`Storage::commit`].
    pub fn get_or_create(&self, user: &UserId, currency: Currency) -> Result<Wallet> {
        Ok(self
            .get_wallet(user, currency)?
            .unwrap_or_else(|| Wallet::new(user.clone(), currency)))
    }

    fn scan_prefix<T>(
        iter: impl Iterator<Item = std::result::Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>>,
        prefix: &[u8],
    ) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    /// All committed wallets for a user
    pub fn wallets_for(&self, user: &UserId) -> Result<Vec<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let prefix = Self::user_prefix(user);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        Self::scan_prefix(iter, &prefix)
    }

    // Transaction log operations

    /// All transactions for a user, newest first
    pub fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let prefix = Self::user_prefix(user);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        let mut transactions: Vec<Transaction> = Self::scan_prefix(iter, &prefix)?;

        // UUIDv7 keys scan oldest-first
        transactions.reverse();
        Ok(transactions)
    }

    /// A user's wallets and transactions from one point-in-time snapshot
    ///
    /// Both column families are read through the same RocksDB snapshot,
    /// so a commit landing between the two scans cannot make the log and
    /// the balances disagree.
    pub fn snapshot_for(&self, user: &UserId) -> Result<(Vec<Wallet>, Vec<Transaction>)> {
        let prefix = Self::user_prefix(user);
        let snapshot = self.db.snapshot();

        let cf = self.cf_handle(CF_WALLETS)?;
        let iter = snapshot.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        let wallets = Self::scan_prefix(iter, &prefix)?;

        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let iter = snapshot.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        let mut transactions: Vec<Transaction> = Self::scan_prefix(iter, &prefix)?;
        transactions.reverse();

        Ok((wallets, transactions))
    }

    // Atomic commit

    /// Persist balance updates plus at most one log append, all-or-nothing
    ///
    /// This is the sole mutation path. A negative balance anywhere in the
    /// batch rejects the entire commit; nothing is written.
    pub fn commit(&self, wallets: &[Wallet], transaction: Option<&Transaction>) -> Result<()> {
        for wallet in wallets {
            // Money cannot be constructed negative; double-check anyway
            // before anything hits the write batch
            if wallet.balance.amount().is_sign_negative() {
                return Err(Error::CommitFailure(format!(
                    "negative balance for {} {}",
                    wallet.user, wallet.currency
                )));
            }
        }

        let mut batch = WriteBatch::default();

        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        for wallet in wallets {
            let key = Self::wallet_key(&wallet.user, wallet.currency);
            let value = bincode::serialize(wallet)?;
            batch.put_cf(cf_wallets, &key, &value);
        }

        if let Some(tx) = transaction {
            let cf_tx = self.cf_handle(CF_TRANSACTIONS)?;
            let key = Self::transaction_key(&tx.user, tx.id);
            let value = bincode::serialize(tx)?;
            batch.put_cf(cf_tx, &key, &value);

            tracing::debug!(
                tx_id = %tx.id,
                user = %tx.user,
                kind = tx.kind.name(),
                amount = %tx.amount,
                "Committing transaction"
            );
        }

        self.db.write(batch)?;

        Ok(())
    }
}
