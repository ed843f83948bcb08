//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money, never floats)
//! - Invalid states being unrepresentable (a `Money` is never negative,
//!   a Convert transaction always carries both currencies)

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier (opaque, owned by external user management)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code from the configured allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Mexican Peso
    MXN,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::MXN => "MXN",
        }
    }

    /// Parse from string, rejecting anything outside the allow-list
    ///
    /// This is the single allow-list check: any currency reaching the
    /// engine as a typed `Currency` has already passed it.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "USD" => Ok(Currency::USD),
            "MXN" => Ok(Currency::MXN),
            other => Err(crate::Error::InvalidCurrency(other.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Maximum fractional digits carried by a `Money` value
const MONEY_SCALE: u32 = 4;

/// Upper bound for any single amount or balance: 999,999,999.99
fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999, 2)
}

/// Exact non-negative monetary amount
///
/// Wraps `rust_decimal::Decimal` with the ledger's constraints baked in:
/// never negative, at most 4 fractional digits, bounded by
/// 999,999,999.99. Arithmetic fails instead of silently wrapping,
/// truncating, or going negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Construct from an exact decimal, enforcing the ledger constraints
    pub fn new(amount: Decimal) -> crate::Result<Self> {
        let amount = amount.normalize();

        if amount.is_sign_negative() {
            return Err(crate::Error::InvalidAmount {
                reason: "amount cannot be negative".to_string(),
            });
        }
        if amount > max_amount() {
            return Err(crate::Error::InvalidAmount {
                reason: "amount exceeds maximum of 999999999.99".to_string(),
            });
        }
        if amount.scale() > MONEY_SCALE {
            return Err(crate::Error::InvalidAmount {
                reason: format!("amount has more than {} decimal places", MONEY_SCALE),
            });
        }

        Ok(Self(amount))
    }

    /// Parse from a decimal string
    pub fn parse(s: &str) -> crate::Result<Self> {
        let amount: Decimal = s.parse().map_err(|_| crate::Error::InvalidAmount {
            reason: format!("not a decimal number: {:?}", s),
        })?;
        Self::new(amount)
    }

    /// The underlying exact decimal
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// True if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add, failing if the result would exceed the upper bound
    pub fn checked_add(self, other: Money) -> crate::Result<Money> {
        let sum = self
            .0
            .checked_add(other.0)
            .ok_or_else(|| crate::Error::InvalidAmount {
                reason: "addition overflow".to_string(),
            })?;
        Self::new(sum)
    }

    /// Subtract, failing if the result would be negative
    pub fn checked_sub(self, other: Money) -> crate::Result<Money> {
        let diff = self
            .0
            .checked_sub(other.0)
            .ok_or_else(|| crate::Error::InvalidAmount {
                reason: "subtraction overflow".to_string(),
            })?;
        Self::new(diff)
    }

    /// Multiply by a conversion rate
    ///
    /// The product is rounded to the ledger scale (4 dp) with banker's
    /// rounding before re-validation, matching the fixed-scale balance
    /// column of the persisted layout.
    pub fn convert(self, rate: Decimal) -> crate::Result<Money> {
        let product = self
            .0
            .checked_mul(rate)
            .ok_or_else(|| crate::Error::InvalidAmount {
                reason: "conversion overflow".to_string(),
            })?;
        let rounded =
            product.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
        Self::new(rounded)
    }

    /// Value at the 2-decimal output boundary (display and reconciliation)
    pub fn rounded(&self) -> Decimal {
        self.0.round_dp(2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single currency balance owned by one user
///
/// Wallets are created lazily with a zero balance and are not persisted
/// until included in an atomic commit. A missing wallet is always "zero
/// balance, not yet materialized", never an absent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Owning user
    pub user: UserId,
    /// Wallet currency
    pub currency: Currency,
    /// Current balance (never negative)
    pub balance: Money,
}

impl Wallet {
    /// New empty wallet (in memory only until committed)
    pub fn new(user: UserId, currency: Currency) -> Self {
        Self {
            user,
            currency,
            balance: Money::ZERO,
        }
    }
}

/// Type-specific transaction payload
///
/// The payload shape encodes the field requirements: Fund/Withdraw carry
/// one currency, Convert carries the pair plus the credited amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Funds added from outside the ledger
    Fund {
        /// Funded currency
        currency: Currency,
    },
    /// Funds removed from the ledger
    Withdraw {
        /// Withdrawn currency
        currency: Currency,
    },
    /// Value moved between two currency balances
    Convert {
        /// Debited currency
        from: Currency,
        /// Credited currency
        to: Currency,
        /// Amount credited to the target wallet
        result_amount: Money,
    },
}

impl TransactionKind {
    /// Short name used for logs and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            TransactionKind::Fund { .. } => "fund",
            TransactionKind::Withdraw { .. } => "withdraw",
            TransactionKind::Convert { .. } => "convert",
        }
    }
}

/// Immutable append-only transaction record
///
/// Created once at the moment a ledger operation commits, always inside
/// the same atomic batch as its wallet mutation(s). Never updated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub id: Uuid,
    /// Owning user
    pub user: UserId,
    /// Type-specific payload
    pub kind: TransactionKind,
    /// Amount debited from the source of the operation (always positive)
    pub amount: Money,
    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Record of a funding operation
    pub fn fund(user: UserId, currency: Currency, amount: Money) -> Self {
        Self {
            id: Uuid::now_v7(),
            user,
            kind: TransactionKind::Fund { currency },
            amount,
            created_at: Utc::now(),
        }
    }

    /// Record of a withdrawal operation
    pub fn withdraw(user: UserId, currency: Currency, amount: Money) -> Self {
        Self {
            id: Uuid::now_v7(),
            user,
            kind: TransactionKind::Withdraw { currency },
            amount,
            created_at: Utc::now(),
        }
    }

    /// Record of a conversion operation
    pub fn convert(
        user: UserId,
        from: Currency,
        to: Currency,
        amount: Money,
        result_amount: Money,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user,
            kind: TransactionKind::Convert {
                from,
                to,
                result_amount,
            },
            amount,
            created_at: Utc::now(),
        }
    }
}

/// Result of a conversion: both updated wallets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Debited source wallet
    pub from: Wallet,
    /// Credited target wallet
    pub to: Wallet,
}
