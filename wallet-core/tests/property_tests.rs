//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Funding and withdrawal move exactly the requested amount
//! - Balances never go negative; failed operations are no-ops
//! - Conversion conserves value at the configured rate
//! - The transaction log always reconciles against stored balances

use proptest::prelude::*;
use rust_decimal::Decimal;
use wallet_core::{Config, Currency, Error, Ledger, Money, UserId};

/// Strategy for generating valid amounts (positive, 2 dp)
fn amount_strategy() -> impl Strategy<Value = Money> {
    (1u64..1_000_000_00u64).prop_map(|cents| Money::new(Decimal::new(cents as i64, 2)).unwrap())
}

/// Strategy for generating currencies
fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::USD), Just(Currency::MXN)]
}

/// A randomly chosen ledger operation
#[derive(Debug, Clone)]
enum Op {
    Fund(Currency, Money),
    Withdraw(Currency, Money),
    Convert(Currency, Currency, Money),
}

/// Strategy for generating operations (conversions may be same-currency
/// or unaffordable; those must fail cleanly without corrupting state)
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (currency_strategy(), amount_strategy()).prop_map(|(c, a)| Op::Fund(c, a)),
        (currency_strategy(), amount_strategy()).prop_map(|(c, a)| Op::Withdraw(c, a)),
        (currency_strategy(), currency_strategy(), amount_strategy())
            .prop_map(|(f, t, a)| Op::Convert(f, t, a)),
    ]
}

/// Create test ledger with temp directory
async fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    (Ledger::open(config).await.unwrap(), temp_dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a sequence of funds sums exactly, with no rounding drift
    #[test]
    fn prop_funding_sums_exactly(amounts in prop::collection::vec(amount_strategy(), 1..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let user = UserId::new("alice");

            let mut expected = Decimal::ZERO;
            for amount in &amounts {
                ledger.fund(&user, Currency::USD, *amount).await.unwrap();
                expected += amount.amount();
            }

            let balances = ledger.balances(&user).unwrap();
            prop_assert_eq!(balances[&Currency::USD].amount(), expected);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: withdrawal either moves exactly the amount or is a no-op
    #[test]
    fn prop_withdraw_exact_or_noop(
        funded in amount_strategy(),
        requested in amount_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let user = UserId::new("alice");

            ledger.fund(&user, Currency::MXN, funded).await.unwrap();
            let result = ledger.withdraw(&user, Currency::MXN, requested).await;

            let balance = ledger.balances(&user).unwrap()[&Currency::MXN];
            if requested <= funded {
                let wallet = result.unwrap();
                prop_assert_eq!(
                    wallet.balance.amount(),
                    funded.amount() - requested.amount()
                );
                prop_assert_eq!(balance, wallet.balance);
            } else {
                prop_assert!(
                    matches!(result.unwrap_err(), Error::InsufficientFunds { .. }),
                    "expected InsufficientFunds error"
                );
                prop_assert_eq!(balance, funded);
                // No Withdraw record appended
                prop_assert_eq!(ledger.transactions(&user).unwrap().len(), 1);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: conversion debits exactly the amount and credits exactly
    /// amount * rate (rounded to ledger scale)
    #[test]
    fn prop_conversion_conserves_value(
        funded in amount_strategy(),
        converted in amount_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let user = UserId::new("alice");
            let rate = Decimal::new(1870, 2); // configured USD -> MXN

            ledger.fund(&user, Currency::USD, funded).await.unwrap();
            let result = ledger
                .convert(&user, Currency::USD, Currency::MXN, converted)
                .await;

            if converted <= funded {
                let conversion = result.unwrap();
                prop_assert_eq!(
                    conversion.from.balance.amount(),
                    funded.amount() - converted.amount()
                );
                prop_assert_eq!(
                    conversion.to.balance.amount(),
                    (converted.amount() * rate).round_dp(4)
                );
            } else {
                prop_assert!(
                    matches!(result.unwrap_err(), Error::InsufficientFunds { .. }),
                    "expected InsufficientFunds error"
                );
                let balances = ledger.balances(&user).unwrap();
                prop_assert_eq!(balances[&Currency::USD], funded);
                prop_assert!(!balances.contains_key(&Currency::MXN));
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: after any sequence of operations, the transaction log
    /// reconciles against stored balances, and reconciliation is idempotent
    #[test]
    fn prop_log_always_reconciles(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let user = UserId::new("alice");

            let mut committed = 0usize;
            for op in &ops {
                let ok = match op {
                    Op::Fund(c, a) => ledger.fund(&user, *c, *a).await.is_ok(),
                    Op::Withdraw(c, a) => ledger.withdraw(&user, *c, *a).await.is_ok(),
                    Op::Convert(f, t, a) => ledger.convert(&user, *f, *t, *a).await.is_ok(),
                };
                if ok {
                    committed += 1;
                }
            }

            // One log record per committed operation, nothing for rejects
            prop_assert_eq!(ledger.transactions(&user).unwrap().len(), committed);

            let first = ledger.reconcile(&user).unwrap();
            prop_assert!(first.ok);

            let second = ledger.reconcile(&user).unwrap();
            prop_assert_eq!(first, second);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: operations on one user never disturb another user's
    /// reconciliation
    #[test]
    fn prop_users_reconcile_independently(
        ops in prop::collection::vec(op_strategy(), 1..15),
        amount in amount_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let alice = UserId::new("alice");
            let bob = UserId::new("bob");

            ledger.fund(&bob, Currency::USD, amount).await.unwrap();

            for op in &ops {
                let _ = match op {
                    Op::Fund(c, a) => ledger.fund(&alice, *c, *a).await.map(|_| ()),
                    Op::Withdraw(c, a) => ledger.withdraw(&alice, *c, *a).await.map(|_| ()),
                    Op::Convert(f, t, a) => {
                        ledger.convert(&alice, *f, *t, *a).await.map(|_| ())
                    }
                };
            }

            let report = ledger.reconcile(&bob).unwrap();
            prop_assert!(report.ok);
            prop_assert_eq!(
                ledger.balances(&bob).unwrap()[&Currency::USD],
                amount
            );

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_fund_convert_reconcile_round_trip() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("alice");

        ledger
            .fund(&user, Currency::USD, Money::parse("1000").unwrap())
            .await
            .unwrap();
        let conversion = ledger
            .convert(
                &user,
                Currency::USD,
                Currency::MXN,
                Money::parse("1000").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(conversion.from.balance, Money::ZERO);
        assert_eq!(
            conversion.to.balance,
            Money::parse("18700.00").unwrap()
        );

        let report = ledger.reconcile(&user).unwrap();
        assert!(report.ok);
        assert_eq!(report.expected[&Currency::USD], Decimal::ZERO.round_dp(2));
        assert_eq!(report.expected[&Currency::MXN], Decimal::new(1_870_000, 2));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mixed_history_round_trips_both_directions() {
        let (ledger, _temp) = create_test_ledger().await;
        let user = UserId::new("alice");

        ledger
            .fund(&user, Currency::MXN, Money::parse("10000").unwrap())
            .await
            .unwrap();
        // 2000 MXN -> 106 USD at 0.053
        ledger
            .convert(
                &user,
                Currency::MXN,
                Currency::USD,
                Money::parse("2000").unwrap(),
            )
            .await
            .unwrap();
        ledger
            .withdraw(&user, Currency::USD, Money::parse("6").unwrap())
            .await
            .unwrap();

        let balances = ledger.balances(&user).unwrap();
        assert_eq!(balances[&Currency::MXN], Money::parse("8000").unwrap());
        assert_eq!(balances[&Currency::USD], Money::parse("100").unwrap());

        assert!(ledger.reconcile(&user).unwrap().ok);

        ledger.shutdown().await.unwrap();
    }
}
