//! Property tests for dairy-ledger-core

use bigdecimal::{num_bigint::BigInt, BigDecimal};
use chrono::NaiveDate;
use dairy_ledger_core::{
    net_payable, patterns, utils::MemoryStore, BalanceAmount, DairyBooks, DeductionRequest,
    Ledger, LedgerError, LedgerType, Outstanding, Period, Posting, Side, Voucher, VoucherType,
};
use proptest::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Strategy for non-negative amounts with two decimal places
fn amount_strategy() -> impl Strategy<Value = BigDecimal> {
    (0i64..1_000_000i64).prop_map(|n| BigDecimal::new(BigInt::from(n), 2))
}

/// Strategy for strictly positive amounts with two decimal places
fn positive_amount_strategy() -> impl Strategy<Value = BigDecimal> {
    (1i64..1_000_000i64).prop_map(|n| BigDecimal::new(BigInt::from(n), 2))
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Debit), Just(Side::Credit)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A voucher whose debit lines mirror one credit line always
    /// validates, and pushing one side past the rounding tolerance
    /// always fails.
    #[test]
    fn prop_voucher_balance_validation(
        amounts in prop::collection::vec(positive_amount_strategy(), 1..8),
    ) {
        let cash = Ledger::new("Cash".to_string(), LedgerType::Asset, "Cash".to_string());
        let sales = Ledger::new(
            "Milk Sales".to_string(),
            LedgerType::Income,
            "Trading".to_string(),
        );

        let mut voucher = Voucher::new(
            VoucherType::Journal,
            date(2024, 4, 1),
            "J0001".to_string(),
            "Generated entry".to_string(),
        );
        let mut total = BigDecimal::from(0);
        for amount in &amounts {
            voucher.add_posting(Posting::debit(cash.id, amount.clone(), None));
            total += amount;
        }
        voucher.add_posting(Posting::credit(sales.id, total, None));
        prop_assert!(voucher.validate().is_ok());

        // 0.02 exceeds the 0.01 rounding tolerance
        voucher.add_posting(Posting::credit(
            sales.id,
            BigDecimal::new(BigInt::from(2), 2),
            None,
        ));
        prop_assert!(
            matches!(
                voucher.validate(),
                Err(LedgerError::UnbalancedVoucher { .. })
            ),
            "expected Err(LedgerError::UnbalancedVoucher)"
        );
    }

    /// A signed amount survives the trip through a sided balance, on
    /// either reading convention.
    #[test]
    fn prop_signed_balance_round_trip(
        n in -1_000_000i64..1_000_000i64,
        natural in side_strategy(),
    ) {
        let signed = BigDecimal::new(BigInt::from(n), 2);
        let balance = BalanceAmount::from_signed(&signed, natural);

        prop_assert!(balance.amount >= BigDecimal::from(0));
        prop_assert_eq!(balance.signed(), signed.clone());
        prop_assert_eq!(balance.signed_on(Side::Debit), signed.clone());
        prop_assert_eq!(balance.signed_on(Side::Credit), -signed);
        if n == 0 {
            prop_assert_eq!(balance.side, natural);
        }
    }

    /// The net payable is exactly the milk value less every recovery.
    #[test]
    fn prop_net_payable_formula(
        milk in amount_strategy(),
        welfare in amount_strategy(),
        loan in amount_strategy(),
        cf in amount_strategy(),
        cash in amount_strategy(),
        other in amount_strategy(),
        previous in amount_strategy(),
    ) {
        let deductions = DeductionRequest::new(loan.clone(), cf.clone(), cash.clone());
        let net = net_payable(&milk, &welfare, &deductions, &other, &previous);
        let expected = &milk - &welfare - &loan - &cf - &cash - &other - &previous;
        prop_assert_eq!(net, expected);
    }

    /// Recoveries clamped to the outstanding never drive any category
    /// negative, and the total drops by exactly the recovered amount.
    #[test]
    fn prop_waterfall_never_over_recovers(
        loan_out in amount_strategy(),
        cf_out in amount_strategy(),
        cash_out in amount_strategy(),
        loan_cut in amount_strategy(),
        cf_cut in amount_strategy(),
        cash_cut in amount_strategy(),
    ) {
        let outstanding = Outstanding {
            farmer_id: "F001".to_string(),
            loan_advance: loan_out.clone(),
            cf_advance: cf_out.clone(),
            cash_advance: cash_out.clone(),
        };
        let cut = DeductionRequest::new(
            loan_cut.min(loan_out),
            cf_cut.min(cf_out),
            cash_cut.min(cash_out),
        );

        let after = outstanding.minus(&cut);
        prop_assert!(after.loan_advance >= BigDecimal::from(0));
        prop_assert!(after.cf_advance >= BigDecimal::from(0));
        prop_assert!(after.cash_advance >= BigDecimal::from(0));
        prop_assert_eq!(after.total(), outstanding.total() - cut.total());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// The closing balance of a window equals the opening balance of
    /// the day after, whatever was posted.
    #[test]
    fn prop_closing_equals_next_opening(
        receipts in prop::collection::vec((positive_amount_strategy(), 1u32..29), 1..12),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let storage = MemoryStore::new();
            let books = DairyBooks::new(storage);
            let cash = books
                .register_ledger("Cash".to_string(), LedgerType::Asset, "Cash".to_string())
                .await
                .unwrap();
            let sales = books
                .register_ledger(
                    "Milk Sales".to_string(),
                    LedgerType::Income,
                    "Trading".to_string(),
                )
                .await
                .unwrap();

            for (i, (amount, day)) in receipts.iter().enumerate() {
                let voucher = patterns::receipt(
                    format!("R{i:04}"),
                    date(2024, 4, *day),
                    "Milk sales receipts".to_string(),
                    cash.id,
                    sales.id,
                    amount.clone(),
                )
                .unwrap();
                books.post_voucher(voucher).await.unwrap();
            }

            let first_half = Period::new(date(2024, 4, 1), date(2024, 4, 14)).unwrap();
            let closing = books.closing_balance(&cash, &first_half).await.unwrap();
            let opening = books.opening_balance(&cash, date(2024, 4, 15)).await.unwrap();
            assert_eq!(closing, opening);
        });
    }

    /// Day book totals stay balanced for any mix of balanced vouchers.
    #[test]
    fn prop_day_book_always_balances(
        entries in prop::collection::vec((positive_amount_strategy(), 1u32..29), 1..15),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let storage = MemoryStore::new();
            let books = DairyBooks::new(storage);
            let cash = books
                .register_ledger("Cash".to_string(), LedgerType::Asset, "Cash".to_string())
                .await
                .unwrap();
            let feed = books
                .register_ledger(
                    "Feed Purchase".to_string(),
                    LedgerType::Expense,
                    "Trading".to_string(),
                )
                .await
                .unwrap();
            let sales = books
                .register_ledger(
                    "Milk Sales".to_string(),
                    LedgerType::Income,
                    "Trading".to_string(),
                )
                .await
                .unwrap();

            for (i, (amount, day)) in entries.iter().enumerate() {
                let voucher = if i % 2 == 0 {
                    patterns::receipt(
                        format!("R{i:04}"),
                        date(2024, 4, *day),
                        "Milk sales receipts".to_string(),
                        cash.id,
                        sales.id,
                        amount.clone(),
                    )
                } else {
                    patterns::payment(
                        format!("P{i:04}"),
                        date(2024, 4, *day),
                        "Feed purchase".to_string(),
                        feed.id,
                        cash.id,
                        amount.clone(),
                    )
                }
                .unwrap();
                books.post_voucher(voucher).await.unwrap();
            }

            let april = Period::new(date(2024, 4, 1), date(2024, 4, 30)).unwrap();
            let day_book = books.day_book(&april).await.unwrap();
            assert_eq!(day_book.total_debit, day_book.total_credit);
            for day in &day_book.days {
                assert_eq!(day.day_debit, day.day_credit);
            }
        });
    }
}
