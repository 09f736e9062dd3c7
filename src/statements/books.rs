//! Day book and receipts and payments summaries

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::ledger::balance::BalanceAccumulator;
use crate::traits::*;
use crate::types::*;

/// One posting line in the day book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBookRow {
    pub voucher_id: VoucherId,
    pub voucher_type: VoucherType,
    pub voucher_number: String,
    pub ledger_id: LedgerId,
    pub ledger_name: String,
    pub side: Side,
    pub amount: BigDecimal,
    /// Line narration, falling back to the voucher narration
    pub narration: String,
}

/// All postings of one day, in entry order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBookDay {
    pub date: NaiveDate,
    pub rows: Vec<DayBookRow>,
    pub day_debit: BigDecimal,
    pub day_credit: BigDecimal,
}

/// Chronological journal of every active posting in a period. With only
/// balanced vouchers on the log, the two grand totals agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBook {
    pub period: Period,
    pub days: Vec<DayBookDay>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
}

/// Movement summary of one cash or bank ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashAccountSummary {
    pub ledger_id: LedgerId,
    pub name: String,
    pub opening: BalanceAmount,
    /// Gross debits in the window
    pub receipts: BigDecimal,
    /// Gross credits in the window
    pub payments: BigDecimal,
    pub closing: BalanceAmount,
}

/// Receipts and payments summary across the cash and bank ledgers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptsAndPayments {
    pub period: Period,
    pub accounts: Vec<CashAccountSummary>,
    pub opening_total: BigDecimal,
    pub total_receipts: BigDecimal,
    pub total_payments: BigDecimal,
    pub closing_total: BigDecimal,
}

/// Builds the subsidiary books from the posting log
pub struct SubsidiaryBooks<S: PostingStore> {
    storage: S,
    accumulator: BalanceAccumulator<S>,
}

impl<S: PostingStore + Clone> SubsidiaryBooks<S> {
    /// Create a subsidiary books builder
    pub fn new(storage: S) -> Self {
        Self {
            accumulator: BalanceAccumulator::new(storage.clone()),
            storage,
        }
    }

    /// Day book of the period: every active posting grouped by date, in
    /// entry order within each day
    pub async fn day_book(&self, period: &Period) -> LedgerResult<DayBook> {
        let vouchers = self
            .storage
            .vouchers_in(Some(*period), StatusFilter::ActiveOnly)
            .await?;
        let names: HashMap<LedgerId, String> = self
            .storage
            .list_ledgers(None)
            .await?
            .into_iter()
            .map(|ledger| (ledger.id, ledger.name))
            .collect();

        let mut days: BTreeMap<NaiveDate, DayBookDay> = BTreeMap::new();
        for voucher in &vouchers {
            let day = days.entry(voucher.date).or_insert_with(|| DayBookDay {
                date: voucher.date,
                rows: Vec::new(),
                day_debit: BigDecimal::from(0),
                day_credit: BigDecimal::from(0),
            });
            for posting in &voucher.postings {
                match posting.side {
                    Side::Debit => day.day_debit += &posting.amount,
                    Side::Credit => day.day_credit += &posting.amount,
                }
                day.rows.push(DayBookRow {
                    voucher_id: voucher.id,
                    voucher_type: voucher.voucher_type,
                    voucher_number: voucher.number.clone(),
                    ledger_id: posting.ledger_id,
                    ledger_name: names
                        .get(&posting.ledger_id)
                        .cloned()
                        .unwrap_or_else(|| posting.ledger_id.to_string()),
                    side: posting.side,
                    amount: posting.amount.clone(),
                    narration: posting
                        .narration
                        .clone()
                        .unwrap_or_else(|| voucher.narration.clone()),
                });
            }
        }

        let total_debit: BigDecimal = days.values().map(|d| &d.day_debit).sum();
        let total_credit: BigDecimal = days.values().map(|d| &d.day_credit).sum();

        Ok(DayBook {
            period: *period,
            days: days.into_values().collect(),
            total_debit,
            total_credit,
        })
    }

    /// Receipts and payments over the cash and bank ledgers, picked out
    /// of the balance abstract by category
    pub async fn receipts_and_payments(
        &self,
        period: &Period,
    ) -> LedgerResult<ReceiptsAndPayments> {
        let snapshots = self.accumulator.abstract_all(period).await?;

        let mut accounts = Vec::new();
        let mut opening_total = BigDecimal::from(0);
        let mut total_receipts = BigDecimal::from(0);
        let mut total_payments = BigDecimal::from(0);
        let mut closing_total = BigDecimal::from(0);

        for snapshot in snapshots {
            let category = &snapshot.ledger.category;
            if !(category.eq_ignore_ascii_case("Cash") || category.eq_ignore_ascii_case("Bank")) {
                continue;
            }

            opening_total += snapshot.opening.signed();
            total_receipts += &snapshot.period_debit;
            total_payments += &snapshot.period_credit;
            closing_total += snapshot.closing.signed();

            accounts.push(CashAccountSummary {
                ledger_id: snapshot.ledger.id,
                name: snapshot.ledger.name,
                opening: snapshot.opening,
                receipts: snapshot.period_debit,
                payments: snapshot.period_credit,
                closing: snapshot.closing,
            });
        }

        Ok(ReceiptsAndPayments {
            period: *period,
            accounts,
            opening_total,
            total_receipts,
            total_payments,
            closing_total,
        })
    }
}
