//! Balance derivation from the posting log

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::traits::*;
use crate::types::*;

/// Gross debit and credit movement accumulated over some set of postings
#[derive(Debug, Clone, Default)]
struct Movement {
    debit: BigDecimal,
    credit: BigDecimal,
}

impl Movement {
    fn add(&mut self, side: Side, amount: &BigDecimal) {
        match side {
            Side::Debit => self.debit += amount,
            Side::Credit => self.credit += amount,
        }
    }

    fn signed(&self) -> BigDecimal {
        &self.debit - &self.credit
    }
}

/// Gross period totals of one ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    /// Sum of debit postings in the window
    pub debit: BigDecimal,
    /// Sum of credit postings in the window
    pub credit: BigDecimal,
}

/// One line of a cash book, with the running balance after the posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashBookLine {
    pub date: NaiveDate,
    pub voucher_type: VoucherType,
    pub voucher_number: String,
    pub narration: Option<String>,
    pub side: Side,
    pub amount: BigDecimal,
    pub running: BalanceAmount,
}

/// Cash book of one cash or bank ledger over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashBook {
    pub ledger: Ledger,
    pub period: Period,
    pub opening: BalanceAmount,
    pub lines: Vec<CashBookLine>,
    pub period_debit: BigDecimal,
    pub period_credit: BigDecimal,
    pub closing: BalanceAmount,
}

/// Derives balances by folding the posting log on demand.
///
/// No running totals are cached anywhere: every figure is recomputed
/// from active postings each time it is asked for, so cancellations and
/// backdated corrections are reflected the moment they land and stored
/// state can never disagree with the log.
pub struct BalanceAccumulator<S: PostingStore> {
    storage: S,
}

impl<S: PostingStore> BalanceAccumulator<S> {
    /// Create a new balance accumulator
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Balance carried in from postings dated strictly before `as_of`
    pub async fn opening_balance(
        &self,
        ledger: &Ledger,
        as_of: NaiveDate,
    ) -> LedgerResult<BalanceAmount> {
        let records = self
            .storage
            .postings_for(ledger.id, None, StatusFilter::ActiveOnly)
            .await?;

        let mut movement = Movement::default();
        for record in records.iter().filter(|r| r.date < as_of) {
            movement.add(record.posting.side, &record.posting.amount);
        }
        Ok(BalanceAmount::from_signed(
            &movement.signed(),
            ledger.natural_side(),
        ))
    }

    /// Gross debit and credit totals inside the window. Offsetting
    /// movement is never netted away; a month that received and repaid
    /// the same amount shows both sides in full.
    pub async fn period_totals(
        &self,
        ledger: &Ledger,
        period: &Period,
    ) -> LedgerResult<PeriodTotals> {
        let records = self
            .storage
            .postings_for(ledger.id, Some(*period), StatusFilter::ActiveOnly)
            .await?;

        let mut movement = Movement::default();
        for record in &records {
            movement.add(record.posting.side, &record.posting.amount);
        }
        Ok(PeriodTotals {
            debit: movement.debit,
            credit: movement.credit,
        })
    }

    /// Closing balance at the end of the window
    pub async fn closing_balance(
        &self,
        ledger: &Ledger,
        period: &Period,
    ) -> LedgerResult<BalanceAmount> {
        Ok(self.snapshot(ledger, period).await?.closing)
    }

    /// Balance of all active postings to date
    pub async fn current_balance(&self, ledger: &Ledger) -> LedgerResult<BalanceAmount> {
        let records = self
            .storage
            .postings_for(ledger.id, None, StatusFilter::ActiveOnly)
            .await?;

        let mut movement = Movement::default();
        for record in &records {
            movement.add(record.posting.side, &record.posting.amount);
        }
        Ok(BalanceAmount::from_signed(
            &movement.signed(),
            ledger.natural_side(),
        ))
    }

    /// Opening, period movement, and closing of one ledger in one pass
    pub async fn snapshot(
        &self,
        ledger: &Ledger,
        period: &Period,
    ) -> LedgerResult<BalanceSnapshot> {
        let records = self
            .storage
            .postings_for(ledger.id, None, StatusFilter::ActiveOnly)
            .await?;

        let mut opening = Movement::default();
        let mut inside = Movement::default();
        for record in &records {
            if record.date < period.start() {
                opening.add(record.posting.side, &record.posting.amount);
            } else if record.date <= period.end() {
                inside.add(record.posting.side, &record.posting.amount);
            }
        }

        Ok(build_snapshot(ledger.clone(), *period, &opening, &inside))
    }

    /// Balance abstract of the whole chart over a period, computed from
    /// a single pass over all postings dated up to the window's end.
    ///
    /// Every ledger that has ever been posted to gets a row, including
    /// ledgers with no movement inside the window (their opening is
    /// carried forward unchanged) and ledgers whose only postings were
    /// since cancelled (an all-zero row). Ledgers never posted to are
    /// left out. Rows come back sorted by ledger name.
    pub async fn abstract_all(&self, period: &Period) -> LedgerResult<Vec<BalanceSnapshot>> {
        let ledgers = self.storage.list_ledgers(None).await?;
        let posted: HashSet<LedgerId> = self
            .storage
            .posted_ledger_ids()
            .await?
            .into_iter()
            .collect();
        let records = self
            .storage
            .postings_until(period.end(), StatusFilter::ActiveOnly)
            .await?;
        debug!(
            ledgers = ledgers.len(),
            postings = records.len(),
            "Computing balance abstract"
        );

        let mut movements: HashMap<LedgerId, (Movement, Movement)> = HashMap::new();
        for record in &records {
            let entry = movements.entry(record.posting.ledger_id).or_default();
            if record.date < period.start() {
                entry.0.add(record.posting.side, &record.posting.amount);
            } else {
                entry.1.add(record.posting.side, &record.posting.amount);
            }
        }

        let mut snapshots = Vec::new();
        for ledger in ledgers {
            if !posted.contains(&ledger.id) {
                continue;
            }
            let (opening, inside) = movements.remove(&ledger.id).unwrap_or_default();
            snapshots.push(build_snapshot(ledger, *period, &opening, &inside));
        }
        snapshots.sort_by(|a, b| a.ledger.name.cmp(&b.ledger.name));
        Ok(snapshots)
    }

    /// Balance of every posted ledger as of a date, in one pass over the
    /// log. Feeds the balance sheet.
    pub async fn all_balances_as_of(
        &self,
        as_of: NaiveDate,
    ) -> LedgerResult<Vec<(Ledger, BalanceAmount)>> {
        let ledgers = self.storage.list_ledgers(None).await?;
        let posted: HashSet<LedgerId> = self
            .storage
            .posted_ledger_ids()
            .await?
            .into_iter()
            .collect();
        let records = self
            .storage
            .postings_until(as_of, StatusFilter::ActiveOnly)
            .await?;

        let mut movements: HashMap<LedgerId, Movement> = HashMap::new();
        for record in &records {
            movements
                .entry(record.posting.ledger_id)
                .or_default()
                .add(record.posting.side, &record.posting.amount);
        }

        let mut balances = Vec::new();
        for ledger in ledgers {
            if !posted.contains(&ledger.id) {
                continue;
            }
            let movement = movements.remove(&ledger.id).unwrap_or_default();
            let balance = BalanceAmount::from_signed(&movement.signed(), ledger.natural_side());
            balances.push((ledger, balance));
        }
        balances.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(balances)
    }

    /// Cash book of one ledger: opening balance, every posting in entry
    /// order with a running balance, and the closing balance.
    pub async fn cash_book(&self, ledger: &Ledger, period: &Period) -> LedgerResult<CashBook> {
        let records = self
            .storage
            .postings_for(ledger.id, None, StatusFilter::ActiveOnly)
            .await?;
        let natural = ledger.natural_side();

        let mut opening = Movement::default();
        for record in records.iter().filter(|r| r.date < period.start()) {
            opening.add(record.posting.side, &record.posting.amount);
        }

        let mut inside = Movement::default();
        let mut running = opening.signed();
        let mut lines = Vec::new();
        for record in records.iter().filter(|r| period.contains(r.date)) {
            inside.add(record.posting.side, &record.posting.amount);
            running += record.signed_amount();
            lines.push(CashBookLine {
                date: record.date,
                voucher_type: record.voucher_type,
                voucher_number: record.voucher_number.clone(),
                narration: record.posting.narration.clone(),
                side: record.posting.side,
                amount: record.posting.amount.clone(),
                running: BalanceAmount::from_signed(&running, natural),
            });
        }

        Ok(CashBook {
            ledger: ledger.clone(),
            period: *period,
            opening: BalanceAmount::from_signed(&opening.signed(), natural),
            lines,
            period_debit: inside.debit,
            period_credit: inside.credit,
            closing: BalanceAmount::from_signed(&running, natural),
        })
    }
}

fn build_snapshot(
    ledger: Ledger,
    period: Period,
    opening: &Movement,
    inside: &Movement,
) -> BalanceSnapshot {
    let natural = ledger.natural_side();
    let opening_signed = opening.signed();
    let closing_signed = &opening_signed + inside.signed();
    BalanceSnapshot {
        ledger,
        period,
        opening: BalanceAmount::from_signed(&opening_signed, natural),
        period_debit: inside.debit.clone(),
        period_credit: inside.credit.clone(),
        closing: BalanceAmount::from_signed(&closing_signed, natural),
    }
}
