//! Main books facade that coordinates the registry, posting log,
//! balances, and statements

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::advances::{SettlementLedgers, WaterfallResolver};
use crate::ledger::balance::{BalanceAccumulator, CashBook, PeriodTotals};
use crate::ledger::registry::LedgerRegistry;
use crate::ledger::voucher::VoucherManager;
use crate::statements::books::{DayBook, ReceiptsAndPayments, SubsidiaryBooks};
use crate::statements::reports::{BalanceSheet, ProfitAndLoss, StatementBuilder, TradingAccount};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::within_epsilon;

/// The books of one dairy cooperative society, coordinating all ledger
/// operations over a shared storage backend
pub struct DairyBooks<S: PostingStore> {
    storage: S,
    registry: LedgerRegistry<S>,
    vouchers: VoucherManager<S>,
    accumulator: BalanceAccumulator<S>,
    statements: StatementBuilder<S>,
    books: SubsidiaryBooks<S>,
}

impl<S: PostingStore + Clone> DairyBooks<S> {
    /// Create the books over the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            registry: LedgerRegistry::new(storage.clone()),
            vouchers: VoucherManager::new(storage.clone()),
            accumulator: BalanceAccumulator::new(storage.clone()),
            statements: StatementBuilder::new(storage.clone()),
            books: SubsidiaryBooks::new(storage.clone()),
            storage,
        }
    }

    /// Create the books with custom validators
    pub fn with_validators(
        storage: S,
        ledger_validator: Box<dyn LedgerValidator>,
        voucher_validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            registry: LedgerRegistry::with_validator(storage.clone(), ledger_validator),
            vouchers: VoucherManager::with_validator(storage.clone(), voucher_validator),
            accumulator: BalanceAccumulator::new(storage.clone()),
            statements: StatementBuilder::new(storage.clone()),
            books: SubsidiaryBooks::new(storage.clone()),
            storage,
        }
    }

    // Registry operations
    /// Register a new ledger account
    pub async fn register_ledger(
        &self,
        name: String,
        ledger_type: LedgerType,
        category: String,
    ) -> LedgerResult<Ledger> {
        self.registry.register(name, ledger_type, category).await
    }

    /// Resolve an account by name
    pub async fn resolve_ledger(&self, name: &str) -> LedgerResult<Ledger> {
        self.registry.resolve(name).await
    }

    /// Resolve an account by name, registering it if missing
    pub async fn ensure_ledger(
        &self,
        name: &str,
        ledger_type: LedgerType,
        category: &str,
    ) -> LedgerResult<Ledger> {
        self.registry.ensure(name, ledger_type, category).await
    }

    /// Get an account by id
    pub async fn get_ledger(&self, ledger_id: LedgerId) -> LedgerResult<Option<Ledger>> {
        self.registry.get(ledger_id).await
    }

    /// List all accounts
    pub async fn list_ledgers(&self) -> LedgerResult<Vec<Ledger>> {
        self.registry.list().await
    }

    /// List accounts by type
    pub async fn list_ledgers_by_type(&self, ledger_type: LedgerType) -> LedgerResult<Vec<Ledger>> {
        self.registry.list_by_type(ledger_type).await
    }

    /// Stop an account from accepting new postings
    pub async fn deactivate_ledger(&self, ledger_id: LedgerId) -> LedgerResult<Ledger> {
        self.registry.deactivate(ledger_id).await
    }

    /// Register the standard dairy cooperative chart of accounts
    pub async fn setup_dairy_chart(&self) -> LedgerResult<HashMap<String, Ledger>> {
        crate::ledger::registry::utils::create_dairy_chart(&self.registry).await
    }

    // Voucher operations
    /// Post a voucher to the log
    pub async fn post_voucher(&self, voucher: Voucher) -> LedgerResult<Voucher> {
        self.vouchers.post(voucher).await
    }

    /// Cancel a voucher, keeping it stored for audit
    pub async fn cancel_voucher(&self, voucher_id: VoucherId, reason: &str) -> LedgerResult<Voucher> {
        self.vouchers.cancel(voucher_id, reason).await
    }

    /// Get a voucher by id
    pub async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>> {
        self.vouchers.get(voucher_id).await
    }

    /// Find a voucher by type and number
    pub async fn find_voucher(
        &self,
        voucher_type: VoucherType,
        number: &str,
    ) -> LedgerResult<Option<Voucher>> {
        self.vouchers.find_by_number(voucher_type, number).await
    }

    /// List vouchers, optionally limited to a period
    pub async fn vouchers_in(
        &self,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<Voucher>> {
        self.vouchers.vouchers_in(period, filter).await
    }

    /// Postings of one ledger in entry order
    pub async fn postings_for(
        &self,
        ledger_id: LedgerId,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>> {
        self.vouchers.postings_for(ledger_id, period, filter).await
    }

    // Balance operations
    /// Balance carried in from postings dated before `as_of`
    pub async fn opening_balance(
        &self,
        ledger: &Ledger,
        as_of: NaiveDate,
    ) -> LedgerResult<BalanceAmount> {
        self.accumulator.opening_balance(ledger, as_of).await
    }

    /// Gross debit and credit totals inside the window
    pub async fn period_totals(
        &self,
        ledger: &Ledger,
        period: &Period,
    ) -> LedgerResult<PeriodTotals> {
        self.accumulator.period_totals(ledger, period).await
    }

    /// Closing balance at the end of the window
    pub async fn closing_balance(
        &self,
        ledger: &Ledger,
        period: &Period,
    ) -> LedgerResult<BalanceAmount> {
        self.accumulator.closing_balance(ledger, period).await
    }

    /// Balance of all active postings to date
    pub async fn current_balance(&self, ledger: &Ledger) -> LedgerResult<BalanceAmount> {
        self.accumulator.current_balance(ledger).await
    }

    /// Opening, period movement, and closing of one ledger
    pub async fn snapshot(&self, ledger: &Ledger, period: &Period) -> LedgerResult<BalanceSnapshot> {
        self.accumulator.snapshot(ledger, period).await
    }

    /// Balance abstract of every posted ledger over a period
    pub async fn abstract_all(&self, period: &Period) -> LedgerResult<Vec<BalanceSnapshot>> {
        self.accumulator.abstract_all(period).await
    }

    /// Cash book of one ledger with running balances
    pub async fn cash_book(&self, ledger: &Ledger, period: &Period) -> LedgerResult<CashBook> {
        self.accumulator.cash_book(ledger, period).await
    }

    // Statements
    /// Trading account for the period
    pub async fn trading_account(&self, period: &Period) -> LedgerResult<TradingAccount> {
        self.statements.trading_account(period).await
    }

    /// Profit and loss account for the period
    pub async fn profit_and_loss(&self, period: &Period) -> LedgerResult<ProfitAndLoss> {
        self.statements.profit_and_loss(period).await
    }

    /// Balance sheet as of a date
    pub async fn balance_sheet(&self, as_of: NaiveDate) -> LedgerResult<BalanceSheet> {
        self.statements.balance_sheet(as_of).await
    }

    /// Day book of the period
    pub async fn day_book(&self, period: &Period) -> LedgerResult<DayBook> {
        self.books.day_book(period).await
    }

    /// Receipts and payments over the cash and bank ledgers
    pub async fn receipts_and_payments(
        &self,
        period: &Period,
    ) -> LedgerResult<ReceiptsAndPayments> {
        self.books.receipts_and_payments(period).await
    }

    // Settlement
    /// A settlement resolver posting against the given chart accounts
    pub fn payment_resolver(&self, ledgers: SettlementLedgers) -> WaterfallResolver<S> {
        WaterfallResolver::new(self.storage.clone(), ledgers)
    }

    /// Check the books over a period: the day book must balance and the
    /// balance sheet identity must hold at the window's end
    pub async fn verify_books(&self, period: &Period) -> LedgerResult<BooksIntegrityReport> {
        let day_book = self.books.day_book(period).await?;
        let sheet = self.statements.balance_sheet(period.end()).await?;

        let mut issues = Vec::new();
        if !within_epsilon(&day_book.total_debit, &day_book.total_credit) {
            issues.push(format!(
                "Day book is not balanced: debits = {}, credits = {}",
                day_book.total_debit, day_book.total_credit
            ));
        }
        if sheet.flagged {
            issues.push(format!(
                "Balance sheet does not balance as of {}: imbalance = {}",
                period.end(),
                sheet.imbalance
            ));
        }

        Ok(BooksIntegrityReport {
            period: *period,
            is_consistent: issues.is_empty(),
            issues,
            day_book_debit: day_book.total_debit,
            day_book_credit: day_book.total_credit,
            imbalance: sheet.imbalance,
        })
    }
}

/// Report on the consistency of the books over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooksIntegrityReport {
    pub period: Period,
    pub is_consistent: bool,
    pub issues: Vec<String>,
    pub day_book_debit: BigDecimal,
    pub day_book_credit: BigDecimal,
    /// Balance sheet identity residual at the window's end
    pub imbalance: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::voucher::patterns;
    use crate::utils::memory_store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_books_basic_flow() {
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

        let voucher = patterns::receipt(
            "R0001".to_string(),
            date(2024, 4, 5),
            "Morning milk sales".to_string(),
            cash.id,
            sales.id,
            BigDecimal::from(1000),
        )
        .unwrap();
        let voucher = books.post_voucher(voucher).await.unwrap();
        assert!(voucher.entry_seq > 0);

        let balance = books.current_balance(&cash).await.unwrap();
        assert_eq!(balance.amount, BigDecimal::from(1000));
        assert_eq!(balance.side, Side::Debit);

        let period = Period::new(date(2024, 4, 1), date(2024, 4, 30)).unwrap();
        let rows = books.abstract_all(&period).await.unwrap();
        assert_eq!(rows.len(), 2);

        let report = books.verify_books(&period).await.unwrap();
        assert!(report.is_consistent, "issues: {:?}", report.issues);
        assert_eq!(report.day_book_debit, BigDecimal::from(1000));
    }

    #[tokio::test]
    async fn test_duplicate_ledger_name_rejected_case_insensitively() {
        let storage = MemoryStore::new();
        let books = DairyBooks::new(storage);

        books
            .register_ledger("Cash".to_string(), LedgerType::Asset, "Cash".to_string())
            .await
            .unwrap();
        let err = books
            .register_ledger("CASH".to_string(), LedgerType::Asset, "Cash".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateLedgerName(_)));
    }
}
