//! Voucher posting and lifecycle management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::info;

use crate::traits::*;
use crate::types::*;

/// Manager for posting vouchers to the log and reading them back
pub struct VoucherManager<S: PostingStore> {
    storage: S,
    validator: Box<dyn VoucherValidator>,
}

impl<S: PostingStore> VoucherManager<S> {
    /// Create a new voucher manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultVoucherValidator),
        }
    }

    /// Create a new voucher manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn VoucherValidator>) -> Self {
        Self { storage, validator }
    }

    /// Post a voucher to the log. The voucher must balance and every
    /// referenced ledger must exist and be active; nothing is stored
    /// when any check fails.
    pub async fn post(&self, voucher: Voucher) -> LedgerResult<Voucher> {
        self.validator.validate_voucher(&voucher)?;
        self.check_ledger_references(&voucher).await?;

        let stored = self.storage.append_voucher(&voucher).await?;
        info!(
            voucher = %stored.number,
            voucher_type = %stored.voucher_type,
            amount = %stored.total_debits(),
            "Posted voucher"
        );
        Ok(stored)
    }

    /// Post a voucher that settles against one farmer's advance
    /// accounts. The append succeeds only if the farmer's version is
    /// still `expected_version`, so two settlements for the same farmer
    /// cannot interleave.
    pub async fn post_serialized(
        &self,
        voucher: Voucher,
        farmer_id: &str,
        expected_version: u64,
    ) -> LedgerResult<Voucher> {
        self.validator.validate_voucher(&voucher)?;
        self.check_ledger_references(&voucher).await?;

        let stored = self
            .storage
            .append_voucher_for_farmer(&voucher, farmer_id, expected_version)
            .await?;
        info!(
            voucher = %stored.number,
            voucher_type = %stored.voucher_type,
            farmer = farmer_id,
            amount = %stored.total_debits(),
            "Posted voucher"
        );
        Ok(stored)
    }

    /// Cancel a voucher. The voucher drops out of every balance but
    /// stays stored with its reason and time for audit.
    pub async fn cancel(&self, voucher_id: VoucherId, reason: &str) -> LedgerResult<Voucher> {
        if reason.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Cancellation reason cannot be empty".to_string(),
            ));
        }

        let cancelled = self.storage.mark_cancelled(voucher_id, reason).await?;
        info!(voucher = %cancelled.number, reason, "Cancelled voucher");
        Ok(cancelled)
    }

    /// Get a voucher by id
    pub async fn get(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>> {
        self.storage.get_voucher(voucher_id).await
    }

    /// Get a voucher by id, returning an error if not found
    pub async fn require(&self, voucher_id: VoucherId) -> LedgerResult<Voucher> {
        self.storage
            .get_voucher(voucher_id)
            .await?
            .ok_or(LedgerError::VoucherNotFound(voucher_id))
    }

    /// Find a voucher by type and number
    pub async fn find_by_number(
        &self,
        voucher_type: VoucherType,
        number: &str,
    ) -> LedgerResult<Option<Voucher>> {
        self.storage.find_voucher_by_number(voucher_type, number).await
    }

    /// List vouchers, optionally limited to a period
    pub async fn vouchers_in(
        &self,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<Voucher>> {
        self.storage.vouchers_in(period, filter).await
    }

    /// Postings of one ledger in entry order
    pub async fn postings_for(
        &self,
        ledger_id: LedgerId,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>> {
        self.storage.postings_for(ledger_id, period, filter).await
    }

    async fn check_ledger_references(&self, voucher: &Voucher) -> LedgerResult<()> {
        for posting in &voucher.postings {
            let ledger = self
                .storage
                .get_ledger(posting.ledger_id)
                .await?
                .ok_or_else(|| LedgerError::UnknownLedger(posting.ledger_id.to_string()))?;
            if !ledger.active {
                return Err(LedgerError::Validation(format!(
                    "Ledger '{}' is deactivated and cannot accept postings",
                    ledger.name
                )));
            }
        }
        Ok(())
    }
}

/// Fluent builder for assembling vouchers
#[derive(Debug)]
pub struct VoucherBuilder {
    voucher: Voucher,
}

impl VoucherBuilder {
    /// Create a new voucher builder
    pub fn new(
        voucher_type: VoucherType,
        date: NaiveDate,
        number: String,
        narration: String,
    ) -> Self {
        Self {
            voucher: Voucher::new(voucher_type, date, number, narration),
        }
    }

    /// Add a debit line
    pub fn debit(mut self, ledger_id: LedgerId, amount: BigDecimal, narration: Option<String>) -> Self {
        self.voucher.add_posting(Posting::debit(ledger_id, amount, narration));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, ledger_id: LedgerId, amount: BigDecimal, narration: Option<String>) -> Self {
        self.voucher.add_posting(Posting::credit(ledger_id, amount, narration));
        self
    }

    /// Add a custom line, e.g. one carrying an advance tag
    pub fn posting(mut self, posting: Posting) -> Self {
        self.voucher.add_posting(posting);
        self
    }

    /// Validate and build the voucher
    pub fn build(self) -> LedgerResult<Voucher> {
        self.voucher.validate()?;
        Ok(self.voucher)
    }
}

/// Common voucher patterns
pub mod patterns {
    use super::*;

    /// Money received: debit cash or bank, credit the income ledger
    pub fn receipt(
        number: String,
        date: NaiveDate,
        narration: String,
        cash_ledger: LedgerId,
        income_ledger: LedgerId,
        amount: BigDecimal,
    ) -> LedgerResult<Voucher> {
        VoucherBuilder::new(VoucherType::Receipt, date, number, narration)
            .debit(cash_ledger, amount.clone(), None)
            .credit(income_ledger, amount, None)
            .build()
    }

    /// Money paid out: debit the expense ledger, credit cash or bank
    pub fn payment(
        number: String,
        date: NaiveDate,
        narration: String,
        expense_ledger: LedgerId,
        cash_ledger: LedgerId,
        amount: BigDecimal,
    ) -> LedgerResult<Voucher> {
        VoucherBuilder::new(VoucherType::Payment, date, number, narration)
            .debit(expense_ledger, amount.clone(), None)
            .credit(cash_ledger, amount, None)
            .build()
    }

    /// Non-cash adjusting entry between two ledgers
    pub fn journal_entry(
        number: String,
        date: NaiveDate,
        narration: String,
        debit_ledger: LedgerId,
        credit_ledger: LedgerId,
        amount: BigDecimal,
    ) -> LedgerResult<Voucher> {
        VoucherBuilder::new(VoucherType::Journal, date, number, narration)
            .debit(debit_ledger, amount.clone(), None)
            .credit(credit_ledger, amount, None)
            .build()
    }

    /// Transfer between cash and bank ledgers
    pub fn contra_transfer(
        number: String,
        date: NaiveDate,
        narration: String,
        to_ledger: LedgerId,
        from_ledger: LedgerId,
        amount: BigDecimal,
    ) -> LedgerResult<Voucher> {
        VoucherBuilder::new(VoucherType::Contra, date, number, narration)
            .debit(to_ledger, amount.clone(), None)
            .credit(from_ledger, amount, None)
            .build()
    }

    /// Advance paid out to a farmer: debit the advance ledger with the
    /// farmer tag, credit cash. The tagged debit raises the farmer's
    /// outstanding in that category.
    pub fn advance_grant(
        number: String,
        date: NaiveDate,
        farmer_id: String,
        category: AdvanceCategory,
        advance_ledger: LedgerId,
        cash_ledger: LedgerId,
        amount: BigDecimal,
    ) -> LedgerResult<Voucher> {
        let narration = format!("{} granted to farmer {}", category, farmer_id);
        VoucherBuilder::new(VoucherType::Payment, date, number, narration)
            .posting(
                Posting::debit(advance_ledger, amount.clone(), None)
                    .with_advance(farmer_id, category),
            )
            .credit(cash_ledger, amount, None)
            .build()
    }
}
