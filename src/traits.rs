//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::*;

/// Storage abstraction for the posting log and chart of accounts
///
/// This trait allows the ledger engine to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these
/// methods. All methods take `&self`; implementations provide their own
/// interior synchronization so the engine can serve concurrent callers.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Save a new ledger account. Fails with `DuplicateLedgerName` when
    /// another account already uses the name, compared case-insensitively.
    async fn save_ledger(&self, ledger: &Ledger) -> LedgerResult<()>;

    /// Get a ledger account by id
    async fn get_ledger(&self, ledger_id: LedgerId) -> LedgerResult<Option<Ledger>>;

    /// Find a ledger account by name, compared case-insensitively
    async fn find_ledger_by_name(&self, name: &str) -> LedgerResult<Option<Ledger>>;

    /// List all ledger accounts, optionally filtered by type
    async fn list_ledgers(&self, ledger_type: Option<LedgerType>) -> LedgerResult<Vec<Ledger>>;

    /// Update an existing ledger account
    async fn update_ledger(&self, ledger: &Ledger) -> LedgerResult<()>;

    /// Ids of every ledger that has at least one stored posting,
    /// regardless of voucher status. Cancelled vouchers keep an account
    /// in this set; it drives which accounts appear on balance abstracts.
    async fn posted_ledger_ids(&self) -> LedgerResult<Vec<LedgerId>>;

    /// Append a voucher to the posting log. Assigns the store entry
    /// sequence and enforces number uniqueness per voucher type in the
    /// same step. Returns the stored voucher.
    async fn append_voucher(&self, voucher: &Voucher) -> LedgerResult<Voucher>;

    /// Append a voucher whose postings touch one farmer's advance
    /// accounts. The append succeeds only if the farmer's version still
    /// equals `expected_version`; the version is bumped on success.
    /// Fails with `ConcurrentOutstandingConflict` otherwise.
    async fn append_voucher_for_farmer(
        &self,
        voucher: &Voucher,
        farmer_id: &str,
        expected_version: u64,
    ) -> LedgerResult<Voucher>;

    /// Get a voucher by id
    async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>>;

    /// Find a voucher by type and number
    async fn find_voucher_by_number(
        &self,
        voucher_type: VoucherType,
        number: &str,
    ) -> LedgerResult<Option<Voucher>>;

    /// Flip a voucher's status to Cancelled, recording the reason and
    /// time. The voucher stays stored. Fails with `VoucherNotFound` or
    /// `AlreadyCancelled`. Implementations must bump the version of
    /// every farmer tagged on the voucher's postings, since cancelling
    /// changes their outstanding.
    async fn mark_cancelled(&self, voucher_id: VoucherId, reason: &str) -> LedgerResult<Voucher>;

    /// List vouchers, optionally limited to a period, ordered by date
    /// then store entry sequence
    async fn vouchers_in(
        &self,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<Voucher>>;

    /// Postings of one ledger, optionally limited to a period, ordered
    /// by date, then store entry sequence, then line number
    async fn postings_for(
        &self,
        ledger_id: LedgerId,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>>;

    /// Every posting dated on or before `end`, across all ledgers, in
    /// the same order as `postings_for`. One scan of this feeds the
    /// whole-chart balance abstract.
    async fn postings_until(
        &self,
        end: NaiveDate,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>>;

    /// Advance-tagged postings of one farmer, in posting order
    async fn advance_postings(
        &self,
        farmer_id: &str,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>>;

    /// Current version of a farmer's advance accounts. Farmers with no
    /// tagged postings yet are at version zero.
    async fn farmer_version(&self, farmer_id: &str) -> LedgerResult<u64>;
}

/// Trait for implementing custom ledger account validation rules
pub trait LedgerValidator: Send + Sync {
    /// Validate a ledger account before saving
    fn validate_ledger(&self, ledger: &Ledger) -> LedgerResult<()>;
}

/// Trait for implementing custom voucher validation rules
pub trait VoucherValidator: Send + Sync {
    /// Validate a voucher before it is appended to the log
    fn validate_voucher(&self, voucher: &Voucher) -> LedgerResult<()>;
}

/// Default ledger validator with basic rules
pub struct DefaultLedgerValidator;

impl LedgerValidator for DefaultLedgerValidator {
    fn validate_ledger(&self, ledger: &Ledger) -> LedgerResult<()> {
        if ledger.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Ledger name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default voucher validator with basic double-entry rules
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> LedgerResult<()> {
        voucher.validate()
    }
}
