//! Core types and data structures for the dairy ledger engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a ledger account, generated when the account is registered.
pub type LedgerId = Uuid;

/// Identifier of a voucher, generated when the voucher is created.
pub type VoucherId = Uuid;

/// Ledger account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerType {
    /// Assets - what the society owns (Cash, Bank, Feed Stock, advances out)
    Asset,
    /// Liabilities - what the society owes (member payables, funds held)
    Liability,
    /// Capital - members' interest in the society (Share Capital, reserves)
    Capital,
    /// Income - money earned (Milk Sales, Feed Sales, interest)
    Income,
    /// Expenses - costs incurred (Milk Purchase, salaries, transport)
    Expense,
}

impl LedgerType {
    /// Returns the natural balance side for this ledger type.
    /// Assets and Expenses normally carry debit balances;
    /// Liabilities, Capital, and Income normally carry credit balances.
    pub fn natural_side(&self) -> Side {
        match self {
            LedgerType::Asset | LedgerType::Expense => Side::Debit,
            LedgerType::Liability | LedgerType::Capital | LedgerType::Income => Side::Credit,
        }
    }
}

/// The two sides of a double-entry posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Debit - increases Assets and Expenses, decreases the rest
    Debit,
    /// Credit - increases Liabilities, Capital, and Income, decreases the rest
    Credit,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Debit => Side::Credit,
            Side::Credit => Side::Debit,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Debit => write!(f, "Dr"),
            Side::Credit => write!(f, "Cr"),
        }
    }
}

/// A ledger account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Unique identifier for the account
    pub id: LedgerId,
    /// Human-readable account name, unique across the chart.
    /// Immutable once the account has postings; historical reports
    /// reference accounts by name.
    pub name: String,
    /// Type of account (Asset, Liability, Capital, Income, Expense)
    pub ledger_type: LedgerType,
    /// Free-text grouping tag used by the statement classifier
    /// (e.g. "Bank", "Member", "Stock", "Trading")
    pub category: String,
    /// Whether the account accepts new postings. Accounts with postings
    /// are never deleted, only deactivated.
    pub active: bool,
    /// When the account was registered
    pub created_at: NaiveDateTime,
}

impl Ledger {
    /// Create a new ledger account with a generated id
    pub fn new(name: String, ledger_type: LedgerType, category: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            ledger_type,
            category,
            active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Natural balance side derived from the account type
    pub fn natural_side(&self) -> Side {
        self.ledger_type.natural_side()
    }
}

/// Advance categories recovered from member milk payments.
/// Recovery runs in the fixed priority order Loan, then CF, then Cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvanceCategory {
    /// Long-term loan advance
    LoanAdvance,
    /// Cattle feed advance
    CfAdvance,
    /// Short-term cash advance
    CashAdvance,
}

impl AdvanceCategory {
    /// Fixed recovery priority order. Applied on the server side;
    /// client-supplied ordering is never trusted.
    pub const PRIORITY: [AdvanceCategory; 3] = [
        AdvanceCategory::LoanAdvance,
        AdvanceCategory::CfAdvance,
        AdvanceCategory::CashAdvance,
    ];
}

impl fmt::Display for AdvanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvanceCategory::LoanAdvance => write!(f, "Loan Advance"),
            AdvanceCategory::CfAdvance => write!(f, "CF Advance"),
            AdvanceCategory::CashAdvance => write!(f, "Cash Advance"),
        }
    }
}

/// Tag linking a posting to a farmer's advance account.
/// Grants carry the tag on the debit leg, recoveries on the credit leg;
/// a farmer's outstanding is derived solely from tagged postings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceTag {
    /// Farmer identifier, owned by the member registry
    pub farmer_id: String,
    /// Which advance account of the farmer the posting affects
    pub category: AdvanceCategory,
}

/// One line of a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Account being posted to
    pub ledger_id: LedgerId,
    /// Debit or credit
    pub side: Side,
    /// Posted amount, always positive
    pub amount: BigDecimal,
    /// Optional line-level narration
    pub narration: Option<String>,
    /// Present when the line grants or recovers a farmer advance
    pub advance: Option<AdvanceTag>,
}

impl Posting {
    /// Create a new posting line
    pub fn new(
        ledger_id: LedgerId,
        side: Side,
        amount: BigDecimal,
        narration: Option<String>,
    ) -> Self {
        Self {
            ledger_id,
            side,
            amount,
            narration,
            advance: None,
        }
    }

    /// Create a debit posting
    pub fn debit(ledger_id: LedgerId, amount: BigDecimal, narration: Option<String>) -> Self {
        Self::new(ledger_id, Side::Debit, amount, narration)
    }

    /// Create a credit posting
    pub fn credit(ledger_id: LedgerId, amount: BigDecimal, narration: Option<String>) -> Self {
        Self::new(ledger_id, Side::Credit, amount, narration)
    }

    /// Attach an advance tag to the posting
    pub fn with_advance(mut self, farmer_id: String, category: AdvanceCategory) -> Self {
        self.advance = Some(AdvanceTag { farmer_id, category });
        self
    }

    /// Amount signed on the debit side: positive for debits, negative for credits
    pub fn signed_amount(&self) -> BigDecimal {
        match self.side {
            Side::Debit => self.amount.clone(),
            Side::Credit => -&self.amount,
        }
    }
}

/// Voucher types as entered by the collaborating entry screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    /// Money received
    Receipt,
    /// Money paid out
    Payment,
    /// Non-cash adjusting entry
    Journal,
    /// Cash/bank to cash/bank transfer
    Contra,
    /// Sales entry
    Sales,
    /// Purchase entry
    Purchase,
}

impl fmt::Display for VoucherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoucherType::Receipt => write!(f, "Receipt"),
            VoucherType::Payment => write!(f, "Payment"),
            VoucherType::Journal => write!(f, "Journal"),
            VoucherType::Contra => write!(f, "Contra"),
            VoucherType::Sales => write!(f, "Sales"),
            VoucherType::Purchase => write!(f, "Purchase"),
        }
    }
}

/// Lifecycle status of a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    /// Counted in every balance computation
    Active,
    /// Excluded from balances but kept stored for audit
    Cancelled,
}

/// Filter applied to posting and voucher queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Only postings of active vouchers; the default for balance work
    ActiveOnly,
    /// Everything stored, including cancelled vouchers; used by audit views
    All,
}

impl StatusFilter {
    /// Whether a voucher with the given status passes this filter
    pub fn admits(&self, status: VoucherStatus) -> bool {
        match self {
            StatusFilter::ActiveOnly => status == VoucherStatus::Active,
            StatusFilter::All => true,
        }
    }
}

/// A dated double-entry voucher with its posting lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique identifier for the voucher
    pub id: VoucherId,
    /// Entry screen the voucher came from
    pub voucher_type: VoucherType,
    /// Date the voucher is effective
    pub date: NaiveDate,
    /// Collaborator-supplied number, unique per voucher type
    pub number: String,
    /// Active or Cancelled; cancellation is a one-way status flip
    pub status: VoucherStatus,
    /// Voucher-level narration
    pub narration: String,
    /// The double-entry lines
    pub postings: Vec<Posting>,
    /// Monotonic sequence assigned by the store on append; orders
    /// same-day vouchers by entry order. Zero until stored.
    pub entry_seq: u64,
    /// Reason recorded when the voucher was cancelled
    pub cancel_reason: Option<String>,
    /// When the voucher was cancelled
    pub cancelled_at: Option<NaiveDateTime>,
    /// When the voucher was created
    pub created_at: NaiveDateTime,
}

impl Voucher {
    /// Create a new active voucher with a generated id and no postings
    pub fn new(
        voucher_type: VoucherType,
        date: NaiveDate,
        number: String,
        narration: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            voucher_type,
            date,
            number,
            status: VoucherStatus::Active,
            narration,
            postings: Vec::new(),
            entry_seq: 0,
            cancel_reason: None,
            cancelled_at: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Add a posting line to the voucher
    pub fn add_posting(&mut self, posting: Posting) {
        self.postings.push(posting);
    }

    /// Sum of all debit lines
    pub fn total_debits(&self) -> BigDecimal {
        self.postings
            .iter()
            .filter(|p| p.side == Side::Debit)
            .map(|p| &p.amount)
            .sum()
    }

    /// Sum of all credit lines
    pub fn total_credits(&self) -> BigDecimal {
        self.postings
            .iter()
            .filter(|p| p.side == Side::Credit)
            .map(|p| &p.amount)
            .sum()
    }

    /// Whether the voucher still counts towards balances
    pub fn is_active(&self) -> bool {
        self.status == VoucherStatus::Active
    }

    /// Validate the double-entry structure of the voucher
    pub fn validate(&self) -> LedgerResult<()> {
        if self.postings.is_empty() {
            return Err(LedgerError::Validation(
                "Voucher must have at least one posting".to_string(),
            ));
        }

        if self.postings.len() < 2 {
            return Err(LedgerError::Validation(
                "Voucher must have at least two postings for double-entry bookkeeping".to_string(),
            ));
        }

        for posting in &self.postings {
            if posting.amount <= BigDecimal::from(0) {
                return Err(LedgerError::Validation(
                    "Posting amounts must be positive".to_string(),
                ));
            }
        }

        let debit = self.total_debits();
        let credit = self.total_credits();
        if !crate::utils::validation::within_epsilon(&debit, &credit) {
            return Err(LedgerError::UnbalancedVoucher {
                number: self.number.clone(),
                debit,
                credit,
            });
        }

        Ok(())
    }
}

/// A posting joined with its owning voucher's context, as returned by
/// posting queries. Records are ordered by date, then store entry
/// sequence, then line number, which reproduces the entry order the
/// Cash Book and Day Book display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRecord {
    /// Owning voucher
    pub voucher_id: VoucherId,
    /// Owning voucher's type
    pub voucher_type: VoucherType,
    /// Owning voucher's number
    pub voucher_number: String,
    /// Effective date of the posting
    pub date: NaiveDate,
    /// Store entry sequence of the owning voucher
    pub entry_seq: u64,
    /// Zero-based line number within the voucher
    pub line_no: usize,
    /// The posting line itself
    pub posting: Posting,
}

impl PostingRecord {
    /// Amount signed on the debit side
    pub fn signed_amount(&self) -> BigDecimal {
        self.posting.signed_amount()
    }
}

/// An inclusive date window for balance and report queries.
/// Named presets (this month, financial year, ...) are resolved by the
/// caller; the engine only ever sees concrete dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Create a period, rejecting windows that end before they start
    pub fn new(start: NaiveDate, end: NaiveDate) -> LedgerResult<Self> {
        if start > end {
            return Err(LedgerError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the window (inclusive)
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether the date falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// An unsigned balance together with the side it sits on.
/// Abnormal balances (a bank overdraft, a member who owes the society)
/// are reported truthfully on the opposite of the natural side, never
/// clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceAmount {
    /// Absolute balance amount
    pub amount: BigDecimal,
    /// Side the balance sits on
    pub side: Side,
}

impl BalanceAmount {
    /// A zero balance shown on the given side
    pub fn zero(side: Side) -> Self {
        Self {
            amount: BigDecimal::from(0),
            side,
        }
    }

    /// Build from a raw signed value where positive means debit
    /// (the sum of debits minus the sum of credits). Zero balances are
    /// presented on the ledger's natural side.
    pub fn from_signed(signed: &BigDecimal, natural_side: Side) -> Self {
        let zero = BigDecimal::from(0);
        if *signed == zero {
            Self::zero(natural_side)
        } else if *signed > zero {
            Self {
                amount: signed.clone(),
                side: Side::Debit,
            }
        } else {
            Self {
                amount: signed.abs(),
                side: Side::Credit,
            }
        }
    }

    /// Back to a raw signed value, positive on the debit side
    pub fn signed(&self) -> BigDecimal {
        match self.side {
            Side::Debit => self.amount.clone(),
            Side::Credit => -&self.amount,
        }
    }

    /// The balance signed positive on the given side; a balance sitting
    /// on the opposite side comes back negative.
    pub fn signed_on(&self, side: Side) -> BigDecimal {
        if self.side == side {
            self.amount.clone()
        } else {
            -&self.amount
        }
    }

    /// Whether the balance is zero
    pub fn is_zero(&self) -> bool {
        self.amount == BigDecimal::from(0)
    }
}

impl fmt::Display for BalanceAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.side)
    }
}

/// Computed balances of one ledger over a period. Derived on demand from
/// the posting log and never persisted, so cancellations and backdated
/// corrections are always reflected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// The ledger the snapshot describes
    pub ledger: Ledger,
    /// The window the snapshot covers
    pub period: Period,
    /// Balance carried in from postings dated before the window
    pub opening: BalanceAmount,
    /// Gross debits inside the window, never netted
    pub period_debit: BigDecimal,
    /// Gross credits inside the window, never netted
    pub period_credit: BigDecimal,
    /// Opening plus period debits minus period credits
    pub closing: BalanceAmount,
}

/// Errors that can occur in the ledger engine
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Unknown ledger: {0}")]
    UnknownLedger(String),
    #[error("Duplicate ledger name: {0}")]
    DuplicateLedgerName(String),
    #[error("Voucher {number} is not balanced: debits = {debit}, credits = {credit}")]
    UnbalancedVoucher {
        number: String,
        debit: BigDecimal,
        credit: BigDecimal,
    },
    #[error("Duplicate {voucher_type} voucher number: {number}")]
    DuplicateVoucherNumber {
        voucher_type: VoucherType,
        number: String,
    },
    #[error("Voucher not found: {0}")]
    VoucherNotFound(VoucherId),
    #[error("Voucher {0} is already cancelled")]
    AlreadyCancelled(VoucherId),
    #[error("{category} deduction of {requested} for farmer {farmer_id} exceeds outstanding {available}")]
    DeductionExceedsOutstanding {
        farmer_id: String,
        category: AdvanceCategory,
        requested: BigDecimal,
        available: BigDecimal,
    },
    #[error("Concurrent update to outstanding accounts of farmer {0}")]
    ConcurrentOutstandingConflict(String),
    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
    #[error("Validation error: {0}")]
    Validation(String),
}

impl LedgerError {
    /// Whether the operation may be retried as-is. Only the per-farmer
    /// serialization conflict is transient; everything else needs a
    /// corrected input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentOutstandingConflict(_))
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
