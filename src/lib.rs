//! # Dairy Ledger Core
//!
//! A double-entry general ledger engine for dairy cooperative societies,
//! covering voucher posting, derived balances, financial statements, and
//! milk payment settlement against farmer advances.
//!
//! ## Features
//!
//! - **Double-entry bookkeeping**: Balanced vouchers with full validation;
//!   cancellation keeps each voucher stored for audit
//! - **Ledger registry**: Asset, Liability, Capital, Income, and Expense
//!   accounts with a standard dairy cooperative chart
//! - **Derived balances**: Opening, period, and closing figures computed
//!   from the posting log on every call, never cached
//! - **Financial statements**: Trading account, profit and loss, balance
//!   sheet, day book, cash book, and receipts and payments
//! - **Advance settlement**: Milk payments recovering welfare, loan, CF,
//!   and cash advances in fixed priority order, committed atomically per
//!   farmer
//! - **Storage abstraction**: Database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use dairy_ledger_core::{DairyBooks, LedgerType, Period, StatusFilter};
//! use dairy_ledger_core::utils::MemoryStore;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn run() -> dairy_ledger_core::LedgerResult<()> {
//! let books = DairyBooks::new(MemoryStore::new());
//! let chart = books.setup_dairy_chart().await?;
//!
//! let voucher = dairy_ledger_core::patterns::receipt(
//!     "R0001".to_string(),
//!     NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
//!     "Morning milk sales".to_string(),
//!     chart["cash"].id,
//!     chart["milk_sales"].id,
//!     BigDecimal::from(1500),
//! )?;
//! books.post_voucher(voucher).await?;
//!
//! let april = Period::new(
//!     NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
//! )?;
//! let abstract_rows = books.abstract_all(&april).await?;
//! assert_eq!(abstract_rows.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod advances;
pub mod ledger;
pub mod statements;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use advances::*;
pub use ledger::*;
pub use statements::*;
pub use traits::*;
pub use types::*;

// Re-export voucher patterns for convenience
pub use ledger::voucher::patterns;
