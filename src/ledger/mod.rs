//! Ledger module containing the account registry, voucher posting, and
//! balance derivation

pub mod balance;
pub mod core;
pub mod registry;
pub mod voucher;

pub use balance::*;
pub use core::*;
pub use registry::*;
pub use voucher::*;
