//! Financial statements built from derived balances

pub mod books;
pub mod classify;
pub mod reports;

pub use books::*;
pub use classify::*;
pub use reports::*;
