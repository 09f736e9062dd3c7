//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;

/// Rounding tolerance for balance comparisons: 0.01 in the society's
/// currency. Differences at or below this are rounding noise, not
/// bookkeeping errors.
pub fn rounding_epsilon() -> BigDecimal {
    BigDecimal::new(BigInt::from(1), 2)
}

/// Whether two amounts agree within the rounding tolerance
pub fn within_epsilon(a: &BigDecimal, b: &BigDecimal) -> bool {
    (a - b).abs() <= rounding_epsilon()
}

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an amount is zero or positive
pub fn validate_non_negative_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a ledger name is usable
pub fn validate_ledger_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Ledger name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "Ledger name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a voucher number is usable
pub fn validate_voucher_number(number: &str) -> LedgerResult<()> {
    if number.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Voucher number cannot be empty".to_string(),
        ));
    }

    if number.len() > 50 {
        return Err(LedgerError::Validation(
            "Voucher number cannot exceed 50 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a voucher narration is usable
pub fn validate_narration(narration: &str) -> LedgerResult<()> {
    if narration.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Narration cannot be empty".to_string(),
        ));
    }

    if narration.len() > 500 {
        return Err(LedgerError::Validation(
            "Narration cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Enhanced voucher validator with detailed checks
pub struct EnhancedVoucherValidator;

impl VoucherValidator for EnhancedVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher) -> LedgerResult<()> {
        // Basic double-entry validation
        voucher.validate()?;

        validate_voucher_number(&voucher.number)?;
        validate_narration(&voucher.narration)?;

        for posting in &voucher.postings {
            validate_positive_amount(&posting.amount)?;
        }

        // A ledger cannot appear twice on the same side of one voucher
        let mut ledger_side_combinations = std::collections::HashSet::new();
        for posting in &voucher.postings {
            let combination = (posting.ledger_id, posting.side);
            if !ledger_side_combinations.insert(combination) {
                return Err(LedgerError::Validation(format!(
                    "Ledger '{}' appears multiple times on the {} side of the voucher",
                    posting.ledger_id, posting.side
                )));
            }
        }

        Ok(())
    }
}

/// Enhanced ledger validator with detailed checks
pub struct EnhancedLedgerValidator;

impl LedgerValidator for EnhancedLedgerValidator {
    fn validate_ledger(&self, ledger: &Ledger) -> LedgerResult<()> {
        validate_ledger_name(&ledger.name)?;

        if ledger.category.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Ledger category cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
