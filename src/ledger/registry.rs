//! Ledger account registry and chart of accounts

use std::collections::HashMap;
use tracing::{debug, info};

use crate::traits::*;
use crate::types::*;

/// Registry for managing the chart of ledger accounts
pub struct LedgerRegistry<S: PostingStore> {
    pub(crate) storage: S,
    validator: Box<dyn LedgerValidator>,
}

impl<S: PostingStore> LedgerRegistry<S> {
    /// Create a new ledger registry
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultLedgerValidator),
        }
    }

    /// Create a new ledger registry with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn LedgerValidator>) -> Self {
        Self { storage, validator }
    }

    /// Register a new ledger account. Names are unique across the whole
    /// chart, compared case-insensitively.
    pub async fn register(
        &self,
        name: String,
        ledger_type: LedgerType,
        category: String,
    ) -> LedgerResult<Ledger> {
        let ledger = Ledger::new(name, ledger_type, category);

        self.validator.validate_ledger(&ledger)?;

        if let Some(existing) = self.storage.find_ledger_by_name(&ledger.name).await? {
            return Err(LedgerError::DuplicateLedgerName(existing.name));
        }

        self.storage.save_ledger(&ledger).await?;
        info!(
            ledger = %ledger.name,
            ledger_type = ?ledger.ledger_type,
            "Registered ledger account"
        );

        Ok(ledger)
    }

    /// Resolve an account by name, compared case-insensitively
    pub async fn resolve(&self, name: &str) -> LedgerResult<Ledger> {
        self.storage
            .find_ledger_by_name(name)
            .await?
            .ok_or_else(|| LedgerError::UnknownLedger(name.to_string()))
    }

    /// Get an account by id
    pub async fn get(&self, ledger_id: LedgerId) -> LedgerResult<Option<Ledger>> {
        self.storage.get_ledger(ledger_id).await
    }

    /// Get an account by id, returning an error if not found
    pub async fn require(&self, ledger_id: LedgerId) -> LedgerResult<Ledger> {
        self.storage
            .get_ledger(ledger_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownLedger(ledger_id.to_string()))
    }

    /// Resolve an account by name, registering it first if it does not
    /// exist yet. Used for per-member accounts that appear on first use.
    pub async fn ensure(
        &self,
        name: &str,
        ledger_type: LedgerType,
        category: &str,
    ) -> LedgerResult<Ledger> {
        match self.resolve(name).await {
            Ok(ledger) => Ok(ledger),
            Err(LedgerError::UnknownLedger(_)) => {
                match self
                    .register(name.to_string(), ledger_type, category.to_string())
                    .await
                {
                    Ok(ledger) => Ok(ledger),
                    // Lost the race to a concurrent registration
                    Err(LedgerError::DuplicateLedgerName(_)) => {
                        debug!(ledger = name, "Lost registration race, resolving again");
                        self.resolve(name).await
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// List all accounts
    pub async fn list(&self) -> LedgerResult<Vec<Ledger>> {
        self.storage.list_ledgers(None).await
    }

    /// List accounts by type
    pub async fn list_by_type(&self, ledger_type: LedgerType) -> LedgerResult<Vec<Ledger>> {
        self.storage.list_ledgers(Some(ledger_type)).await
    }

    /// Stop an account from accepting new postings. The account and its
    /// history stay on the books; there is no delete.
    pub async fn deactivate(&self, ledger_id: LedgerId) -> LedgerResult<Ledger> {
        let mut ledger = self.require(ledger_id).await?;
        ledger.active = false;
        self.storage.update_ledger(&ledger).await?;
        info!(ledger = %ledger.name, "Deactivated ledger account");
        Ok(ledger)
    }
}

/// Utility functions for working with the chart of accounts
pub mod utils {
    use super::*;

    /// Register the standard chart of a dairy cooperative society.
    /// Returns the accounts keyed by a stable handle for easy lookup.
    pub async fn create_dairy_chart<S: PostingStore>(
        registry: &LedgerRegistry<S>,
    ) -> LedgerResult<HashMap<String, Ledger>> {
        let mut accounts = HashMap::new();

        // Assets
        let cash = registry
            .register("Cash".to_string(), LedgerType::Asset, "Cash".to_string())
            .await?;
        accounts.insert("cash".to_string(), cash);

        let bank = registry
            .register("Bank".to_string(), LedgerType::Asset, "Bank".to_string())
            .await?;
        accounts.insert("bank".to_string(), bank);

        let feed_stock = registry
            .register(
                "Feed Stock".to_string(),
                LedgerType::Asset,
                "Stock".to_string(),
            )
            .await?;
        accounts.insert("feed_stock".to_string(), feed_stock);

        let loan_advance = registry
            .register(
                "Loan Advance".to_string(),
                LedgerType::Asset,
                "Advance".to_string(),
            )
            .await?;
        accounts.insert("loan_advance".to_string(), loan_advance);

        let cf_advance = registry
            .register(
                "CF Advance".to_string(),
                LedgerType::Asset,
                "Advance".to_string(),
            )
            .await?;
        accounts.insert("cf_advance".to_string(), cf_advance);

        let cash_advance = registry
            .register(
                "Cash Advance".to_string(),
                LedgerType::Asset,
                "Advance".to_string(),
            )
            .await?;
        accounts.insert("cash_advance".to_string(), cash_advance);

        // Capital
        let share_capital = registry
            .register(
                "Share Capital".to_string(),
                LedgerType::Capital,
                "Capital".to_string(),
            )
            .await?;
        accounts.insert("share_capital".to_string(), share_capital);

        let reserve_fund = registry
            .register(
                "Reserve Fund".to_string(),
                LedgerType::Capital,
                "Capital".to_string(),
            )
            .await?;
        accounts.insert("reserve_fund".to_string(), reserve_fund);

        // Liabilities
        let welfare_fund = registry
            .register(
                "Member Welfare Fund".to_string(),
                LedgerType::Liability,
                "Fund".to_string(),
            )
            .await?;
        accounts.insert("welfare_fund".to_string(), welfare_fund);

        // Income
        let milk_sales = registry
            .register(
                "Milk Sales".to_string(),
                LedgerType::Income,
                "Trading".to_string(),
            )
            .await?;
        accounts.insert("milk_sales".to_string(), milk_sales);

        let feed_sales = registry
            .register(
                "Feed Sales".to_string(),
                LedgerType::Income,
                "Trading".to_string(),
            )
            .await?;
        accounts.insert("feed_sales".to_string(), feed_sales);

        let interest_income = registry
            .register(
                "Interest Received".to_string(),
                LedgerType::Income,
                "Operating".to_string(),
            )
            .await?;
        accounts.insert("interest_income".to_string(), interest_income);

        let other_deductions = registry
            .register(
                "Other Deductions".to_string(),
                LedgerType::Income,
                "Other".to_string(),
            )
            .await?;
        accounts.insert("other_deductions".to_string(), other_deductions);

        // Expenses
        let milk_purchase = registry
            .register(
                "Milk Purchase".to_string(),
                LedgerType::Expense,
                "Trading".to_string(),
            )
            .await?;
        accounts.insert("milk_purchase".to_string(), milk_purchase);

        let feed_purchase = registry
            .register(
                "Feed Purchase".to_string(),
                LedgerType::Expense,
                "Trading".to_string(),
            )
            .await?;
        accounts.insert("feed_purchase".to_string(), feed_purchase);

        let transport_expense = registry
            .register(
                "Milk Transport".to_string(),
                LedgerType::Expense,
                "Trading".to_string(),
            )
            .await?;
        accounts.insert("transport_expense".to_string(), transport_expense);

        let salary_expense = registry
            .register(
                "Staff Salaries".to_string(),
                LedgerType::Expense,
                "Operating".to_string(),
            )
            .await?;
        accounts.insert("salary_expense".to_string(), salary_expense);

        let electricity_expense = registry
            .register(
                "Electricity".to_string(),
                LedgerType::Expense,
                "Operating".to_string(),
            )
            .await?;
        accounts.insert("electricity_expense".to_string(), electricity_expense);

        Ok(accounts)
    }
}
