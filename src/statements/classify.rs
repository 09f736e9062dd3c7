//! Ledger classification into financial statement sections

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Financial statement sections a ledger can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    /// Opening and closing stock on the trading account
    Stock,
    /// Purchases side of the trading account
    Purchases,
    /// Direct expenses on the trading account
    TradeExpense,
    /// Sales side of the trading account
    Sales,
    /// Direct income on the trading account
    TradeIncome,
    /// Indirect income on the profit and loss account
    Income,
    /// Indirect expenses on the profit and loss account
    Expense,
    /// Balance sheet assets
    Asset,
    /// Balance sheet liabilities
    Liability,
    /// Balance sheet capital
    Capital,
    /// Fallback for ledgers no rule matches; such ledgers are listed
    /// separately rather than dropped or treated as an error
    Other,
}

/// One classification rule. All predicates that are present must match;
/// string comparisons ignore case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    /// Required ledger type, if any
    pub ledger_type: Option<LedgerType>,
    /// Required category, compared case-insensitively
    pub category: Option<String>,
    /// Required name fragment, matched case-insensitively
    pub name_fragment: Option<String>,
    /// Section a matching ledger is routed to
    pub section: Section,
}

impl ClassifierRule {
    /// Rule with no predicates that routes everything to `section`
    pub fn to(section: Section) -> Self {
        Self {
            ledger_type: None,
            category: None,
            name_fragment: None,
            section,
        }
    }

    /// Require a ledger type
    pub fn of_type(mut self, ledger_type: LedgerType) -> Self {
        self.ledger_type = Some(ledger_type);
        self
    }

    /// Require a category
    pub fn in_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Require a name fragment
    pub fn named_like(mut self, fragment: &str) -> Self {
        self.name_fragment = Some(fragment.to_string());
        self
    }

    /// Whether the ledger satisfies every predicate of this rule
    pub fn matches(&self, ledger: &Ledger) -> bool {
        if let Some(ledger_type) = self.ledger_type {
            if ledger.ledger_type != ledger_type {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if !ledger.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref fragment) = self.name_fragment {
            if !ledger
                .name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Ordered rule table mapping ledgers to statement sections.
/// The first matching rule wins; ledgers no rule matches go to
/// `Section::Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    rules: Vec<ClassifierRule>,
}

impl Classifier {
    /// Build a classifier from an ordered rule list
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Rule table matching the standard dairy cooperative chart.
    /// Specific rules come before the per-type catch-alls.
    pub fn dairy() -> Self {
        Self::new(vec![
            ClassifierRule::to(Section::Stock).in_category("Stock"),
            ClassifierRule::to(Section::Purchases)
                .of_type(LedgerType::Expense)
                .named_like("purchase"),
            ClassifierRule::to(Section::TradeExpense)
                .of_type(LedgerType::Expense)
                .in_category("Trading"),
            ClassifierRule::to(Section::Sales)
                .of_type(LedgerType::Income)
                .named_like("sales"),
            ClassifierRule::to(Section::TradeIncome)
                .of_type(LedgerType::Income)
                .in_category("Trading"),
            ClassifierRule::to(Section::Asset).of_type(LedgerType::Asset),
            ClassifierRule::to(Section::Liability).of_type(LedgerType::Liability),
            ClassifierRule::to(Section::Capital).of_type(LedgerType::Capital),
            ClassifierRule::to(Section::Income).of_type(LedgerType::Income),
            ClassifierRule::to(Section::Expense).of_type(LedgerType::Expense),
        ])
    }

    /// Route a ledger to its statement section
    pub fn classify(&self, ledger: &Ledger) -> Section {
        self.rules
            .iter()
            .find(|rule| rule.matches(ledger))
            .map(|rule| rule.section)
            .unwrap_or(Section::Other)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::dairy()
    }
}
