//! Trading account, profit and loss, and balance sheet

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ledger::balance::BalanceAccumulator;
use crate::statements::classify::{Classifier, Section};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::within_epsilon;

/// One ledger line on a statement. The amount is signed positive on the
/// side its section is shown on, so an abnormal balance comes through
/// negative instead of being clamped or moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub ledger_id: LedgerId,
    pub name: String,
    pub category: String,
    pub section: Section,
    pub amount: BigDecimal,
}

/// Debit side of the trading account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDebitSide {
    pub opening_stock: BigDecimal,
    pub purchases: BigDecimal,
    pub trade_expenses: BigDecimal,
    /// Balancing figure when the credit side is heavier
    pub gross_profit: Option<BigDecimal>,
    pub total: BigDecimal,
}

/// Credit side of the trading account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingCreditSide {
    pub sales: BigDecimal,
    pub trade_income: BigDecimal,
    pub closing_stock: BigDecimal,
    /// Balancing figure when the debit side is heavier
    pub gross_loss: Option<BigDecimal>,
    pub total: BigDecimal,
}

/// Trading account in T form. The gross result is purely the figure
/// that balances the two sides; it is never computed elsewhere and
/// forced in, so both totals always agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingAccount {
    pub period: Period,
    pub debit: TradingDebitSide,
    pub credit: TradingCreditSide,
}

impl TradingAccount {
    /// Gross result signed positive for profit, negative for loss
    pub fn gross_result(&self) -> BigDecimal {
        match (&self.debit.gross_profit, &self.credit.gross_loss) {
            (Some(profit), _) => profit.clone(),
            (_, Some(loss)) => -loss,
            _ => BigDecimal::from(0),
        }
    }
}

/// Profit and loss account for a period, opened with the gross result
/// brought forward from the trading account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub period: Period,
    /// Gross profit brought forward onto the income side
    pub gross_profit_bf: Option<BigDecimal>,
    /// Gross loss brought forward onto the expense side
    pub gross_loss_bf: Option<BigDecimal>,
    pub income: Vec<StatementLine>,
    pub expenses: Vec<StatementLine>,
    /// Income lines plus any gross profit brought forward
    pub total_income: BigDecimal,
    /// Expense lines plus any gross loss brought forward
    pub total_expense: BigDecimal,
    /// Positive for net profit, negative for net loss
    pub net_profit: BigDecimal,
}

/// Balance sheet as of a date.
///
/// `imbalance` is the accounting identity residual. A non-zero value
/// beyond the rounding tolerance sets `flagged`; the statement is still
/// returned so the books can be inspected, never refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub assets: Vec<StatementLine>,
    pub liabilities: Vec<StatementLine>,
    pub capital: Vec<StatementLine>,
    /// Ledgers no classification rule matched, listed for visibility
    /// and excluded from the totals
    pub unclassified: Vec<StatementLine>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_capital: BigDecimal,
    /// Accumulated surplus to date, derived from the income and expense
    /// ledger balances as of the same date
    pub net_profit: BigDecimal,
    /// Assets minus liabilities, capital, and accumulated surplus
    pub imbalance: BigDecimal,
    /// Whether the imbalance exceeds the rounding tolerance
    pub flagged: bool,
}

/// Builds financial statements from derived balances and the
/// classification rule table
pub struct StatementBuilder<S: PostingStore> {
    accumulator: BalanceAccumulator<S>,
    classifier: Classifier,
}

impl<S: PostingStore> StatementBuilder<S> {
    /// Create a statement builder with the dairy rule table
    pub fn new(storage: S) -> Self {
        Self {
            accumulator: BalanceAccumulator::new(storage),
            classifier: Classifier::dairy(),
        }
    }

    /// Create a statement builder with a custom rule table
    pub fn with_classifier(storage: S, classifier: Classifier) -> Self {
        Self {
            accumulator: BalanceAccumulator::new(storage),
            classifier,
        }
    }

    /// Trading account for the period
    pub async fn trading_account(&self, period: &Period) -> LedgerResult<TradingAccount> {
        let snapshots = self.accumulator.abstract_all(period).await?;
        Ok(trading_from_snapshots(&self.classifier, &snapshots, *period))
    }

    /// Profit and loss account for the period, with the trading result
    /// brought forward
    pub async fn profit_and_loss(&self, period: &Period) -> LedgerResult<ProfitAndLoss> {
        let snapshots = self.accumulator.abstract_all(period).await?;
        let trading = trading_from_snapshots(&self.classifier, &snapshots, *period);

        let zero = BigDecimal::from(0);
        let mut income = Vec::new();
        let mut expenses = Vec::new();

        for snapshot in &snapshots {
            // Carry-forward rows with no movement in the window stay off
            // the period statement
            if snapshot.period_debit == zero && snapshot.period_credit == zero {
                continue;
            }
            match self.classifier.classify(&snapshot.ledger) {
                Section::Income => income.push(line_for(
                    snapshot,
                    Section::Income,
                    &snapshot.period_credit - &snapshot.period_debit,
                )),
                Section::Expense => expenses.push(line_for(
                    snapshot,
                    Section::Expense,
                    &snapshot.period_debit - &snapshot.period_credit,
                )),
                _ => {}
            }
        }

        let mut total_income: BigDecimal = income.iter().map(|l| &l.amount).sum();
        let mut total_expense: BigDecimal = expenses.iter().map(|l| &l.amount).sum();
        if let Some(ref profit) = trading.debit.gross_profit {
            total_income += profit;
        }
        if let Some(ref loss) = trading.credit.gross_loss {
            total_expense += loss;
        }
        let net_profit = &total_income - &total_expense;

        Ok(ProfitAndLoss {
            period: *period,
            gross_profit_bf: trading.debit.gross_profit.clone(),
            gross_loss_bf: trading.credit.gross_loss.clone(),
            income,
            expenses,
            total_income,
            total_expense,
            net_profit,
        })
    }

    /// Balance sheet as of a date. Income and expense balances to date
    /// are folded into accumulated surplus, so the identity holds
    /// exactly whenever the posting log is balanced and fully
    /// classified.
    pub async fn balance_sheet(&self, as_of: NaiveDate) -> LedgerResult<BalanceSheet> {
        let balances = self.accumulator.all_balances_as_of(as_of).await?;

        let zero = BigDecimal::from(0);
        let mut assets = Vec::new();
        let mut liabilities = Vec::new();
        let mut capital = Vec::new();
        let mut unclassified = Vec::new();
        let mut net_profit = BigDecimal::from(0);

        for (ledger, balance) in &balances {
            let section = self.classifier.classify(ledger);
            let line = |section: Section, amount: BigDecimal| StatementLine {
                ledger_id: ledger.id,
                name: ledger.name.clone(),
                category: ledger.category.clone(),
                section,
                amount,
            };
            match section {
                Section::Asset | Section::Stock => {
                    let amount = balance.signed();
                    if amount != zero {
                        assets.push(line(section, amount));
                    }
                }
                Section::Liability => {
                    let amount = balance.signed_on(Side::Credit);
                    if amount != zero {
                        liabilities.push(line(section, amount));
                    }
                }
                Section::Capital => {
                    let amount = balance.signed_on(Side::Credit);
                    if amount != zero {
                        capital.push(line(section, amount));
                    }
                }
                Section::Other => {
                    let amount = balance.signed();
                    if amount != zero {
                        unclassified.push(line(section, amount));
                    }
                }
                // Nominal sections fold into accumulated surplus
                Section::Income
                | Section::Expense
                | Section::Sales
                | Section::TradeIncome
                | Section::Purchases
                | Section::TradeExpense => {
                    net_profit += balance.signed_on(Side::Credit);
                }
            }
        }

        let total_assets: BigDecimal = assets.iter().map(|l| &l.amount).sum();
        let total_liabilities: BigDecimal = liabilities.iter().map(|l| &l.amount).sum();
        let total_capital: BigDecimal = capital.iter().map(|l| &l.amount).sum();
        let claims = &total_liabilities + &total_capital + &net_profit;
        let imbalance = &total_assets - &claims;
        let flagged = !within_epsilon(&total_assets, &claims);
        if flagged {
            warn!(as_of = %as_of, imbalance = %imbalance, "Balance sheet does not balance");
        }

        Ok(BalanceSheet {
            as_of,
            assets,
            liabilities,
            capital,
            unclassified,
            total_assets,
            total_liabilities,
            total_capital,
            net_profit,
            imbalance,
            flagged,
        })
    }
}

fn line_for(snapshot: &BalanceSnapshot, section: Section, amount: BigDecimal) -> StatementLine {
    StatementLine {
        ledger_id: snapshot.ledger.id,
        name: snapshot.ledger.name.clone(),
        category: snapshot.ledger.category.clone(),
        section,
        amount,
    }
}

fn trading_from_snapshots(
    classifier: &Classifier,
    snapshots: &[BalanceSnapshot],
    period: Period,
) -> TradingAccount {
    let mut opening_stock = BigDecimal::from(0);
    let mut closing_stock = BigDecimal::from(0);
    let mut purchases = BigDecimal::from(0);
    let mut trade_expenses = BigDecimal::from(0);
    let mut sales = BigDecimal::from(0);
    let mut trade_income = BigDecimal::from(0);

    for snapshot in snapshots {
        match classifier.classify(&snapshot.ledger) {
            Section::Stock => {
                opening_stock += snapshot.opening.signed();
                closing_stock += snapshot.closing.signed();
            }
            Section::Purchases => {
                purchases += &snapshot.period_debit - &snapshot.period_credit;
            }
            Section::TradeExpense => {
                trade_expenses += &snapshot.period_debit - &snapshot.period_credit;
            }
            Section::Sales => {
                sales += &snapshot.period_credit - &snapshot.period_debit;
            }
            Section::TradeIncome => {
                trade_income += &snapshot.period_credit - &snapshot.period_debit;
            }
            _ => {}
        }
    }

    let debit_raw = &opening_stock + &purchases + &trade_expenses;
    let credit_raw = &sales + &trade_income + &closing_stock;
    let diff = &credit_raw - &debit_raw;

    let zero = BigDecimal::from(0);
    let (gross_profit, gross_loss) = if diff > zero {
        (Some(diff.clone()), None)
    } else if diff < zero {
        (None, Some(diff.abs()))
    } else {
        (None, None)
    };

    let debit_total = match &gross_profit {
        Some(profit) => &debit_raw + profit,
        None => debit_raw.clone(),
    };
    let credit_total = match &gross_loss {
        Some(loss) => &credit_raw + loss,
        None => credit_raw.clone(),
    };

    TradingAccount {
        period,
        debit: TradingDebitSide {
            opening_stock,
            purchases,
            trade_expenses,
            gross_profit,
            total: debit_total,
        },
        credit: TradingCreditSide {
            sales,
            trade_income,
            closing_stock,
            gross_loss,
            total: credit_total,
        },
    }
}
