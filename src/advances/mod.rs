//! Farmer advance accounts and milk payment settlement

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ledger::balance::BalanceAccumulator;
use crate::ledger::registry::LedgerRegistry;
use crate::ledger::voucher::{patterns, VoucherBuilder, VoucherManager};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_non_negative_amount, validate_positive_amount};

/// A farmer's outstanding advance balances, derived from tagged
/// postings. Grants raise a category, recoveries lower it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outstanding {
    pub farmer_id: String,
    pub loan_advance: BigDecimal,
    pub cf_advance: BigDecimal,
    pub cash_advance: BigDecimal,
}

impl Outstanding {
    /// All-zero outstanding for a farmer
    pub fn zero(farmer_id: &str) -> Self {
        Self {
            farmer_id: farmer_id.to_string(),
            loan_advance: BigDecimal::from(0),
            cf_advance: BigDecimal::from(0),
            cash_advance: BigDecimal::from(0),
        }
    }

    /// Outstanding in one category
    pub fn for_category(&self, category: AdvanceCategory) -> &BigDecimal {
        match category {
            AdvanceCategory::LoanAdvance => &self.loan_advance,
            AdvanceCategory::CfAdvance => &self.cf_advance,
            AdvanceCategory::CashAdvance => &self.cash_advance,
        }
    }

    /// Total outstanding across all categories
    pub fn total(&self) -> BigDecimal {
        &self.loan_advance + &self.cf_advance + &self.cash_advance
    }

    /// Outstanding left after applying a deduction request
    pub fn minus(&self, deductions: &DeductionRequest) -> Self {
        Self {
            farmer_id: self.farmer_id.clone(),
            loan_advance: &self.loan_advance - &deductions.loan_advance,
            cf_advance: &self.cf_advance - &deductions.cf_advance,
            cash_advance: &self.cash_advance - &deductions.cash_advance,
        }
    }
}

/// Recovery amounts requested per advance category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeductionRequest {
    pub loan_advance: BigDecimal,
    pub cf_advance: BigDecimal,
    pub cash_advance: BigDecimal,
}

impl DeductionRequest {
    /// Build a request with all three categories
    pub fn new(loan_advance: BigDecimal, cf_advance: BigDecimal, cash_advance: BigDecimal) -> Self {
        Self {
            loan_advance,
            cf_advance,
            cash_advance,
        }
    }

    /// Requested recovery in one category
    pub fn for_category(&self, category: AdvanceCategory) -> &BigDecimal {
        match category {
            AdvanceCategory::LoanAdvance => &self.loan_advance,
            AdvanceCategory::CfAdvance => &self.cf_advance,
            AdvanceCategory::CashAdvance => &self.cash_advance,
        }
    }

    /// Total requested recovery
    pub fn total(&self) -> BigDecimal {
        &self.loan_advance + &self.cf_advance + &self.cash_advance
    }
}

/// A milk payment settlement request for one farmer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilkPaymentRequest {
    pub farmer_id: String,
    pub date: NaiveDate,
    /// Number for the settlement voucher
    pub voucher_number: String,
    /// Gross value of milk supplied in the payment cycle
    pub milk_amount: BigDecimal,
    /// Welfare fund recovery withheld from the payment
    pub welfare_recovery: BigDecimal,
    /// Advance recoveries per category
    pub deductions: DeductionRequest,
    /// Miscellaneous deductions kept by the society
    pub other_deductions: BigDecimal,
    /// Voucher narration; a default is generated when absent
    pub narration: Option<String>,
}

/// Outcome of a committed settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSettlement {
    /// The single voucher the whole settlement was committed as
    pub voucher: Voucher,
    pub farmer_id: String,
    pub milk_amount: BigDecimal,
    pub welfare_recovery: BigDecimal,
    pub deductions: DeductionRequest,
    pub other_deductions: BigDecimal,
    /// Unsettled balance the farmer's ledger carried into this payment,
    /// positive when the farmer owed the society
    pub previous_balance: BigDecimal,
    /// Amount paid out in cash; zero or negative means nothing was paid
    /// and the shortfall stays on the farmer's ledger
    pub net_payable: BigDecimal,
    pub outstanding_before: Outstanding,
    pub outstanding_after: Outstanding,
}

/// The chart accounts a settlement posts against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementLedgers {
    pub milk_purchase: LedgerId,
    pub welfare_fund: LedgerId,
    pub other_deductions: LedgerId,
    pub cash: LedgerId,
    pub loan_advance: LedgerId,
    pub cf_advance: LedgerId,
    pub cash_advance: LedgerId,
}

impl SettlementLedgers {
    /// The advance ledger of one category
    pub fn advance_ledger(&self, category: AdvanceCategory) -> LedgerId {
        match category {
            AdvanceCategory::LoanAdvance => self.loan_advance,
            AdvanceCategory::CfAdvance => self.cf_advance,
            AdvanceCategory::CashAdvance => self.cash_advance,
        }
    }
}

/// Net amount payable to the farmer after every recovery.
/// Zero or negative means no cash changes hands.
pub fn net_payable(
    milk_amount: &BigDecimal,
    welfare_recovery: &BigDecimal,
    deductions: &DeductionRequest,
    other_deductions: &BigDecimal,
    previous_balance: &BigDecimal,
) -> BigDecimal {
    milk_amount - welfare_recovery - deductions.total() - other_deductions - previous_balance
}

/// Settles milk payments against farmer advance accounts.
///
/// A settlement runs gather, allocate, commit: read the farmer's
/// outstanding, check every requested recovery against it in the fixed
/// priority order, then commit the whole payment as one voucher. The
/// commit is serialized per farmer through a version check, and the
/// resolver retries a bounded number of times when another settlement
/// for the same farmer lands first.
pub struct WaterfallResolver<S: PostingStore> {
    storage: S,
    registry: LedgerRegistry<S>,
    vouchers: VoucherManager<S>,
    accumulator: BalanceAccumulator<S>,
    ledgers: SettlementLedgers,
    max_retries: u32,
}

impl<S: PostingStore + Clone> WaterfallResolver<S> {
    /// Create a resolver posting against the given chart accounts
    pub fn new(storage: S, ledgers: SettlementLedgers) -> Self {
        Self {
            registry: LedgerRegistry::new(storage.clone()),
            vouchers: VoucherManager::new(storage.clone()),
            accumulator: BalanceAccumulator::new(storage.clone()),
            storage,
            ledgers,
            max_retries: 3,
        }
    }

    /// Override the conflict retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Current outstanding of a farmer, derived from active tagged
    /// postings
    pub async fn outstanding(&self, farmer_id: &str) -> LedgerResult<Outstanding> {
        let records = self
            .storage
            .advance_postings(farmer_id, StatusFilter::ActiveOnly)
            .await?;

        let mut outstanding = Outstanding::zero(farmer_id);
        for record in &records {
            if let Some(tag) = &record.posting.advance {
                let signed = record.signed_amount();
                match tag.category {
                    AdvanceCategory::LoanAdvance => outstanding.loan_advance += signed,
                    AdvanceCategory::CfAdvance => outstanding.cf_advance += signed,
                    AdvanceCategory::CashAdvance => outstanding.cash_advance += signed,
                }
            }
        }
        Ok(outstanding)
    }

    /// Pay an advance out to a farmer, raising their outstanding in the
    /// category
    pub async fn grant_advance(
        &self,
        farmer_id: &str,
        category: AdvanceCategory,
        amount: BigDecimal,
        date: NaiveDate,
        number: String,
    ) -> LedgerResult<Voucher> {
        validate_positive_amount(&amount)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let version = self.storage.farmer_version(farmer_id).await?;
            let voucher = patterns::advance_grant(
                number.clone(),
                date,
                farmer_id.to_string(),
                category,
                self.ledgers.advance_ledger(category),
                self.ledgers.cash,
                amount.clone(),
            )?;
            match self
                .vouchers
                .post_serialized(voucher, farmer_id, version)
                .await
            {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    debug!(farmer = farmer_id, attempt, "Advance grant conflicted, retrying");
                    continue;
                }
                result => return result,
            }
        }
    }

    /// Settle a milk payment: recover welfare, advances, and other
    /// deductions from the milk value and pay out the rest.
    ///
    /// Either the whole settlement commits as one voucher or nothing is
    /// stored. Recoveries exceeding the outstanding in any category are
    /// rejected before anything is posted.
    pub async fn settle(&self, request: &MilkPaymentRequest) -> LedgerResult<PaymentSettlement> {
        validate_non_negative_amount(&request.milk_amount)?;
        validate_non_negative_amount(&request.welfare_recovery)?;
        validate_non_negative_amount(&request.deductions.loan_advance)?;
        validate_non_negative_amount(&request.deductions.cf_advance)?;
        validate_non_negative_amount(&request.deductions.cash_advance)?;
        validate_non_negative_amount(&request.other_deductions)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_settle(request).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    debug!(
                        farmer = %request.farmer_id,
                        attempt,
                        "Settlement conflicted, retrying"
                    );
                    continue;
                }
                result => return result,
            }
        }
    }

    async fn try_settle(&self, request: &MilkPaymentRequest) -> LedgerResult<PaymentSettlement> {
        // Gather
        let version = self.storage.farmer_version(&request.farmer_id).await?;
        let outstanding_before = self.outstanding(&request.farmer_id).await?;
        let farmer_ledger = self
            .registry
            .ensure(
                &format!("Farmer {}", request.farmer_id),
                LedgerType::Liability,
                "Member",
            )
            .await?;
        let previous_balance = self
            .accumulator
            .current_balance(&farmer_ledger)
            .await?
            .signed_on(Side::Debit);

        // Allocate, walking the categories in priority order
        for category in AdvanceCategory::PRIORITY {
            let requested = request.deductions.for_category(category);
            let available = outstanding_before.for_category(category);
            if requested > available {
                return Err(LedgerError::DeductionExceedsOutstanding {
                    farmer_id: request.farmer_id.clone(),
                    category,
                    requested: requested.clone(),
                    available: available.clone(),
                });
            }
        }

        let net = net_payable(
            &request.milk_amount,
            &request.welfare_recovery,
            &request.deductions,
            &request.other_deductions,
            &previous_balance,
        );

        let narration = request.narration.clone().unwrap_or_else(|| {
            format!("Milk payment settlement for farmer {}", request.farmer_id)
        });
        let mut builder = VoucherBuilder::new(
            VoucherType::Payment,
            request.date,
            request.voucher_number.clone(),
            narration,
        );

        let zero = BigDecimal::from(0);
        let mut has_legs = false;

        if request.milk_amount > zero {
            builder = builder
                .debit(
                    self.ledgers.milk_purchase,
                    request.milk_amount.clone(),
                    Some("Milk supplied".to_string()),
                )
                .credit(farmer_ledger.id, request.milk_amount.clone(), None);
            has_legs = true;
        }
        if request.welfare_recovery > zero {
            builder = builder
                .debit(farmer_ledger.id, request.welfare_recovery.clone(), None)
                .credit(
                    self.ledgers.welfare_fund,
                    request.welfare_recovery.clone(),
                    Some("Welfare fund recovery".to_string()),
                );
            has_legs = true;
        }
        for category in AdvanceCategory::PRIORITY {
            let amount = request.deductions.for_category(category);
            if *amount > zero {
                builder = builder.debit(farmer_ledger.id, amount.clone(), None).posting(
                    Posting::credit(
                        self.ledgers.advance_ledger(category),
                        amount.clone(),
                        Some(format!("{} recovery", category)),
                    )
                    .with_advance(request.farmer_id.clone(), category),
                );
                has_legs = true;
            }
        }
        if request.other_deductions > zero {
            builder = builder
                .debit(farmer_ledger.id, request.other_deductions.clone(), None)
                .credit(
                    self.ledgers.other_deductions,
                    request.other_deductions.clone(),
                    Some("Other deductions".to_string()),
                );
            has_legs = true;
        }
        if net > zero {
            builder = builder
                .debit(
                    farmer_ledger.id,
                    net.clone(),
                    Some("Net milk payment".to_string()),
                )
                .credit(self.ledgers.cash, net.clone(), None);
            has_legs = true;
        }

        if !has_legs {
            return Err(LedgerError::Validation(
                "Nothing to settle: all amounts are zero".to_string(),
            ));
        }

        // Commit as one voucher, serialized on the farmer's version
        let voucher = builder.build()?;
        let voucher = self
            .vouchers
            .post_serialized(voucher, &request.farmer_id, version)
            .await?;

        let outstanding_after = outstanding_before.minus(&request.deductions);
        debug_assert!(outstanding_after.loan_advance >= zero);
        debug_assert!(outstanding_after.cf_advance >= zero);
        debug_assert!(outstanding_after.cash_advance >= zero);

        info!(
            farmer = %request.farmer_id,
            voucher = %voucher.number,
            milk = %request.milk_amount,
            recovered = %request.deductions.total(),
            net = %net,
            "Settled milk payment"
        );

        Ok(PaymentSettlement {
            voucher,
            farmer_id: request.farmer_id.clone(),
            milk_amount: request.milk_amount.clone(),
            welfare_recovery: request.welfare_recovery.clone(),
            deductions: request.deductions.clone(),
            other_deductions: request.other_deductions.clone(),
            previous_balance,
            net_payable: net,
            outstanding_before,
            outstanding_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::registry::utils::create_dairy_chart;
    use crate::utils::MemoryStore;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (MemoryStore, WaterfallResolver<MemoryStore>, HashMap<String, Ledger>) {
        let storage = MemoryStore::new();
        let registry = LedgerRegistry::new(storage.clone());
        let chart = create_dairy_chart(&registry).await.unwrap();
        let ledgers = SettlementLedgers {
            milk_purchase: chart["milk_purchase"].id,
            welfare_fund: chart["welfare_fund"].id,
            other_deductions: chart["other_deductions"].id,
            cash: chart["cash"].id,
            loan_advance: chart["loan_advance"].id,
            cf_advance: chart["cf_advance"].id,
            cash_advance: chart["cash_advance"].id,
        };
        let resolver = WaterfallResolver::new(storage.clone(), ledgers);
        (storage, resolver, chart)
    }

    #[test]
    fn test_net_payable_formula() {
        let deductions = DeductionRequest::new(
            BigDecimal::from(100),
            BigDecimal::from(50),
            BigDecimal::from(0),
        );
        let net = net_payable(
            &BigDecimal::from(1000),
            &BigDecimal::from(50),
            &deductions,
            &BigDecimal::from(25),
            &BigDecimal::from(10),
        );
        assert_eq!(net, BigDecimal::from(765));
    }

    #[tokio::test]
    async fn test_grants_accumulate_outstanding() {
        let (_storage, resolver, _chart) = setup().await;

        resolver
            .grant_advance(
                "F001",
                AdvanceCategory::LoanAdvance,
                BigDecimal::from(300),
                date(2024, 4, 1),
                "P0001".to_string(),
            )
            .await
            .unwrap();
        resolver
            .grant_advance(
                "F001",
                AdvanceCategory::CfAdvance,
                BigDecimal::from(150),
                date(2024, 4, 2),
                "P0002".to_string(),
            )
            .await
            .unwrap();

        let outstanding = resolver.outstanding("F001").await.unwrap();
        assert_eq!(outstanding.loan_advance, BigDecimal::from(300));
        assert_eq!(outstanding.cf_advance, BigDecimal::from(150));
        assert_eq!(outstanding.cash_advance, BigDecimal::from(0));
        assert_eq!(outstanding.total(), BigDecimal::from(450));

        // Another farmer's books are untouched
        let other = resolver.outstanding("F002").await.unwrap();
        assert_eq!(other.total(), BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_over_deduction_rejected_and_nothing_committed() {
        let (storage, resolver, _chart) = setup().await;

        resolver
            .grant_advance(
                "F001",
                AdvanceCategory::LoanAdvance,
                BigDecimal::from(300),
                date(2024, 4, 1),
                "P0001".to_string(),
            )
            .await
            .unwrap();
        resolver
            .grant_advance(
                "F001",
                AdvanceCategory::CfAdvance,
                BigDecimal::from(150),
                date(2024, 4, 2),
                "P0002".to_string(),
            )
            .await
            .unwrap();

        let request = MilkPaymentRequest {
            farmer_id: "F001".to_string(),
            date: date(2024, 4, 15),
            voucher_number: "P0003".to_string(),
            milk_amount: BigDecimal::from(1000),
            welfare_recovery: BigDecimal::from(0),
            deductions: DeductionRequest::new(
                BigDecimal::from(300),
                BigDecimal::from(100),
                BigDecimal::from(50),
            ),
            other_deductions: BigDecimal::from(0),
            narration: None,
        };

        match resolver.settle(&request).await {
            Err(LedgerError::DeductionExceedsOutstanding {
                farmer_id,
                category,
                requested,
                available,
            }) => {
                assert_eq!(farmer_id, "F001");
                assert_eq!(category, AdvanceCategory::CashAdvance);
                assert_eq!(requested, BigDecimal::from(50));
                assert_eq!(available, BigDecimal::from(0));
            }
            other => panic!("expected DeductionExceedsOutstanding, got {:?}", other),
        }

        // Outstanding is unchanged and no settlement voucher was stored
        let outstanding = resolver.outstanding("F001").await.unwrap();
        assert_eq!(outstanding.loan_advance, BigDecimal::from(300));
        assert_eq!(outstanding.cf_advance, BigDecimal::from(150));
        let stored = storage
            .vouchers_in(None, StatusFilter::All)
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_settlement_builds_one_balanced_voucher() {
        let (storage, resolver, chart) = setup().await;

        resolver
            .grant_advance(
                "F001",
                AdvanceCategory::LoanAdvance,
                BigDecimal::from(300),
                date(2024, 4, 1),
                "P0001".to_string(),
            )
            .await
            .unwrap();

        let request = MilkPaymentRequest {
            farmer_id: "F001".to_string(),
            date: date(2024, 4, 15),
            voucher_number: "P0002".to_string(),
            milk_amount: BigDecimal::from(1000),
            welfare_recovery: BigDecimal::from(50),
            deductions: DeductionRequest::new(
                BigDecimal::from(100),
                BigDecimal::from(0),
                BigDecimal::from(0),
            ),
            other_deductions: BigDecimal::from(25),
            narration: None,
        };
        let settlement = resolver.settle(&request).await.unwrap();

        assert_eq!(settlement.net_payable, BigDecimal::from(825));
        assert_eq!(settlement.previous_balance, BigDecimal::from(0));
        assert_eq!(settlement.outstanding_before.loan_advance, BigDecimal::from(300));
        assert_eq!(settlement.outstanding_after.loan_advance, BigDecimal::from(200));

        let voucher = &settlement.voucher;
        assert_eq!(voucher.total_debits(), voucher.total_credits());
        assert_eq!(voucher.total_debits(), BigDecimal::from(2000));

        // The advance recovery leg carries the farmer tag
        let tagged: Vec<_> = voucher
            .postings
            .iter()
            .filter(|p| p.advance.is_some())
            .collect();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].side, Side::Credit);
        assert_eq!(tagged[0].amount, BigDecimal::from(100));

        // Derived outstanding agrees with the arithmetic after figure
        let outstanding = resolver.outstanding("F001").await.unwrap();
        assert_eq!(outstanding.loan_advance, BigDecimal::from(200));

        // The farmer ledger nets to zero on a full payout
        let registry = LedgerRegistry::new(storage.clone());
        let farmer_ledger = registry.resolve("Farmer F001").await.unwrap();
        let accumulator = BalanceAccumulator::new(storage.clone());
        let balance = accumulator.current_balance(&farmer_ledger).await.unwrap();
        assert!(balance.is_zero());
        let _ = chart;
    }

    #[tokio::test]
    async fn test_shortfall_carries_on_farmer_ledger() {
        let (storage, resolver, _chart) = setup().await;

        resolver
            .grant_advance(
                "F001",
                AdvanceCategory::LoanAdvance,
                BigDecimal::from(300),
                date(2024, 4, 1),
                "P0001".to_string(),
            )
            .await
            .unwrap();

        // Recover more than the milk is worth: 150 against 100 of milk
        let request = MilkPaymentRequest {
            farmer_id: "F001".to_string(),
            date: date(2024, 4, 15),
            voucher_number: "P0002".to_string(),
            milk_amount: BigDecimal::from(100),
            welfare_recovery: BigDecimal::from(0),
            deductions: DeductionRequest::new(
                BigDecimal::from(150),
                BigDecimal::from(0),
                BigDecimal::from(0),
            ),
            other_deductions: BigDecimal::from(0),
            narration: None,
        };
        let settlement = resolver.settle(&request).await.unwrap();

        assert_eq!(settlement.net_payable, BigDecimal::from(-50));
        // No cash leg on a shortfall
        let cash_legs = settlement
            .voucher
            .postings
            .iter()
            .filter(|p| p.ledger_id == resolver.ledgers.cash)
            .count();
        assert_eq!(cash_legs, 0);

        // The farmer now owes the society 50, shown as a debit balance
        // on their liability ledger
        let registry = LedgerRegistry::new(storage.clone());
        let farmer_ledger = registry.resolve("Farmer F001").await.unwrap();
        let accumulator = BalanceAccumulator::new(storage.clone());
        let balance = accumulator.current_balance(&farmer_ledger).await.unwrap();
        assert_eq!(balance.amount, BigDecimal::from(50));
        assert_eq!(balance.side, Side::Debit);

        // The next settlement recovers the carried balance first
        let next = MilkPaymentRequest {
            farmer_id: "F001".to_string(),
            date: date(2024, 4, 30),
            voucher_number: "P0003".to_string(),
            milk_amount: BigDecimal::from(200),
            welfare_recovery: BigDecimal::from(0),
            deductions: DeductionRequest::default(),
            other_deductions: BigDecimal::from(0),
            narration: None,
        };
        let settlement = resolver.settle(&next).await.unwrap();
        assert_eq!(settlement.previous_balance, BigDecimal::from(50));
        assert_eq!(settlement.net_payable, BigDecimal::from(150));
    }

    #[tokio::test]
    async fn test_nothing_to_settle_rejected() {
        let (_storage, resolver, _chart) = setup().await;

        let request = MilkPaymentRequest {
            farmer_id: "F001".to_string(),
            date: date(2024, 4, 15),
            voucher_number: "P0001".to_string(),
            milk_amount: BigDecimal::from(0),
            welfare_recovery: BigDecimal::from(0),
            deductions: DeductionRequest::default(),
            other_deductions: BigDecimal::from(0),
            narration: None,
        };
        assert!(matches!(
            resolver.settle(&request).await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let (_storage, resolver, _chart) = setup().await;

        let request = MilkPaymentRequest {
            farmer_id: "F001".to_string(),
            date: date(2024, 4, 15),
            voucher_number: "P0001".to_string(),
            milk_amount: BigDecimal::from(100),
            welfare_recovery: BigDecimal::from(-5),
            deductions: DeductionRequest::default(),
            other_deductions: BigDecimal::from(0),
            narration: None,
        };
        assert!(matches!(
            resolver.settle(&request).await,
            Err(LedgerError::Validation(_))
        ));
    }
}
