//! Milk payment settlement walkthrough

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use dairy_ledger_core::utils::MemoryStore;
use dairy_ledger_core::{
    AdvanceCategory, DairyBooks, DeductionRequest, MilkPaymentRequest, Period, SettlementLedgers,
};
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🥛 Dairy Ledger Core - Milk Payment Settlement Example\n");

    let storage = MemoryStore::new();
    let books = DairyBooks::new(storage);
    let chart = books.setup_dairy_chart().await?;

    let resolver = books.payment_resolver(SettlementLedgers {
        milk_purchase: chart["milk_purchase"].id,
        welfare_fund: chart["welfare_fund"].id,
        other_deductions: chart["other_deductions"].id,
        cash: chart["cash"].id,
        loan_advance: chart["loan_advance"].id,
        cf_advance: chart["cf_advance"].id,
        cash_advance: chart["cash_advance"].id,
    });

    // 1. Grant advances to the farmer
    println!("🏦 Granting Advances to Farmer F042...");
    resolver
        .grant_advance(
            "F042",
            AdvanceCategory::LoanAdvance,
            BigDecimal::from(5000),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            "GA0001".to_string(),
        )
        .await?;
    println!("  ✓ Loan advance of ₹5,000 granted");

    resolver
        .grant_advance(
            "F042",
            AdvanceCategory::CfAdvance,
            BigDecimal::from(1500),
            NaiveDate::from_ymd_opt(2024, 4, 3).unwrap(),
            "GA0002".to_string(),
        )
        .await?;
    println!("  ✓ CF advance of ₹1,500 granted");

    let outstanding = resolver.outstanding("F042").await?;
    println!("\n  Outstanding for F042:");
    println!("    Loan Advance: ₹{}", outstanding.loan_advance);
    println!("    CF Advance:   ₹{}", outstanding.cf_advance);
    println!("    Cash Advance: ₹{}", outstanding.cash_advance);
    println!("    Total:        ₹{}", outstanding.total());

    // 2. Settle the first fortnight's milk payment
    println!("\n💰 Settling the First Fortnight...");
    let request = MilkPaymentRequest {
        farmer_id: "F042".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
        voucher_number: "MP0001".to_string(),
        milk_amount: BigDecimal::from(7200),
        welfare_recovery: BigDecimal::from(100),
        deductions: DeductionRequest::new(
            BigDecimal::from(1000),
            BigDecimal::from(500),
            BigDecimal::from(0),
        ),
        other_deductions: BigDecimal::from(150),
        narration: None,
    };
    let settlement = resolver.settle(&request).await?;

    println!("  Milk value:        ₹{}", settlement.milk_amount);
    println!("  Welfare recovery:  ₹{}", settlement.welfare_recovery);
    println!("  Advance recovery:  ₹{}", settlement.deductions.total());
    println!("  Other deductions:  ₹{}", settlement.other_deductions);
    println!("  Net paid in cash:  ₹{}", settlement.net_payable);

    let mut names: HashMap<_, _> = HashMap::new();
    for ledger in books.list_ledgers().await? {
        names.insert(ledger.id, ledger.name);
    }
    println!("\n  Voucher {} lines:", settlement.voucher.number);
    for posting in &settlement.voucher.postings {
        println!(
            "    {} ₹{:>7}  {}",
            posting.side,
            posting.amount.to_string(),
            names.get(&posting.ledger_id).map(String::as_str).unwrap_or("?")
        );
    }

    let outstanding = resolver.outstanding("F042").await?;
    println!("\n  Outstanding after settlement:");
    println!("    Loan Advance: ₹{}", outstanding.loan_advance);
    println!("    CF Advance:   ₹{}", outstanding.cf_advance);

    // 3. A recovery beyond the outstanding is refused
    println!("\n🚫 Trying to Recover More Than Outstanding...");
    let over = MilkPaymentRequest {
        farmer_id: "F042".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 4, 18).unwrap(),
        voucher_number: "MP0099".to_string(),
        milk_amount: BigDecimal::from(5000),
        welfare_recovery: BigDecimal::from(0),
        deductions: DeductionRequest::new(
            BigDecimal::from(9000),
            BigDecimal::from(0),
            BigDecimal::from(0),
        ),
        other_deductions: BigDecimal::from(0),
        narration: None,
    };
    match resolver.settle(&over).await {
        Err(e) => println!("  ✗ Rejected: {e}"),
        Ok(_) => println!("  Unexpected success"),
    }

    // 4. A lean fortnight leaves a shortfall on the farmer's ledger
    println!("\n📉 Settling a Lean Fortnight...");
    let lean = MilkPaymentRequest {
        farmer_id: "F042".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 4, 20).unwrap(),
        voucher_number: "MP0002".to_string(),
        milk_amount: BigDecimal::from(600),
        welfare_recovery: BigDecimal::from(0),
        deductions: DeductionRequest::new(
            BigDecimal::from(1000),
            BigDecimal::from(0),
            BigDecimal::from(0),
        ),
        other_deductions: BigDecimal::from(0),
        narration: None,
    };
    let settlement = resolver.settle(&lean).await?;
    println!("  Net payable: ₹{}", settlement.net_payable);
    println!("  No cash paid out; the shortfall stays on the farmer's ledger");

    let farmer_ledger = books.resolve_ledger("Farmer F042").await?;
    let carried = books.current_balance(&farmer_ledger).await?;
    println!("  Farmer ledger balance: ₹{carried}");

    // 5. The next payment clears the carried shortfall first
    println!("\n💰 Settling the Next Fortnight...");
    let next = MilkPaymentRequest {
        farmer_id: "F042".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        voucher_number: "MP0003".to_string(),
        milk_amount: BigDecimal::from(2000),
        welfare_recovery: BigDecimal::from(0),
        deductions: DeductionRequest::default(),
        other_deductions: BigDecimal::from(0),
        narration: None,
    };
    let settlement = resolver.settle(&next).await?;
    println!("  Previous balance recovered: ₹{}", settlement.previous_balance);
    println!("  Net paid in cash:           ₹{}", settlement.net_payable);

    let carried = books.current_balance(&farmer_ledger).await?;
    println!("  Farmer ledger balance now:  ₹{carried}");

    // 6. The books stay balanced through it all
    let april = Period::new(
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    )?;
    let report = books.verify_books(&april).await?;
    println!(
        "\n🔍 Books consistent: {}",
        if report.is_consistent { "✅ Yes" } else { "❌ No" }
    );

    let outstanding = resolver.outstanding("F042").await?;
    println!("📋 Final outstanding for F042: ₹{}", outstanding.total());

    Ok(())
}
