//! Dairy cooperative bookkeeping walkthrough

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use dairy_ledger_core::utils::MemoryStore;
use dairy_ledger_core::{patterns, DairyBooks, Period, StatusFilter, VoucherBuilder, VoucherType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🥛 Dairy Ledger Core - Cooperative Books Example\n");

    let storage = MemoryStore::new();
    let books = DairyBooks::new(storage);

    // 1. Set up the cooperative chart of accounts
    println!("📊 Setting up the Chart of Accounts...");
    let chart = books.setup_dairy_chart().await?;

    let mut names: Vec<&String> = chart.values().map(|l| &l.name).collect();
    names.sort();
    for name in names {
        println!("  ✓ Registered: {name}");
    }
    println!();

    // 2. Post the month's vouchers
    println!("💰 Posting April Vouchers...\n");

    let capital = patterns::journal_entry(
        "J0001".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        "Share capital collected from members".to_string(),
        chart["cash"].id,
        chart["share_capital"].id,
        BigDecimal::from(50000),
    )?;
    books.post_voucher(capital).await?;
    println!("  ✓ Recorded: Share capital of ₹50,000");

    let milk_purchase = patterns::payment(
        "P0001".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 3).unwrap(),
        "Milk purchased from member farmers".to_string(),
        chart["milk_purchase"].id,
        chart["cash"].id,
        BigDecimal::from(28000),
    )?;
    books.post_voucher(milk_purchase).await?;
    println!("  ✓ Recorded: Milk purchase of ₹28,000");

    let milk_sale = patterns::receipt(
        "R0001".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        "Milk sold to the district union".to_string(),
        chart["cash"].id,
        chart["milk_sales"].id,
        BigDecimal::from(36000),
    )?;
    books.post_voucher(milk_sale).await?;
    println!("  ✓ Recorded: Milk sales of ₹36,000");

    let feed_purchase = patterns::payment(
        "P0002".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 8).unwrap(),
        "Cattle feed stock purchased".to_string(),
        chart["feed_purchase"].id,
        chart["cash"].id,
        BigDecimal::from(6000),
    )?;
    books.post_voucher(feed_purchase).await?;
    println!("  ✓ Recorded: Feed purchase of ₹6,000");

    let feed_sale = patterns::receipt(
        "R0002".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        "Cattle feed sold to members".to_string(),
        chart["cash"].id,
        chart["feed_sales"].id,
        BigDecimal::from(4500),
    )?;
    books.post_voucher(feed_sale).await?;
    println!("  ✓ Recorded: Feed sales of ₹4,500");

    let deposit = patterns::contra_transfer(
        "C0001".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 12).unwrap(),
        "Cash deposited into the bank".to_string(),
        chart["bank"].id,
        chart["cash"].id,
        BigDecimal::from(20000),
    )?;
    books.post_voucher(deposit).await?;
    println!("  ✓ Recorded: Bank deposit of ₹20,000");

    let transport = patterns::payment(
        "P0003".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
        "Milk van hire for the first fortnight".to_string(),
        chart["transport_expense"].id,
        chart["cash"].id,
        BigDecimal::from(1200),
    )?;
    books.post_voucher(transport).await?;
    println!("  ✓ Recorded: Transport charges of ₹1,200");

    // The builder covers vouchers the helpers do not
    let salaries = VoucherBuilder::new(
        VoucherType::Payment,
        NaiveDate::from_ymd_opt(2024, 4, 25).unwrap(),
        "P0004".to_string(),
        "April staff salaries".to_string(),
    )
    .debit(
        chart["salary_expense"].id,
        BigDecimal::from(3000),
        Some("Secretary and tester salary".to_string()),
    )
    .credit(chart["cash"].id, BigDecimal::from(3000), None)
    .build()?;
    books.post_voucher(salaries).await?;
    println!("  ✓ Recorded: Staff salaries of ₹3,000");

    let electricity = patterns::payment(
        "P0005".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 26).unwrap(),
        "Chilling plant electricity".to_string(),
        chart["electricity_expense"].id,
        chart["cash"].id,
        BigDecimal::from(700),
    )?;
    books.post_voucher(electricity).await?;
    println!("  ✓ Recorded: Electricity bill of ₹700");

    // 3. Cancel a wrongly entered voucher
    println!("\n🚫 Cancelling a Mistaken Entry...");
    let mistake = patterns::receipt(
        "R0099".to_string(),
        NaiveDate::from_ymd_opt(2024, 4, 27).unwrap(),
        "Milk sales receipts".to_string(),
        chart["cash"].id,
        chart["milk_sales"].id,
        BigDecimal::from(999),
    )?;
    let mistake = books.post_voucher(mistake).await?;
    books
        .cancel_voucher(mistake.id, "Entered twice by mistake")
        .await?;

    let april = Period::new(
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    )?;
    let active = books.vouchers_in(Some(april), StatusFilter::ActiveOnly).await?;
    let all = books.vouchers_in(Some(april), StatusFilter::All).await?;
    println!(
        "  ✓ Cancelled R0099; {} active vouchers, {} on file for audit",
        active.len(),
        all.len()
    );

    // 4. Cash book for the month
    println!("\n📒 Cash Book for April 2024:");
    let cash_book = books.cash_book(&chart["cash"], &april).await?;
    println!("  Opening: ₹{}", cash_book.opening);
    for line in &cash_book.lines {
        println!(
            "    {} {} {:>2} ₹{:>8}  (running ₹{})",
            line.date, line.voucher_number, line.side, line.amount, line.running
        );
    }
    println!("  Closing: ₹{}", cash_book.closing);

    // 5. Abstract of all ledger balances
    println!("\n📋 Abstract of Balances for April 2024:");
    let rows = books.abstract_all(&april).await?;
    for row in &rows {
        println!(
            "    {:<20} opening ₹{:>12}  Dr ₹{:>9}  Cr ₹{:>9}  closing ₹{:>12}",
            row.ledger.name,
            row.opening.to_string(),
            row.period_debit,
            row.period_credit,
            row.closing.to_string()
        );
    }

    // 6. Financial statements
    println!("\n📈 Trading Account for April 2024:");
    let trading = books.trading_account(&april).await?;
    println!("  Purchases:      ₹{}", trading.debit.purchases);
    println!("  Trade expenses: ₹{}", trading.debit.trade_expenses);
    println!("  Sales:          ₹{}", trading.credit.sales);
    match (&trading.debit.gross_profit, &trading.credit.gross_loss) {
        (Some(profit), _) => println!("  Gross Profit c/d: ₹{profit}"),
        (_, Some(loss)) => println!("  Gross Loss c/d:   ₹{loss}"),
        _ => println!("  Trading account closed level"),
    }

    println!("\n💹 Profit and Loss for April 2024:");
    let pnl = books.profit_and_loss(&april).await?;
    if let Some(gross) = &pnl.gross_profit_bf {
        println!("  Gross Profit b/f: ₹{gross}");
    }
    for line in &pnl.expenses {
        println!("  Expense: {:<20} ₹{}", line.name, line.amount);
    }
    println!("  Net Profit: ₹{}", pnl.net_profit);

    println!("\n📊 Balance Sheet as of April 30, 2024:");
    let sheet = books
        .balance_sheet(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap())
        .await?;
    for line in &sheet.assets {
        println!("  Asset:    {:<20} ₹{}", line.name, line.amount);
    }
    println!("  Total Assets:      ₹{}", sheet.total_assets);
    println!("  Total Capital:     ₹{}", sheet.total_capital);
    println!("  Net Profit:        ₹{}", sheet.net_profit);
    println!(
        "  Balanced: {}",
        if sheet.flagged { "❌ No" } else { "✅ Yes" }
    );

    // 7. Day book and integrity check
    let day_book = books.day_book(&april).await?;
    println!(
        "\n📗 Day Book: {} days, ₹{} debits = ₹{} credits",
        day_book.days.len(),
        day_book.total_debit,
        day_book.total_credit
    );

    let report = books.verify_books(&april).await?;
    println!(
        "🔍 Books consistent: {}",
        if report.is_consistent { "✅ Yes" } else { "❌ No" }
    );

    Ok(())
}
