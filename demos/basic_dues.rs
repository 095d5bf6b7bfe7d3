//! Basic dues ledger usage example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use dues_ledger::utils::MemoryStore;
use dues_ledger::{
    CreateMemberRequest, CreateOutcome, DuplicatePolicy, Ledger, LedgerConfig, MemberDetails,
    Month, UserType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Dues Ledger - Basic Example\n");

    let config = LedgerConfig::from_json(r#"{ "year_range": { "start": 2024, "end": 2026 } }"#)?;
    let mut ledger = Ledger::with_config(MemoryStore::new(), config)?;
    let mut roster = ledger.load_roster().await?;

    // 1. Register members
    println!("Registering members...");
    let jane = CreateMemberRequest::new(MemberDetails::new(
        "Jane",
        "Doe",
        "555-0100",
        UserType::Single,
    ));
    let lees = CreateMemberRequest::new(
        MemberDetails::new("Ann", "Lee", "555-0101", UserType::Family)
            .with_spouse("Bo Lee")
            .with_address("Main St 1", "10115", "Berlin"),
    )
    .paid(2024, Month::January)
    .paid(2024, Month::February)
    .previously_paid(BigDecimal::from(50));

    for request in [jane, lees] {
        if let CreateOutcome::Created(member) =
            ledger.create_member_in(&mut roster, request, DuplicatePolicy::Warn).await?
        {
            println!(
                "  Created {} ({}) with total {}",
                member.full_name(),
                member.user_type(),
                member.total_amount_paid
            );
        }
    }

    // 2. A second "Jane Doe" triggers the advisory duplicate check
    let twin = CreateMemberRequest::new(MemberDetails::new(
        "jane",
        "doe",
        "555-0199",
        UserType::Single,
    ));
    if let CreateOutcome::DuplicateWarning(warning) = ledger
        .create_member_in(&mut roster, twin, DuplicatePolicy::Warn)
        .await?
    {
        println!(
            "\n  Skipped: {} {} already exists ({} record)",
            warning.first_name,
            warning.last_name,
            warning.existing_ids.len()
        );
    }

    // 3. Record monthly payments
    println!("\nRecording payments...");
    let jane_id = roster
        .search("jane doe")
        .first()
        .map(|m| m.id.clone())
        .ok_or("Jane Doe missing from roster")?;
    for month in [Month::July, Month::August] {
        let member = ledger
            .toggle_month_paid_in(&mut roster, &jane_id, 2024, month)
            .await?;
        println!("  {} {} paid, total now {}", month, 2024, member.total_amount_paid);
    }

    // 4. Reports
    let today = NaiveDate::from_ymd_opt(2024, 7, 15).ok_or("invalid date")?;
    let unpaid = Ledger::<MemoryStore>::find_unpaid_this_month(roster.members(), today);
    println!("\nUnpaid for July 2024:");
    for member in unpaid {
        println!("  {}", member.full_name());
    }

    let summary = roster.summary();
    println!(
        "\nMembers: {} (single {}, family {}), total paid {}",
        summary.total_members, summary.single_members, summary.family_members, summary.total_paid
    );

    let report = ledger.audit().await?;
    println!("Ledger consistent: {}", report.is_consistent);
    for audit in &report.members {
        println!(
            "  {}: matrix {} + earlier payments {} = {}",
            audit.full_name, audit.matrix_total, audit.implied_previous_amount, audit.recorded_total
        );
    }

    Ok(())
}
