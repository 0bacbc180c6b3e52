/// correction - supersede a posted accrual after the loan's apr is fixed
use chrono::{NaiveDate, TimeZone, Utc};
use loan_accrual_ledger::{
    net_delta, Accrual, AccrualConfig, AccrualEvent, AccrualWorkflow, DayCountConvention, Entity,
    EntityStore, InMemoryEntityStore, Loan, Money, PrincipalSnapshot, Rate, SafeTimeProvider,
    TimeSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== reverse and replace ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap()
    ));
    let store = InMemoryEntityStore::new();
    store.create(Loan::new("LN-2002", Rate::from_percentage(6)))?;

    let mut workflow = AccrualWorkflow::new(&store, &time, AccrualConfig::default())?;
    workflow.register(
        Accrual::new("ACR-2002-0302", "LN-2002")
            .with_as_of_date(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
            .with_convention(DayCountConvention::Actual360)
            .with_currency("USD")
            .with_principal(PrincipalSnapshot::new(
                Money::from_major(100_000),
                Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
            )),
    )?;
    let posted = workflow.run("ACR-2002-0302")?;
    println!("posted at 6.00%: {}", posted.entity.interest_amount.unwrap_or_default());

    // the rate should have been 7%
    let loan = store.find_by_business_key::<Loan>("LN-2002")?.ok_or("loan missing")?;
    let corrected = Loan {
        apr: Some(Rate::from_percentage(7)),
        ..loan.entity
    };
    store.update(corrected.business_key(), corrected.clone(), loan.version, "correct_apr")?;

    let result = workflow.supersede("ACR-2002-0302")?;
    let replacement = &result.replacement.entity;

    println!("original state:    {}", result.original.entity.state);
    println!("replacement:       {} ({})", replacement.accrual_id, replacement.state);
    println!("new interest:      {}", replacement.interest_amount.unwrap_or_default());
    println!("net loan delta:    {}", net_delta(&replacement.journal_entries));
    for entry in &replacement.journal_entries {
        println!(
            "  {:?} {:?} {:?} {}",
            entry.kind,
            entry.account,
            entry.direction,
            entry.amount.unwrap_or_default()
        );
    }

    let loan = store.find_by_business_key::<Loan>("LN-2002")?.ok_or("loan missing")?;
    println!("\naccrued interest:  {}", loan.entity.accrued_interest);

    println!("\naudit trail:");
    for event in workflow.take_events() {
        if matches!(
            event,
            AccrualEvent::ReplacementCreated { .. }
                | AccrualEvent::LoanBalanceUpdated { .. }
                | AccrualEvent::AccrualSuperseded { .. }
        ) {
            println!("  {}", serde_json::to_string(&event)?);
        }
    }

    Ok(())
}
