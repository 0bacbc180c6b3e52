/// daily accrual - run one loan through calculation, journaling and posting
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use loan_accrual_ledger::{
    Accrual, AccrualConfig, AccrualWorkflow, DayCountConvention, EntityStore, InMemoryEntityStore,
    Loan, Money, PrincipalSnapshot, Rate, SafeTimeProvider, TimeSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== daily accrual ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let store = InMemoryEntityStore::new();
    store.create(Loan::new("LN-1001", Rate::from_percentage(6)))?;

    let mut workflow = AccrualWorkflow::new(&store, &time, AccrualConfig::default())?;

    // one accrual per day for the first week of march, each convention once
    let conventions = [
        DayCountConvention::Actual360,
        DayCountConvention::Actual365,
        DayCountConvention::Thirty360,
    ];
    for day in 1..=7u32 {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let convention = conventions[(day as usize - 1) % conventions.len()];
        let accrual_id = format!("ACR-LN-1001-{}", as_of);

        workflow.register(
            Accrual::new(accrual_id.clone(), "LN-1001")
                .with_as_of_date(as_of)
                .with_convention(convention)
                .with_currency("USD")
                .with_run_id("RUN-2024-03")
                .with_principal(PrincipalSnapshot::new(
                    Money::from_major(100_000),
                    Utc.from_utc_datetime(&as_of.and_hms_opt(0, 0, 0).unwrap()),
                )),
        )?;

        let posted = workflow.run(&accrual_id)?;
        println!(
            "{}  {:?}  fraction={}  interest={}",
            as_of,
            convention,
            posted.entity.day_count_fraction.unwrap_or_default(),
            posted.entity.interest_amount.unwrap_or_default(),
        );
        controller.advance(Duration::days(1));
    }

    let loan = store
        .find_by_business_key::<Loan>("LN-1001")?
        .ok_or("loan missing")?;
    println!("\naccrued interest: {} (version {})", loan.entity.accrued_interest, loan.version);
    println!("events recorded: {}", workflow.take_events().len());

    let last = store
        .find_by_business_key::<Accrual>("ACR-LN-1001-2024-03-07")?
        .ok_or("accrual missing")?;
    println!("\n{}", last.entity.to_json_pretty()?);

    Ok(())
}
