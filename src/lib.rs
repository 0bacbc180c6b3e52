pub mod accrual;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod loan;
pub mod store;
pub mod supersedence;
pub mod types;
pub mod workflow;

// re-export key types
pub use accrual::{Accrual, AccrualFailure, AccrualState};
pub use config::AccrualConfig;
pub use decimal::{Money, Rate};
pub use errors::{AccrualError, ErrorKind, Result};
pub use events::{AccrualEvent, EventStore};
pub use interest::{
    accrual_window, interest_amount, DayCountConvention, DayCountFractionCalculator,
    InterestAmountCalculator, InterestOutcome,
};
pub use ledger::{
    ensure_balanced, net_delta, JournalEntry, JournalEntryWriter, LedgerTotals,
    LoanBalanceReconciler, LoanUpdate, ReconcileOutcome,
};
pub use loan::Loan;
pub use store::{Entity, EntityKind, EntityStore, InMemoryEntityStore, VersionToken, Versioned};
pub use supersedence::{
    reversal_of, PriorJournalReverser, ReplacementAccrualFactory, SupersedenceCoordinator,
};
pub use types::{
    Account, AccrualId, Direction, EntryId, EntryKind, LoanId, PrincipalSnapshot,
};
pub use workflow::{AccrualWorkflow, Supersession};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
