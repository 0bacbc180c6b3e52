use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::ErrorKind;
use crate::interest::DayCountConvention;
use crate::store::VersionToken;
use crate::types::{AccrualId, LoanId};

/// audit events emitted while an accrual moves through the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccrualEvent {
    // calculation events
    FractionDerived {
        accrual_id: AccrualId,
        convention: DayCountConvention,
        fraction: Decimal,
    },
    InterestCalculated {
        accrual_id: AccrualId,
        loan_id: LoanId,
        apr: Rate,
        amount: Money,
    },
    NonPositiveInterest {
        accrual_id: AccrualId,
        amount: Money,
    },

    // ledger events
    JournalWritten {
        accrual_id: AccrualId,
        entries: usize,
        debits: Money,
        credits: Money,
    },
    LoanBalanceUpdated {
        accrual_id: AccrualId,
        loan_id: LoanId,
        delta: Money,
        accrued_interest: Money,
        version: VersionToken,
    },
    ReconcileRetried {
        accrual_id: AccrualId,
        attempt: u32,
    },
    AccrualPosted {
        accrual_id: AccrualId,
        timestamp: DateTime<Utc>,
    },

    // correction events
    ReplacementCreated {
        accrual_id: AccrualId,
        supersedes: AccrualId,
        reversal_entries: usize,
    },
    AccrualSuperseded {
        accrual_id: AccrualId,
        replaced_by: AccrualId,
        timestamp: DateTime<Utc>,
    },

    // failure events
    AccrualFailed {
        accrual_id: AccrualId,
        kind: ErrorKind,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<AccrualEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: AccrualEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<AccrualEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[AccrualEvent] {
        &self.events
    }
}
