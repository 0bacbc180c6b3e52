use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// business key of an accrual
pub type AccrualId = String;

/// business key of a loan
pub type LoanId = String;

/// unique identifier for a journal entry
pub type EntryId = Uuid;

/// ledger accounts touched by interest accrual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Account {
    /// asset side, mirrored by the loan's accrued interest balance
    InterestReceivable,
    /// income side, the balancing leg
    InterestIncome,
}

/// debit or credit leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "DR")]
    Debit,
    #[serde(rename = "CR")]
    Credit,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Debit => Direction::Credit,
            Direction::Credit => Direction::Debit,
        }
    }
}

/// why a journal entry exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    Original,
    Reversal,
    Replacement,
}

/// principal captured once at accrual creation, never recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalSnapshot {
    pub amount: Money,
    pub effective_at_start_of_day: DateTime<Utc>,
}

impl PrincipalSnapshot {
    pub fn new(amount: Money, effective_at_start_of_day: DateTime<Utc>) -> Self {
        Self {
            amount,
            effective_at_start_of_day,
        }
    }
}
