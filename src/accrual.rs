use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::decimal::Money;
use crate::errors::{AccrualError, ErrorKind, Result};
use crate::interest::DayCountConvention;
use crate::ledger::JournalEntry;
use crate::store::{Entity, EntityKind};
use crate::types::{AccrualId, LoanId, PrincipalSnapshot};

/// accrual lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualState {
    /// created, nothing derived yet
    #[default]
    New,
    /// day-count fraction and interest amount set
    Calculated,
    /// journal entries written
    Journaled,
    /// loan balance updated
    Posted,
    /// replaced by a later accrual, terminal
    Superseded,
    /// a stage failed, terminal for this row
    Error,
}

impl AccrualState {
    pub fn can_transition_to(self, next: AccrualState) -> bool {
        use AccrualState::*;
        matches!(
            (self, next),
            (New, Calculated)
                | (Calculated, Journaled)
                | (Journaled, Posted)
                | (Posted, Superseded)
                | (New | Calculated | Journaled | Posted, Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AccrualState::Superseded | AccrualState::Error)
    }
}

impl fmt::Display for AccrualState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// diagnostic recorded on an accrual when a stage fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AccrualError> for AccrualFailure {
    fn from(error: &AccrualError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// one loan's interest for one accrual date.
///
/// Fields populated by later stages are optional until their stage runs.
/// A posted accrual is never changed again; corrections create a new row
/// pointing back through `supersedes_accrual_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accrual {
    pub accrual_id: AccrualId,
    #[serde(default)]
    pub loan_id: Option<LoanId>,
    #[serde(default)]
    pub as_of_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub day_count_convention: Option<DayCountConvention>,
    #[serde(default)]
    pub day_count_fraction: Option<Decimal>,
    #[serde(default)]
    pub principal_snapshot: Option<PrincipalSnapshot>,
    #[serde(default)]
    pub interest_amount: Option<Money>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub journal_entries: Vec<JournalEntry>,
    #[serde(default)]
    pub supersedes_accrual_id: Option<AccrualId>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub prior_period_flag: bool,
    #[serde(default)]
    pub posting_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<AccrualFailure>,
    #[serde(default)]
    pub state: AccrualState,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<JournalEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<JournalEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Accrual {
    /// empty accrual in the NEW state
    pub fn new(accrual_id: impl Into<AccrualId>, loan_id: impl Into<LoanId>) -> Self {
        Self {
            accrual_id: accrual_id.into(),
            loan_id: Some(loan_id.into()),
            as_of_date: None,
            currency: None,
            day_count_convention: None,
            day_count_fraction: None,
            principal_snapshot: None,
            interest_amount: None,
            journal_entries: Vec::new(),
            supersedes_accrual_id: None,
            run_id: None,
            prior_period_flag: false,
            posting_timestamp: None,
            error: None,
            state: AccrualState::New,
        }
    }

    pub fn with_as_of_date(mut self, as_of_date: NaiveDate) -> Self {
        self.as_of_date = Some(as_of_date);
        self
    }

    pub fn with_convention(mut self, convention: DayCountConvention) -> Self {
        self.day_count_convention = Some(convention);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_principal(mut self, principal: PrincipalSnapshot) -> Self {
        self.principal_snapshot = Some(principal);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_prior_period_flag(mut self, prior_period: bool) -> Self {
        self.prior_period_flag = prior_period;
        self
    }

    /// move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition_to(&mut self, next: AccrualState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(AccrualError::InvalidState {
                current: self.state.to_string(),
                expected: format!("a state that may move to {}", next),
            });
        }
        self.state = next;
        Ok(())
    }

    /// record a stage failure and park the accrual in ERROR
    pub fn mark_failed(&mut self, error: &AccrualError) {
        self.error = Some(AccrualFailure::from(error));
        self.state = AccrualState::Error;
    }

    pub fn is_posted(&self) -> bool {
        self.state == AccrualState::Posted
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Entity for Accrual {
    const KIND: EntityKind = EntityKind::Accrual;

    fn business_key(&self) -> &str {
        &self.accrual_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut accrual = Accrual::new("ACR-1", "LN-1");
        assert_eq!(accrual.state, AccrualState::New);

        accrual.transition_to(AccrualState::Calculated).unwrap();
        accrual.transition_to(AccrualState::Journaled).unwrap();
        accrual.transition_to(AccrualState::Posted).unwrap();
        assert!(accrual.is_posted());
        accrual.transition_to(AccrualState::Superseded).unwrap();
        assert!(accrual.state.is_terminal());

        // nothing leaves a terminal state
        assert!(accrual.transition_to(AccrualState::Error).is_err());
    }

    #[test]
    fn test_superseded_only_from_posted() {
        let mut accrual = Accrual::new("ACR-1", "LN-1");
        let err = accrual.transition_to(AccrualState::Superseded).unwrap_err();
        assert!(matches!(err, AccrualError::InvalidState { .. }));

        assert!(!AccrualState::Journaled.can_transition_to(AccrualState::Superseded));
        assert!(!AccrualState::New.can_transition_to(AccrualState::Posted));
    }

    #[test]
    fn test_mark_failed_records_error() {
        let mut accrual = Accrual::new("ACR-1", "LN-1");
        accrual.mark_failed(&AccrualError::MissingInput { field: "asOfDate" });
        assert_eq!(accrual.state, AccrualState::Error);
        let failure = accrual.error.unwrap();
        assert_eq!(failure.kind, ErrorKind::MissingInput);
        assert!(failure.message.contains("asOfDate"));
    }

    #[test]
    fn test_document_with_null_entries() {
        let json = r#"{"accrualId":"ACR-9","loanId":"LN-1","journalEntries":null}"#;
        let accrual: Accrual = serde_json::from_str(json).unwrap();
        assert!(accrual.journal_entries.is_empty());
        assert_eq!(accrual.state, AccrualState::New);
        assert!(accrual.as_of_date.is_none());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let accrual = Accrual::new("ACR-1", "LN-1").with_currency("USD");
        let json = accrual.to_json_pretty().unwrap();
        assert!(json.contains("\"accrualId\": \"ACR-1\""));
        assert!(json.contains("\"priorPeriodFlag\": false"));
        assert!(json.contains("\"state\": \"NEW\""));
    }
}
