use tracing::info;
use uuid::Uuid;

use crate::accrual::{Accrual, AccrualState};
use crate::errors::{AccrualError, Result};
use crate::store::{EntityStore, Versioned};
use crate::types::AccrualId;

/// builds and persists the accrual that corrects a posted one
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplacementAccrualFactory;

impl ReplacementAccrualFactory {
    pub fn new() -> Self {
        Self
    }

    /// fresh business key for a replacement row
    pub fn next_accrual_id() -> AccrualId {
        format!("ACR-{}", Uuid::new_v4())
    }

    /// fields a replacement copies must all be present on the current accrual
    pub fn validate(current: &Accrual) -> Result<()> {
        if current.accrual_id.trim().is_empty() {
            return Err(AccrualError::MissingInput { field: "accrualId" });
        }
        if current.loan_id.is_none() {
            return Err(AccrualError::MissingInput { field: "loanId" });
        }
        if current.as_of_date.is_none() {
            return Err(AccrualError::MissingInput { field: "asOfDate" });
        }
        if current.day_count_convention.is_none() {
            return Err(AccrualError::MissingInput { field: "dayCountConvention" });
        }
        if current.principal_snapshot.is_none() {
            return Err(AccrualError::MissingInput { field: "principalSnapshot" });
        }
        Ok(())
    }

    /// in-memory replacement under a new id; derived fields left empty
    pub fn build(&self, current: &Accrual) -> Result<Accrual> {
        self.build_with_id(current, Self::next_accrual_id())
    }

    pub fn build_with_id(
        &self,
        current: &Accrual,
        accrual_id: impl Into<AccrualId>,
    ) -> Result<Accrual> {
        Self::validate(current)?;
        let accrual_id = accrual_id.into();
        if accrual_id == current.accrual_id {
            return Err(AccrualError::InvariantViolation {
                message: format!("replacement must not reuse accrual id {}", accrual_id),
            });
        }

        Ok(Accrual {
            accrual_id,
            loan_id: current.loan_id.clone(),
            as_of_date: current.as_of_date,
            currency: current.currency.clone(),
            day_count_convention: current.day_count_convention,
            day_count_fraction: None,
            principal_snapshot: current.principal_snapshot,
            interest_amount: None,
            journal_entries: Vec::new(),
            supersedes_accrual_id: Some(current.accrual_id.clone()),
            run_id: current.run_id.clone(),
            prior_period_flag: current.prior_period_flag,
            posting_timestamp: None,
            error: None,
            state: AccrualState::New,
        })
    }

    /// store a built replacement as a new record; never an update of the original
    pub fn persist<S: EntityStore>(
        &self,
        replacement: Accrual,
        store: &S,
    ) -> Result<Versioned<Accrual>> {
        let created = store.create(replacement)?;
        info!(
            accrual_id = %created.entity.accrual_id,
            supersedes = ?created.entity.supersedes_accrual_id,
            "replacement accrual created"
        );
        Ok(created)
    }

    /// build and persist in one step
    pub fn create<S: EntityStore>(
        &self,
        current: &Accrual,
        store: &S,
    ) -> Result<Versioned<Accrual>> {
        let replacement = self.build(current)?;
        self.persist(replacement, store)
    }
}
