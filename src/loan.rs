use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::store::{Entity, EntityKind};
use crate::types::LoanId;

/// the slice of the external loan aggregate the engine reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub loan_id: LoanId,
    /// annual percentage rate; None when the loan has not been priced
    #[serde(default)]
    pub apr: Option<Rate>,
    /// running balance, changed only by the loan balance reconciler
    #[serde(default)]
    pub accrued_interest: Money,
}

impl Loan {
    pub fn new(loan_id: impl Into<LoanId>, apr: Rate) -> Self {
        Self {
            loan_id: loan_id.into(),
            apr: Some(apr),
            accrued_interest: Money::ZERO,
        }
    }

    pub fn with_accrued_interest(mut self, accrued_interest: Money) -> Self {
        self.accrued_interest = accrued_interest;
        self
    }
}

impl Entity for Loan {
    const KIND: EntityKind = EntityKind::Loan;

    fn business_key(&self) -> &str {
        &self.loan_id
    }
}
