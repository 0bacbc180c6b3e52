use tracing::{debug, info};

use crate::accrual::Accrual;
use crate::config::AccrualConfig;
use crate::decimal::Money;
use crate::errors::{AccrualError, Result};
use crate::ledger::net_delta;
use crate::loan::Loan;
use crate::store::{EntityKind, EntityStore, VersionToken, Versioned};
use crate::types::LoanId;

/// a read-modify-write of a loan balance, conditioned on the version read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanUpdate {
    pub loan_id: LoanId,
    pub delta: Money,
    pub expected_version: VersionToken,
    pub updated: Loan,
}

impl LoanUpdate {
    /// apply `delta` to the loan as read; the write must still find `loan.version`
    pub fn plan(loan: &Versioned<Loan>, delta: Money) -> Self {
        let mut updated = loan.entity.clone();
        updated.accrued_interest += delta;
        Self {
            loan_id: loan.entity.loan_id.clone(),
            delta,
            expected_version: loan.version,
            updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// the accrual carried no journal entries; nothing written
    NoEntries,
    Applied {
        delta: Money,
        loan: Versioned<Loan>,
    },
}

impl ReconcileOutcome {
    pub fn delta(&self) -> Money {
        match self {
            ReconcileOutcome::NoEntries => Money::ZERO,
            ReconcileOutcome::Applied { delta, .. } => *delta,
        }
    }
}

/// folds an accrual's journal into the loan's accrued interest balance
#[derive(Debug, Clone)]
pub struct LoanBalanceReconciler {
    transition: String,
}

impl LoanBalanceReconciler {
    pub fn new(transition: impl Into<String>) -> Self {
        Self {
            transition: transition.into(),
        }
    }

    pub fn from_config(config: &AccrualConfig) -> Self {
        Self::new(config.loan_balance_transition.clone())
    }

    pub fn transition(&self) -> &str {
        &self.transition
    }

    /// read the loan, add the accrual's net delta, write it back.
    ///
    /// The write is conditioned on the version read here. A conflict comes
    /// back as `ConcurrentModification`; the caller must re-run this from a
    /// fresh read rather than resubmit the same update.
    pub fn reconcile<S: EntityStore>(
        &self,
        accrual: &Accrual,
        store: &S,
    ) -> Result<ReconcileOutcome> {
        let loan_id = accrual
            .loan_id
            .as_deref()
            .ok_or(AccrualError::MissingInput { field: "loanId" })?;

        if accrual.journal_entries.is_empty() {
            debug!(accrual_id = %accrual.accrual_id, "no journal entries to reconcile");
            return Ok(ReconcileOutcome::NoEntries);
        }

        let loan = store
            .find_by_business_key::<Loan>(loan_id)?
            .ok_or_else(|| AccrualError::ReferenceNotFound {
                kind: EntityKind::Loan,
                key: loan_id.to_string(),
            })?;

        let update = LoanUpdate::plan(&loan, net_delta(&accrual.journal_entries));
        let written = self.commit(update.clone(), store)?;

        info!(
            accrual_id = %accrual.accrual_id,
            loan_id,
            delta = %update.delta,
            accrued_interest = %written.entity.accrued_interest,
            version = %written.version,
            "loan balance updated"
        );
        Ok(ReconcileOutcome::Applied {
            delta: update.delta,
            loan: written,
        })
    }

    /// submit a planned update under this reconciler's transition token
    pub fn commit<S: EntityStore>(&self, update: LoanUpdate, store: &S) -> Result<Versioned<Loan>> {
        store.update(
            &update.loan_id,
            update.updated,
            update.expected_version,
            &self.transition,
        )
    }
}

impl Default for LoanBalanceReconciler {
    fn default() -> Self {
        Self::from_config(&AccrualConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::ledger::tests::{money, original_pair};
    use crate::ledger::JournalEntry;
    use crate::store::InMemoryEntityStore;
    use crate::types::{Account, Direction};

    fn setup(balance: &str) -> InMemoryEntityStore {
        let store = InMemoryEntityStore::new();
        let loan =
            Loan::new("LN-1", Rate::from_percentage(6)).with_accrued_interest(money(balance));
        store.create(loan).unwrap();
        store
    }

    fn journaled(amount: &str) -> Accrual {
        let mut accrual = Accrual::new("ACR-1", "LN-1");
        accrual.journal_entries = original_pair(money(amount));
        accrual
    }

    fn balance(store: &InMemoryEntityStore) -> Versioned<Loan> {
        store.find_by_business_key::<Loan>("LN-1").unwrap().unwrap()
    }

    #[test]
    fn test_adds_interest_to_loan_balance() {
        let store = setup("100.00");
        let outcome = LoanBalanceReconciler::default()
            .reconcile(&journaled("16.67"), &store)
            .unwrap();

        assert_eq!(outcome.delta(), money("16.67"));
        let loan = balance(&store);
        assert_eq!(loan.entity.accrued_interest, money("116.67"));
        assert_eq!(loan.version, VersionToken(2));
        assert_eq!(loan.transition.as_deref(), Some("accrue_interest"));
    }

    #[test]
    fn test_custom_transition_token() {
        let store = setup("0.00");
        LoanBalanceReconciler::new("post_daily_interest")
            .reconcile(&journaled("1.00"), &store)
            .unwrap();
        assert_eq!(balance(&store).transition.as_deref(), Some("post_daily_interest"));
    }

    #[test]
    fn test_empty_journal_is_noop() {
        let store = setup("100.00");
        let accrual = Accrual::new("ACR-1", "LN-1");
        let outcome = LoanBalanceReconciler::default().reconcile(&accrual, &store).unwrap();

        assert_eq!(outcome, ReconcileOutcome::NoEntries);
        assert_eq!(balance(&store).version, VersionToken::INITIAL);
    }

    #[test]
    fn test_missing_loan_id_and_missing_loan() {
        let store = InMemoryEntityStore::new();
        let mut accrual = journaled("1.00");
        assert!(matches!(
            LoanBalanceReconciler::default().reconcile(&accrual, &store),
            Err(AccrualError::ReferenceNotFound { kind: EntityKind::Loan, .. })
        ));

        accrual.loan_id = None;
        assert_eq!(
            LoanBalanceReconciler::default().reconcile(&accrual, &store).unwrap_err(),
            AccrualError::MissingInput { field: "loanId" }
        );
    }

    #[test]
    fn test_reversal_cancels_original() {
        let store = setup("16.67");
        let mut accrual = Accrual::new("ACR-2", "LN-1");
        let prior = original_pair(money("16.67"));
        accrual.journal_entries = vec![
            JournalEntry::reversal(
                prior[0].entry_id,
                Account::InterestReceivable,
                Direction::Credit,
                money("16.67"),
                "rev",
            ),
            JournalEntry::reversal(
                prior[1].entry_id,
                Account::InterestIncome,
                Direction::Debit,
                money("16.67"),
                "rev",
            ),
        ];

        let outcome = LoanBalanceReconciler::default().reconcile(&accrual, &store).unwrap();
        assert_eq!(outcome.delta(), money("-16.67"));
        assert!(balance(&store).entity.accrued_interest.is_zero());
    }

    #[test]
    fn test_stale_plan_surfaces_conflict() {
        let store = setup("0.00");
        let reconciler = LoanBalanceReconciler::default();
        let stale = balance(&store);

        // another worker posts first
        reconciler.reconcile(&journaled("5.00"), &store).unwrap();

        let err = reconciler
            .commit(LoanUpdate::plan(&stale, money("16.67")), &store)
            .unwrap_err();
        assert!(matches!(err, AccrualError::ConcurrentModification { .. }));
        assert_eq!(balance(&store).entity.accrued_interest, money("5.00"));

        // a fresh read succeeds
        reconciler.reconcile(&journaled("16.67"), &store).unwrap();
        assert_eq!(balance(&store).entity.accrued_interest, money("21.67"));
    }

    #[test]
    fn test_concurrent_workers_never_lose_updates() {
        let store = setup("0.00");
        let reconciler = LoanBalanceReconciler::default();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let accrual = journaled("1.00");
                    loop {
                        match reconciler.reconcile(&accrual, &store) {
                            Ok(_) => break,
                            Err(AccrualError::ConcurrentModification { .. }) => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                });
            }
        });

        let loan = balance(&store);
        assert_eq!(loan.entity.accrued_interest, money("8.00"));
        assert_eq!(loan.version, VersionToken(9));
    }
}
