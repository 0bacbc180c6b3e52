use hourglass_rs::SafeTimeProvider;
use tracing::{debug, error, info, warn};

use crate::accrual::{Accrual, AccrualState};
use crate::config::AccrualConfig;
use crate::errors::{AccrualError, Result};
use crate::events::{AccrualEvent, EventStore};
use crate::interest::{DayCountFractionCalculator, InterestAmountCalculator};
use crate::ledger::{JournalEntryWriter, LoanBalanceReconciler, ReconcileOutcome};
use crate::store::{EntityKind, EntityStore, Versioned};
use crate::supersedence::SupersedenceCoordinator;

/// transition tokens recorded on accrual updates
pub mod transitions {
    pub const CALCULATE: &str = "calculate";
    pub const JOURNAL: &str = "journal";
    pub const POST: &str = "post";
    pub const SUPERSEDE: &str = "supersede";
    pub const FAIL: &str = "fail";
}

/// both rows of a completed correction
#[derive(Debug, Clone, PartialEq)]
pub struct Supersession {
    pub original: Versioned<Accrual>,
    pub replacement: Versioned<Accrual>,
}

/// in-process driver that moves accruals through the stages.
///
/// Each stage works on a copy of the stored accrual. The copy is persisted
/// only when the stage succeeds, so a failure leaves the last good state in
/// the store and the driver records the error on top of it.
pub struct AccrualWorkflow<'a, S: EntityStore> {
    store: &'a S,
    time: &'a SafeTimeProvider,
    config: AccrualConfig,
    fractions: DayCountFractionCalculator,
    interest: InterestAmountCalculator,
    writer: JournalEntryWriter,
    reconciler: LoanBalanceReconciler,
    coordinator: SupersedenceCoordinator,
    events: EventStore,
}

impl<'a, S: EntityStore> AccrualWorkflow<'a, S> {
    pub fn new(store: &'a S, time: &'a SafeTimeProvider, config: AccrualConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            time,
            fractions: DayCountFractionCalculator::from_config(&config),
            interest: InterestAmountCalculator::from_config(&config),
            writer: JournalEntryWriter::new(),
            reconciler: LoanBalanceReconciler::from_config(&config),
            coordinator: SupersedenceCoordinator::new(),
            events: EventStore::new(),
            config,
        })
    }

    pub fn config(&self) -> &AccrualConfig {
        &self.config
    }

    pub fn events(&self) -> &[AccrualEvent] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<AccrualEvent> {
        self.events.take_events()
    }

    /// store a fresh accrual so it can be run
    pub fn register(&self, accrual: Accrual) -> Result<Versioned<Accrual>> {
        if accrual.state != AccrualState::New {
            return Err(AccrualError::InvalidState {
                current: accrual.state.to_string(),
                expected: AccrualState::New.to_string(),
            });
        }
        let created = self.store.create(accrual)?;
        debug!(accrual_id = %created.entity.accrual_id, "accrual registered");
        Ok(created)
    }

    /// run a NEW accrual through calculation, journaling and posting.
    ///
    /// On failure the accrual is parked in ERROR with the diagnostic attached
    /// and the stage error is returned.
    pub fn run(&mut self, accrual_id: &str) -> Result<Versioned<Accrual>> {
        let mut record = self.load(accrual_id)?;
        Self::require(&record, AccrualState::New)?;

        match self.advance(&mut record) {
            Ok(()) => Ok(record),
            Err(cause) => {
                self.fail(&record, &cause);
                Err(cause)
            }
        }
    }

    /// correct a POSTED accrual by reversing it and posting a fresh replacement.
    ///
    /// The original is claimed as SUPERSEDED, conditioned on the version read
    /// here, as soon as the replacement exists and before the replacement
    /// touches the loan. Losing that claim parks the replacement in ERROR.
    /// A claimed original cannot be corrected again, so its entries are
    /// reversed at most once even when the replacement later fails.
    pub fn supersede(&mut self, accrual_id: &str) -> Result<Supersession> {
        let original = self.load(accrual_id)?;
        Self::require(&original, AccrualState::Posted)?;

        let created = self.coordinator.begin(&original.entity, self.store)?;
        let replacement_id = created.entity.accrual_id.clone();
        self.events.emit(AccrualEvent::ReplacementCreated {
            accrual_id: replacement_id.clone(),
            supersedes: accrual_id.to_string(),
            reversal_entries: created.entity.journal_entries.len(),
        });

        let mut superseded = original.entity.clone();
        superseded.transition_to(AccrualState::Superseded)?;
        let original = match self.save(&original, superseded, transitions::SUPERSEDE) {
            Ok(claimed) => claimed,
            Err(cause) => {
                warn!(
                    accrual_id,
                    replacement_id = %replacement_id,
                    error = %cause,
                    "lost claim on original"
                );
                self.fail(&created, &cause);
                return Err(cause);
            }
        };
        info!(accrual_id, replaced_by = %replacement_id, "accrual superseded");
        self.events.emit(AccrualEvent::AccrualSuperseded {
            accrual_id: accrual_id.to_string(),
            replaced_by: replacement_id.clone(),
            timestamp: self.time.now(),
        });

        let replacement = self.run(&replacement_id)?;
        Ok(Supersession { original, replacement })
    }

    fn advance(&mut self, record: &mut Versioned<Accrual>) -> Result<()> {
        // fraction and interest
        let mut accrual = record.entity.clone();
        let fraction = self.fractions.derive(&mut accrual)?;
        let interest = self.interest.calculate(&mut accrual, self.store)?;
        accrual.transition_to(AccrualState::Calculated)?;
        *record = self.save(record, accrual, transitions::CALCULATE)?;

        let accrual_id = record.entity.accrual_id.clone();
        if let Some(convention) = record.entity.day_count_convention {
            self.events.emit(AccrualEvent::FractionDerived {
                accrual_id: accrual_id.clone(),
                convention,
                fraction,
            });
        }
        self.events.emit(AccrualEvent::InterestCalculated {
            accrual_id: accrual_id.clone(),
            loan_id: record.entity.loan_id.clone().unwrap_or_default(),
            apr: interest.apr,
            amount: interest.amount,
        });
        if interest.non_positive {
            self.events.emit(AccrualEvent::NonPositiveInterest {
                accrual_id: accrual_id.clone(),
                amount: interest.amount,
            });
        }

        // journal
        let mut accrual = record.entity.clone();
        let totals = self.writer.write(&mut accrual)?;
        accrual.transition_to(AccrualState::Journaled)?;
        *record = self.save(record, accrual, transitions::JOURNAL)?;
        self.events.emit(AccrualEvent::JournalWritten {
            accrual_id: accrual_id.clone(),
            entries: record.entity.journal_entries.len(),
            debits: totals.debits,
            credits: totals.credits,
        });

        // loan balance, then post
        self.reconcile(&record.entity)?;
        let mut accrual = record.entity.clone();
        let timestamp = self.time.now();
        accrual.posting_timestamp = Some(timestamp);
        accrual.transition_to(AccrualState::Posted)?;
        *record = self.post(record, accrual)?;

        info!(
            accrual_id = %accrual_id,
            interest = %interest.amount,
            %timestamp,
            "accrual posted"
        );
        self.events.emit(AccrualEvent::AccrualPosted { accrual_id, timestamp });
        Ok(())
    }

    /// stage 4 with re-reads on version conflicts
    fn reconcile(&mut self, accrual: &Accrual) -> Result<ReconcileOutcome> {
        let mut attempt = 1;
        loop {
            match self.reconciler.reconcile(accrual, self.store) {
                Ok(outcome) => {
                    if let ReconcileOutcome::Applied { delta, loan } = &outcome {
                        self.events.emit(AccrualEvent::LoanBalanceUpdated {
                            accrual_id: accrual.accrual_id.clone(),
                            loan_id: loan.entity.loan_id.clone(),
                            delta: *delta,
                            accrued_interest: loan.entity.accrued_interest,
                            version: loan.version,
                        });
                    }
                    return Ok(outcome);
                }
                Err(conflict @ AccrualError::ConcurrentModification { .. })
                    if attempt < self.config.max_reconcile_attempts =>
                {
                    warn!(
                        accrual_id = %accrual.accrual_id,
                        attempt,
                        error = %conflict,
                        "loan update conflicted, retrying from a fresh read"
                    );
                    self.events.emit(AccrualEvent::ReconcileRetried {
                        accrual_id: accrual.accrual_id.clone(),
                        attempt,
                    });
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// write the POSTED accrual; the loan already carries its delta, so only
    /// this write is repeated
    fn post(&self, record: &Versioned<Accrual>, posted: Accrual) -> Result<Versioned<Accrual>> {
        let mut attempt = 1;
        loop {
            match self.save(record, posted.clone(), transitions::POST) {
                Err(failure @ AccrualError::PersistenceFailure { .. })
                    if attempt < self.config.max_post_attempts =>
                {
                    warn!(
                        accrual_id = %posted.accrual_id,
                        attempt,
                        error = %failure,
                        "post write failed, retrying"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// record `cause` on the last persisted state of the accrual
    fn fail(&mut self, record: &Versioned<Accrual>, cause: &AccrualError) {
        let mut failed = record.entity.clone();
        failed.mark_failed(cause);
        let accrual_id = failed.accrual_id.clone();

        match self.save(record, failed, transitions::FAIL) {
            Ok(_) => {
                warn!(
                    accrual_id = %accrual_id,
                    kind = %cause.kind(),
                    error = %cause,
                    "accrual failed"
                );
                self.events.emit(AccrualEvent::AccrualFailed {
                    accrual_id,
                    kind: cause.kind(),
                    message: cause.to_string(),
                    timestamp: self.time.now(),
                });
            }
            Err(e) => {
                error!(
                    accrual_id = %accrual_id,
                    error = %e,
                    cause = %cause,
                    "could not record accrual failure"
                );
            }
        }
    }

    fn load(&self, accrual_id: &str) -> Result<Versioned<Accrual>> {
        self.store
            .find_by_business_key::<Accrual>(accrual_id)?
            .ok_or_else(|| AccrualError::ReferenceNotFound {
                kind: EntityKind::Accrual,
                key: accrual_id.to_string(),
            })
    }

    fn save(
        &self,
        record: &Versioned<Accrual>,
        accrual: Accrual,
        transition: &str,
    ) -> Result<Versioned<Accrual>> {
        let key = accrual.accrual_id.clone();
        self.store.update(&key, accrual, record.version, transition)
    }

    fn require(record: &Versioned<Accrual>, expected: AccrualState) -> Result<()> {
        if record.entity.state != expected {
            return Err(AccrualError::InvalidState {
                current: record.entity.state.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(())
    }
}
