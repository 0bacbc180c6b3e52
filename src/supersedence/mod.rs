pub mod replacement;
pub mod reversal;

use tracing::info;

use crate::accrual::Accrual;
use crate::errors::Result;
use crate::store::{EntityStore, Versioned};

pub use replacement::ReplacementAccrualFactory;
pub use reversal::{reversal_of, PriorJournalReverser};

/// reverse-and-replace corrections.
///
/// A posted accrual is never edited. Correcting it creates a sibling
/// accrual that points back through `supersedes_accrual_id`, carries
/// reversals of the original's postings, and then recomputes its own
/// interest through the normal stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupersedenceCoordinator {
    factory: ReplacementAccrualFactory,
    reverser: PriorJournalReverser,
}

impl SupersedenceCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// create the replacement for `current`, already seeded with reversals.
    ///
    /// The replacement is assembled and its journal balanced before the
    /// single create call, so a failure at any step leaves no new record
    /// behind. `current` must already be stored; it is not modified.
    pub fn begin<S: EntityStore>(
        &self,
        current: &Accrual,
        store: &S,
    ) -> Result<Versioned<Accrual>> {
        let mut replacement = self.factory.build(current)?;
        let reversed = self.reverser.reverse(&mut replacement, store)?;
        let created = self.factory.persist(replacement, store)?;
        info!(
            accrual_id = %created.entity.accrual_id,
            supersedes = %current.accrual_id,
            reversed,
            "correction started"
        );
        Ok(created)
    }
}
