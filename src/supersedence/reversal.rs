use std::collections::HashSet;

use tracing::{debug, warn};

use crate::accrual::Accrual;
use crate::errors::{AccrualError, Result};
use crate::ledger::{ensure_balanced, JournalEntry};
use crate::store::{EntityKind, EntityStore};
use crate::types::{EntryId, EntryKind};

/// reversal for one prior entry, None if the entry is not a complete ORIGINAL
pub fn reversal_of(prior: &JournalEntry, memo: &str) -> Option<JournalEntry> {
    let leg = prior.leg()?;
    if leg.kind != EntryKind::Original {
        return None;
    }
    Some(JournalEntry::reversal(
        prior.entry_id,
        prior.account,
        leg.direction.opposite(),
        leg.amount,
        memo,
    ))
}

/// seeds a correcting accrual with entries cancelling the accrual it supersedes
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorJournalReverser;

impl PriorJournalReverser {
    pub fn new() -> Self {
        Self
    }

    /// append reversals of every ORIGINAL entry of the superseded accrual.
    ///
    /// Returns how many entries were appended. Entries of other kinds are
    /// never reversed, and an entry already reversed on this accrual is not
    /// reversed twice.
    pub fn reverse<S: EntityStore>(&self, accrual: &mut Accrual, store: &S) -> Result<usize> {
        let prior_id = accrual
            .supersedes_accrual_id
            .as_deref()
            .ok_or(AccrualError::MissingInput { field: "supersedesAccrualId" })?;

        let prior = store
            .find_by_business_key::<Accrual>(prior_id)?
            .ok_or_else(|| AccrualError::ReferenceNotFound {
                kind: EntityKind::Accrual,
                key: prior_id.to_string(),
            })?
            .entity;

        if prior.journal_entries.is_empty() {
            debug!(
                accrual_id = %accrual.accrual_id,
                prior_id,
                "prior accrual has no journal entries"
            );
            return Ok(0);
        }

        let already_reversed: HashSet<EntryId> = accrual
            .journal_entries
            .iter()
            .filter(|e| e.kind == Some(EntryKind::Reversal))
            .filter_map(|e| e.adjusts_entry_id)
            .collect();

        let memo = format!("reversal of accrual {}", prior.accrual_id);
        let mut reversals = Vec::new();
        for entry in &prior.journal_entries {
            if already_reversed.contains(&entry.entry_id) {
                continue;
            }
            if entry.kind == Some(EntryKind::Original) && entry.leg().is_none() {
                warn!(
                    prior_id,
                    entry_id = %entry.entry_id,
                    "cannot reverse incomplete journal entry"
                );
                continue;
            }
            if let Some(reversal) = reversal_of(entry, &memo) {
                reversals.push(reversal);
            }
        }

        let appended = reversals.len();
        let mut entries = accrual.journal_entries.clone();
        entries.extend(reversals);
        ensure_balanced(&entries)?;

        debug!(accrual_id = %accrual.accrual_id, prior_id, appended, "reversal entries seeded");
        accrual.journal_entries = entries;
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::ledger::net_delta;
    use crate::ledger::tests::{money, original_pair};
    use crate::store::InMemoryEntityStore;
    use crate::types::{Account, Direction};
    use proptest::prelude::*;

    fn prior_with(entries: Vec<JournalEntry>) -> Accrual {
        let mut prior = Accrual::new("ACR-1", "LN-1");
        prior.journal_entries = entries;
        prior
    }

    fn correction() -> Accrual {
        let mut accrual = Accrual::new("ACR-2", "LN-1");
        accrual.supersedes_accrual_id = Some("ACR-1".to_string());
        accrual
    }

    #[test]
    fn test_reverses_original_pair() {
        let store = InMemoryEntityStore::new();
        let prior = prior_with(original_pair(money("16.67")));
        store.create(prior.clone()).unwrap();

        let mut accrual = correction();
        let appended = PriorJournalReverser::new().reverse(&mut accrual, &store).unwrap();
        assert_eq!(appended, 2);

        let receivable = &accrual.journal_entries[0];
        assert_eq!(receivable.account, Account::InterestReceivable);
        assert_eq!(receivable.direction, Some(Direction::Credit));
        assert_eq!(receivable.amount, Some(money("16.67")));
        assert_eq!(receivable.kind, Some(EntryKind::Reversal));
        assert_eq!(receivable.adjusts_entry_id, Some(prior.journal_entries[0].entry_id));

        let income = &accrual.journal_entries[1];
        assert_eq!(income.account, Account::InterestIncome);
        assert_eq!(income.direction, Some(Direction::Debit));
        assert_eq!(income.adjusts_entry_id, Some(prior.journal_entries[1].entry_id));

        assert_eq!(net_delta(&accrual.journal_entries), money("-16.67"));

        let mut combined = prior.journal_entries.clone();
        combined.extend(accrual.journal_entries.clone());
        assert!(net_delta(&combined).is_zero());
    }

    #[test]
    fn test_only_original_entries_are_reversed() {
        let store = InMemoryEntityStore::new();
        let mut entries = original_pair(money("10.00"));
        let earlier = original_pair(money("4.00"));
        entries.push(JournalEntry::reversal(
            earlier[0].entry_id,
            Account::InterestReceivable,
            Direction::Credit,
            money("4.00"),
            "older correction",
        ));
        entries.push(JournalEntry::reversal(
            earlier[1].entry_id,
            Account::InterestIncome,
            Direction::Debit,
            money("4.00"),
            "older correction",
        ));
        store.create(prior_with(entries)).unwrap();

        let mut accrual = correction();
        assert_eq!(PriorJournalReverser::new().reverse(&mut accrual, &store).unwrap(), 2);
        assert!(accrual
            .journal_entries
            .iter()
            .all(|e| e.amount == Some(money("10.00"))));
    }

    #[test]
    fn test_second_run_does_not_double_reverse() {
        let store = InMemoryEntityStore::new();
        store.create(prior_with(original_pair(money("16.67")))).unwrap();

        let mut accrual = correction();
        let reverser = PriorJournalReverser::new();
        reverser.reverse(&mut accrual, &store).unwrap();
        assert_eq!(reverser.reverse(&mut accrual, &store).unwrap(), 0);
        assert_eq!(accrual.journal_entries.len(), 2);
    }

    #[test]
    fn test_prior_without_entries_is_noop() {
        let store = InMemoryEntityStore::new();
        store.create(prior_with(Vec::new())).unwrap();

        let mut accrual = correction();
        assert_eq!(PriorJournalReverser::new().reverse(&mut accrual, &store).unwrap(), 0);
        assert!(accrual.journal_entries.is_empty());
    }

    #[test]
    fn test_missing_back_reference_and_missing_prior() {
        let store = InMemoryEntityStore::new();
        let mut plain = Accrual::new("ACR-2", "LN-1");
        assert_eq!(
            PriorJournalReverser::new().reverse(&mut plain, &store).unwrap_err(),
            AccrualError::MissingInput { field: "supersedesAccrualId" }
        );

        let mut accrual = correction();
        assert_eq!(
            PriorJournalReverser::new().reverse(&mut accrual, &store).unwrap_err(),
            AccrualError::ReferenceNotFound {
                kind: EntityKind::Accrual,
                key: "ACR-1".to_string()
            }
        );
    }

    proptest! {
        #[test]
        fn prop_reversals_cancel_originals(
            cents in proptest::collection::vec(0i64..10_000_000, 1..10)
        ) {
            let originals: Vec<JournalEntry> = cents
                .iter()
                .flat_map(|c| original_pair(Money::from_minor(*c)))
                .collect();
            let reversals: Vec<JournalEntry> = originals
                .iter()
                .filter_map(|e| reversal_of(e, "rev"))
                .collect();

            prop_assert_eq!(reversals.len(), originals.len());
            prop_assert!(ensure_balanced(&reversals).is_ok());
            prop_assert_eq!(net_delta(&reversals), -net_delta(&originals));

            let mut combined = originals.clone();
            combined.extend(reversals);
            prop_assert!(net_delta(&combined).is_zero());
        }
    }
}
