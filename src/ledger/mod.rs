pub mod reconcile;
pub mod writer;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{AccrualError, Result};
use crate::types::{Account, Direction, EntryId, EntryKind};

pub use reconcile::{LoanBalanceReconciler, LoanUpdate, ReconcileOutcome};
pub use writer::JournalEntryWriter;

/// one debit or credit leg embedded in an accrual.
///
/// Entries arrive from the entity store as documents, so the fields a
/// malformed row can be missing (`amount`, `direction`, `kind`) are
/// optional. Writers in this crate always populate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub entry_id: EntryId,
    pub account: Account,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub kind: Option<EntryKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusts_entry_id: Option<EntryId>,
    #[serde(default)]
    pub memo: String,
}

/// the fully populated part of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub direction: Direction,
    pub amount: Money,
    pub kind: EntryKind,
}

impl JournalEntry {
    /// new ORIGINAL-kind entry with a fresh id
    pub fn original(
        account: Account,
        direction: Direction,
        amount: Money,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            account,
            direction: Some(direction),
            amount: Some(amount),
            kind: Some(EntryKind::Original),
            adjusts_entry_id: None,
            memo: memo.into(),
        }
    }

    /// new REVERSAL-kind entry cancelling `target`
    pub fn reversal(
        target: EntryId,
        account: Account,
        direction: Direction,
        amount: Money,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            account,
            direction: Some(direction),
            amount: Some(amount),
            kind: Some(EntryKind::Reversal),
            adjusts_entry_id: Some(target),
            memo: memo.into(),
        }
    }

    /// None when any of direction, amount or kind is missing
    pub fn leg(&self) -> Option<Leg> {
        Some(Leg {
            direction: self.direction?,
            amount: self.amount?,
            kind: self.kind?,
        })
    }

    /// signed effect on the interest receivable balance.
    ///
    /// Debits raise the receivable and credits lower it, whatever the kind:
    /// a reversal already carries the opposite direction of the entry it
    /// adjusts, so it contributes exactly the negation of that entry.
    /// Income legs have no effect.
    pub fn receivable_effect(&self) -> Option<Money> {
        let leg = self.leg()?;
        if self.account != Account::InterestReceivable {
            return Some(Money::ZERO);
        }
        Some(match leg.direction {
            Direction::Debit => leg.amount,
            Direction::Credit => -leg.amount,
        })
    }

    /// adjustment link and sign rules for a single entry
    pub fn check_shape(&self) -> Result<()> {
        let Some(leg) = self.leg() else {
            return Ok(());
        };
        if leg.amount.is_negative() {
            return Err(AccrualError::InvariantViolation {
                message: format!("entry {} has negative amount {}", self.entry_id, leg.amount),
            });
        }
        match (leg.kind, self.adjusts_entry_id) {
            (EntryKind::Reversal, None) => Err(AccrualError::InvariantViolation {
                message: format!(
                    "reversal entry {} does not reference an adjusted entry",
                    self.entry_id
                ),
            }),
            (EntryKind::Original | EntryKind::Replacement, Some(target)) => {
                Err(AccrualError::InvariantViolation {
                    message: format!(
                        "{:?} entry {} must not adjust {}",
                        leg.kind, self.entry_id, target
                    ),
                })
            }
            _ => Ok(()),
        }
    }
}

/// running debit and credit totals over a set of entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub debits: Money,
    pub credits: Money,
}

impl LedgerTotals {
    pub fn of(entries: &[JournalEntry]) -> Self {
        entries
            .iter()
            .filter_map(JournalEntry::leg)
            .fold(LedgerTotals::default(), |mut totals, leg| {
                match leg.direction {
                    Direction::Debit => totals.debits += leg.amount,
                    Direction::Credit => totals.credits += leg.amount,
                }
                totals
            })
    }

    pub fn is_balanced(&self) -> bool {
        self.debits == self.credits
    }
}

/// verify every entry's shape and that debits equal credits
pub fn ensure_balanced(entries: &[JournalEntry]) -> Result<LedgerTotals> {
    for entry in entries {
        entry.check_shape()?;
    }
    let totals = LedgerTotals::of(entries);
    if !totals.is_balanced() {
        return Err(AccrualError::InvariantViolation {
            message: format!(
                "journal does not balance: debits {} != credits {}",
                totals.debits, totals.credits
            ),
        });
    }
    Ok(totals)
}

/// fold entries into the net change of the accrued interest balance.
///
/// Pure and deterministic; entries missing direction, amount or kind are
/// skipped with a warning.
pub fn net_delta(entries: &[JournalEntry]) -> Money {
    entries
        .iter()
        .filter_map(|entry| {
            let effect = entry.receivable_effect();
            if effect.is_none() {
                warn!(entry_id = %entry.entry_id, "skipping incomplete journal entry");
            }
            effect
        })
        .sum()
}
