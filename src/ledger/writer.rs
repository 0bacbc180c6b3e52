use tracing::debug;

use crate::accrual::Accrual;
use crate::decimal::Money;
use crate::errors::{AccrualError, Result};
use crate::ledger::{ensure_balanced, JournalEntry, LedgerTotals};
use crate::types::{Account, Direction};

/// appends the receivable/income pair for an accrual's interest
#[derive(Debug, Clone, Copy, Default)]
pub struct JournalEntryWriter;

impl JournalEntryWriter {
    pub fn new() -> Self {
        Self
    }

    /// the ORIGINAL-kind pair for `amount`.
    ///
    /// Amounts are never negative: a negative interest amount swaps the
    /// directions so the receivable still moves by the signed amount.
    pub fn entries_for(amount: Money, memo: &str) -> [JournalEntry; 2] {
        let (receivable, income) = if amount.is_negative() {
            (Direction::Credit, Direction::Debit)
        } else {
            (Direction::Debit, Direction::Credit)
        };
        let amount = amount.abs();
        [
            JournalEntry::original(Account::InterestReceivable, receivable, amount, memo),
            JournalEntry::original(Account::InterestIncome, income, amount, memo),
        ]
    }

    /// append the pair and check the whole journal still balances.
    ///
    /// The new list is built and validated off to the side; the accrual
    /// only sees it once it balances.
    pub fn write(&self, accrual: &mut Accrual) -> Result<LedgerTotals> {
        let amount = accrual
            .interest_amount
            .ok_or(AccrualError::MissingInput { field: "interestAmount" })?;

        let memo = match accrual.as_of_date {
            Some(date) => format!("interest accrual {} for {}", accrual.accrual_id, date),
            None => format!("interest accrual {}", accrual.accrual_id),
        };

        let mut entries = accrual.journal_entries.clone();
        entries.extend(Self::entries_for(amount, &memo));
        let totals = ensure_balanced(&entries)?;

        debug!(
            accrual_id = %accrual.accrual_id,
            entries = entries.len(),
            debits = %totals.debits,
            credits = %totals.credits,
            "journal entries written"
        );
        accrual.journal_entries = entries;
        Ok(totals)
    }
}
