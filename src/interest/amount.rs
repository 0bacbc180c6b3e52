use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::accrual::Accrual;
use crate::config::AccrualConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{AccrualError, Result};
use crate::loan::Loan;
use crate::store::{EntityKind, EntityStore};

/// simple interest for one accrual window, rounded half-up to currency scale
pub fn interest_amount(principal: Money, apr: Rate, fraction: Decimal) -> Result<Money> {
    principal
        .as_decimal()
        .checked_mul(apr.as_decimal())
        .and_then(|d| d.checked_mul(fraction))
        .map(Money::from_decimal)
        .ok_or_else(|| AccrualError::InvariantViolation {
            message: format!("interest overflow: {} x {} x {}", principal, apr, fraction),
        })
}

/// result of the interest stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestOutcome {
    pub amount: Money,
    pub apr: Rate,
    /// zero or negative amount; a warning, posting still proceeds
    pub non_positive: bool,
}

/// computes principal x apr x day-count fraction for an accrual
#[derive(Debug, Clone, Copy)]
pub struct InterestAmountCalculator {
    warn_on_non_positive: bool,
}

impl InterestAmountCalculator {
    pub fn new(warn_on_non_positive: bool) -> Self {
        Self { warn_on_non_positive }
    }

    pub fn from_config(config: &AccrualConfig) -> Self {
        Self::new(config.warn_on_non_positive_interest)
    }

    /// read the loan's apr and store `interest_amount` on the accrual
    pub fn calculate<S: EntityStore>(
        &self,
        accrual: &mut Accrual,
        store: &S,
    ) -> Result<InterestOutcome> {
        let principal = accrual
            .principal_snapshot
            .ok_or(AccrualError::MissingInput { field: "principalSnapshot" })?;
        let loan_id = accrual
            .loan_id
            .as_deref()
            .ok_or(AccrualError::MissingInput { field: "loanId" })?;
        let fraction = accrual
            .day_count_fraction
            .ok_or(AccrualError::MissingInput { field: "dayCountFraction" })?;

        let loan = store
            .find_by_business_key::<Loan>(loan_id)?
            .ok_or_else(|| AccrualError::ReferenceNotFound {
                kind: EntityKind::Loan,
                key: loan_id.to_string(),
            })?;
        let apr = loan
            .entity
            .apr
            .ok_or(AccrualError::MissingInput { field: "apr" })?;

        let amount = interest_amount(principal.amount, apr, fraction)?;
        let non_positive = !amount.is_positive();
        if non_positive && self.warn_on_non_positive {
            warn!(
                accrual_id = %accrual.accrual_id,
                loan_id,
                %amount,
                "interest amount is zero or negative"
            );
        }
        debug!(
            accrual_id = %accrual.accrual_id,
            principal = %principal.amount,
            %apr,
            %fraction,
            %amount,
            "interest calculated"
        );

        accrual.interest_amount = Some(amount);
        Ok(InterestOutcome {
            amount,
            apr,
            non_positive,
        })
    }
}

impl Default for InterestAmountCalculator {
    fn default() -> Self {
        Self::from_config(&AccrualConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEntityStore;
    use crate::types::PrincipalSnapshot;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn principal(amount: &str) -> PrincipalSnapshot {
        PrincipalSnapshot::new(
            Money::from_str_exact(amount).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        )
    }

    fn store_with_loan(apr: Option<Rate>) -> InMemoryEntityStore {
        let store = InMemoryEntityStore::new();
        let mut loan = Loan::new("LN-1", Rate::ZERO);
        loan.apr = apr;
        store.create(loan).unwrap();
        store
    }

    fn calculated_accrual(amount: &str, fraction: Decimal) -> Accrual {
        let mut accrual = Accrual::new("ACR-1", "LN-1").with_principal(principal(amount));
        accrual.day_count_fraction = Some(fraction);
        accrual
    }

    #[test]
    fn test_interest_for_one_day_act_360() {
        let store = store_with_loan(Some(Rate::from_decimal(dec!(0.06))));
        let mut accrual = calculated_accrual("100000.00", dec!(0.0027777778));

        let outcome = InterestAmountCalculator::default()
            .calculate(&mut accrual, &store)
            .unwrap();

        assert_eq!(outcome.amount, Money::from_str_exact("16.67").unwrap());
        assert!(!outcome.non_positive);
        assert_eq!(accrual.interest_amount, Some(outcome.amount));
    }

    #[test]
    fn test_rounding_is_half_up() {
        let principal = Money::from_major(1000);
        let apr = Rate::from_percentage(5);
        // 1000 x 0.05 x 0.0001 = 0.005
        assert_eq!(
            interest_amount(principal, apr, dec!(0.0001)).unwrap(),
            Money::from_str_exact("0.01").unwrap()
        );
        // 1000 x 0.05 x 0.0003 = 0.015
        assert_eq!(
            interest_amount(principal, apr, dec!(0.0003)).unwrap(),
            Money::from_str_exact("0.02").unwrap()
        );
    }

    #[test]
    fn test_missing_loan_leaves_amount_unset() {
        let store = InMemoryEntityStore::new();
        let mut accrual = calculated_accrual("100000.00", dec!(0.0027777778));

        let err = InterestAmountCalculator::default()
            .calculate(&mut accrual, &store)
            .unwrap_err();

        assert_eq!(
            err,
            AccrualError::ReferenceNotFound {
                kind: EntityKind::Loan,
                key: "LN-1".to_string()
            }
        );
        assert!(accrual.interest_amount.is_none());
    }

    #[test]
    fn test_missing_inputs() {
        let store = store_with_loan(Some(Rate::from_percentage(6)));
        let calc = InterestAmountCalculator::default();

        let mut no_fraction = Accrual::new("ACR-1", "LN-1").with_principal(principal("100.00"));
        assert_eq!(
            calc.calculate(&mut no_fraction, &store).unwrap_err(),
            AccrualError::MissingInput { field: "dayCountFraction" }
        );

        let mut no_principal = Accrual::new("ACR-1", "LN-1");
        no_principal.day_count_fraction = Some(dec!(0.0027777778));
        assert_eq!(
            calc.calculate(&mut no_principal, &store).unwrap_err(),
            AccrualError::MissingInput { field: "principalSnapshot" }
        );

        let mut no_loan = calculated_accrual("100.00", dec!(0.0027777778));
        no_loan.loan_id = None;
        assert_eq!(
            calc.calculate(&mut no_loan, &store).unwrap_err(),
            AccrualError::MissingInput { field: "loanId" }
        );
    }

    #[test]
    fn test_loan_without_apr() {
        let store = store_with_loan(None);
        let mut accrual = calculated_accrual("100.00", dec!(0.0027777778));
        assert_eq!(
            InterestAmountCalculator::default()
                .calculate(&mut accrual, &store)
                .unwrap_err(),
            AccrualError::MissingInput { field: "apr" }
        );
    }

    #[test]
    fn test_zero_and_negative_interest_are_warnings() {
        let store = store_with_loan(Some(Rate::from_decimal(dec!(-0.01))));
        let mut accrual = calculated_accrual("100000.00", dec!(0.0027777778));
        let outcome = InterestAmountCalculator::default()
            .calculate(&mut accrual, &store)
            .unwrap();
        assert!(outcome.non_positive);
        assert_eq!(outcome.amount, Money::from_str_exact("-2.78").unwrap());

        let mut tiny = calculated_accrual("0.01", dec!(0.0027777778));
        let zero_store = store_with_loan(Some(Rate::from_percentage(6)));
        let outcome = InterestAmountCalculator::default()
            .calculate(&mut tiny, &zero_store)
            .unwrap();
        assert!(outcome.non_positive);
        assert!(outcome.amount.is_zero());
    }
}
