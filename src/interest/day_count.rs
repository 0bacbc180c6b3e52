use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accrual::Accrual;
use crate::config::AccrualConfig;
use crate::decimal::round_half_up;
use crate::errors::{AccrualError, Result};

/// day count convention for interest calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayCountConvention {
    /// actual days / 360
    #[serde(rename = "ACT_360")]
    Actual360,
    /// actual days / 365
    #[serde(rename = "ACT_365")]
    Actual365,
    /// US 30/360: 30 days per month, 360 days per year
    #[serde(rename = "THIRTY_360")]
    Thirty360,
}

impl DayCountConvention {
    /// days between dates under this convention
    pub fn day_count(self, start: NaiveDate, end: NaiveDate) -> i64 {
        match self {
            DayCountConvention::Actual360 | DayCountConvention::Actual365 => {
                (end - start).num_days()
            }
            DayCountConvention::Thirty360 => days_30_360(start, end),
        }
    }

    pub fn year_basis(self) -> u32 {
        match self {
            DayCountConvention::Actual365 => 365,
            DayCountConvention::Actual360 | DayCountConvention::Thirty360 => 360,
        }
    }

    /// fraction of a year between the dates, rounded half-up to `scale` digits
    pub fn year_fraction(self, start: NaiveDate, end: NaiveDate, scale: u32) -> Decimal {
        let days = Decimal::from(self.day_count(start, end));
        round_half_up(days / Decimal::from(self.year_basis()), scale)
    }
}

/// US 30/360 day count
fn days_30_360(start: NaiveDate, end: NaiveDate) -> i64 {
    let y1 = start.year() as i64;
    let y2 = end.year() as i64;
    let m1 = start.month() as i64;
    let m2 = end.month() as i64;
    let mut d1 = start.day() as i64;
    let mut d2 = end.day() as i64;

    if d1 == 31 {
        d1 = 30;
    }
    if d2 == 31 && d1 >= 30 {
        d2 = 30;
    }

    360 * (y2 - y1) + 30 * (m2 - m1) + (d2 - d1)
}

/// the single-day window ending at `as_of`
pub fn accrual_window(as_of: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = as_of.pred_opt().ok_or_else(|| AccrualError::InvalidDate {
        message: format!("no day precedes {}", as_of),
    })?;
    Ok((start, as_of))
}

/// derives the day-count fraction of an accrual's one-day window
#[derive(Debug, Clone, Copy)]
pub struct DayCountFractionCalculator {
    scale: u32,
}

impl DayCountFractionCalculator {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    pub fn from_config(config: &AccrualConfig) -> Self {
        Self::new(config.fraction_scale)
    }

    /// compute and store `day_count_fraction`; nothing else is touched
    pub fn derive(&self, accrual: &mut Accrual) -> Result<Decimal> {
        let as_of = accrual
            .as_of_date
            .ok_or(AccrualError::MissingInput { field: "asOfDate" })?;
        let convention = accrual
            .day_count_convention
            .ok_or(AccrualError::MissingInput { field: "dayCountConvention" })?;

        let (start, end) = accrual_window(as_of)?;
        let fraction = convention.year_fraction(start, end, self.scale);

        debug!(
            accrual_id = %accrual.accrual_id,
            ?convention,
            %start,
            %end,
            %fraction,
            "day-count fraction derived"
        );
        accrual.day_count_fraction = Some(fraction);
        Ok(fraction)
    }
}

impl Default for DayCountFractionCalculator {
    fn default() -> Self {
        Self::from_config(&AccrualConfig::default())
    }
}
