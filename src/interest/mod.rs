pub mod amount;
pub mod day_count;

pub use amount::{interest_amount, InterestAmountCalculator, InterestOutcome};
pub use day_count::{accrual_window, DayCountConvention, DayCountFractionCalculator};
