use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// fractional digits carried by monetary amounts at rest
pub const CURRENCY_SCALE: u32 = 2;

/// round half-up (away from zero on a tie) to `dp` fractional digits
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Money type held at a fixed 2-digit currency scale.
///
/// Every constructor rounds half-up and rescales, so `16.7` is stored
/// (and serialized) as `16.70`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, CURRENCY_SCALE));

    /// create from decimal, rounding half-up to currency scale
    pub fn from_decimal(d: Decimal) -> Self {
        let mut rounded = round_half_up(d, CURRENCY_SCALE);
        rounded.rescale(CURRENCY_SCALE);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        Money(rounded)
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money::from_decimal(Decimal::from_str(s)?))
    }

    /// create from integer amount (dollars, euros, etc)
    pub fn from_major(amount: i64) -> Self {
        Money::from_decimal(Decimal::from(amount))
    }

    /// create from minor amount (cents)
    pub fn from_minor(amount: i64) -> Self {
        Money::from_decimal(Decimal::new(amount, CURRENCY_SCALE))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // re-normalise whatever scale the stored document carried
        <Decimal as Deserialize>::deserialize(deserializer).map(Money::from_decimal)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money::from_decimal(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money::from_decimal(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::from_decimal(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

/// rate type for annual percentage rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from decimal (e.g., 0.06 for 6%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 6 for 6%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// create from basis points (e.g., 600 for 6%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(10000))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_half_up() {
        assert_eq!(Money::from_decimal(dec!(16.665)).to_string(), "16.67");
        assert_eq!(Money::from_decimal(dec!(16.6649)).to_string(), "16.66");
        assert_eq!(Money::from_decimal(dec!(-16.665)).to_string(), "-16.67");
        // banker's rounding would give 0.02 here
        assert_eq!(Money::from_decimal(dec!(0.025)).to_string(), "0.03");
    }

    #[test]
    fn test_money_fixed_scale() {
        assert_eq!(Money::from_major(100).to_string(), "100.00");
        assert_eq!(Money::from_str_exact("16.7").unwrap().to_string(), "16.70");
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::default().to_string(), "0.00");
        assert_eq!((-Money::ZERO).to_string(), "0.00");
        assert_eq!(Money::from_minor(1667), Money::from_str_exact("16.67").unwrap());
    }

    #[test]
    fn test_money_serializes_as_scaled_string() {
        let m = Money::from_str_exact("16.7").unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"16.70\"");

        let back: Money = serde_json::from_str("\"16.666\"").unwrap();
        assert_eq!(back.to_string(), "16.67");

        let tie: Money = serde_json::from_str("\"0.025\"").unwrap();
        assert_eq!(tie, Money::from_str_exact("0.03").unwrap());
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_str_exact("16.67").unwrap();
        let b = Money::from_str_exact("3.33").unwrap();
        assert_eq!(a + b, Money::from_major(20));
        assert_eq!(a - a, Money::ZERO);
        assert_eq!(-a, Money::from_str_exact("-16.67").unwrap());
        assert_eq!([a, b, -a].iter().sum::<Money>(), b);
        assert!((-a).is_negative());
        assert_eq!((-a).abs(), a);
    }

    #[test]
    fn test_rate_constructors() {
        assert_eq!(Rate::from_percentage(6).as_decimal(), dec!(0.06));
        assert_eq!(Rate::from_bps(600), Rate::from_percentage(6));
        assert_eq!(Rate::from_decimal(dec!(0.06)).to_string(), "6.00%");
    }
}
