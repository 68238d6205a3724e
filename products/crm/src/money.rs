//! Exact two-decimal money. Amounts are stored as integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// `None` when the value carries more than two decimals or does not fit.
pub fn to_cents(value: Decimal) -> Option<i64> {
    let scaled = value.checked_mul(Decimal::ONE_HUNDRED)?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.trunc().to_i64()
}

/// `part / whole * 100`, rounded half-even to two places. Zero when `whole`
/// is zero.
pub fn percentage(part: u64, whole: u64) -> Decimal {
    if whole == 0 {
        return Decimal::new(0, 2);
    }
    let mut rate = (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2);
    rate.rescale(2);
    rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_keep_two_places() {
        assert_eq!(from_cents(100_000).to_string(), "1000.00");
        assert_eq!(from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn to_cents_rejects_sub_cent_precision() {
        assert_eq!(to_cents(Decimal::new(1999, 2)), Some(1999));
        assert_eq!(to_cents(Decimal::new(5, 0)), Some(500));
        assert_eq!(to_cents(Decimal::new(10001, 3)), None);
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(percentage(1, 3).to_string(), "33.33");
        assert_eq!(percentage(2, 4).to_string(), "50.00");
        assert_eq!(percentage(2, 3).to_string(), "66.67");
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0, 0), Decimal::ZERO);
        assert_eq!(percentage(0, 0).to_string(), "0.00");
    }
}
