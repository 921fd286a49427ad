//! Scaled-integer arithmetic over `SCALE` (six fractional digits).
//!
//! Products are formed at 128-bit width before any division, and results
//! are narrowed back to `u64` with an explicit overflow check. Division
//! truncates toward zero.

use crate::error::RewardError;

pub use ecovault_types::SCALE;

pub fn checked_add(a: u64, b: u64) -> Result<u64, RewardError> {
    a.checked_add(b).ok_or(RewardError::ArithmeticOverflow)
}

pub fn checked_mul(a: u64, b: u64) -> Result<u64, RewardError> {
    a.checked_mul(b).ok_or(RewardError::ArithmeticOverflow)
}

/// `a * b / divisor` with a full-width intermediate product.
pub fn mul_div(a: u64, b: u64, divisor: u64) -> Result<u64, RewardError> {
    if divisor == 0 {
        return Err(RewardError::ArithmeticOverflow);
    }
    let product = a as u128 * b as u128;
    narrow(product / divisor as u128)
}

/// Product of two scaled values.
pub fn mul_scaled(a: u64, b: u64) -> Result<u64, RewardError> {
    mul_div(a, b, SCALE)
}

/// Quotient of two scaled values.
pub fn div_scaled(a: u64, b: u64) -> Result<u64, RewardError> {
    mul_div(a, SCALE, b)
}

/// Multiplies every factor at 128-bit width, then divides once.
pub fn product_div(factors: &[u64], divisor: u128) -> Result<u64, RewardError> {
    if divisor == 0 {
        return Err(RewardError::ArithmeticOverflow);
    }
    let mut product: u128 = 1;
    for factor in factors {
        product = product
            .checked_mul(*factor as u128)
            .ok_or(RewardError::ArithmeticOverflow)?;
    }
    narrow(product / divisor)
}

fn narrow(value: u128) -> Result<u64, RewardError> {
    u64::try_from(value).map_err(|_| RewardError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_scaled_truncates_toward_zero() {
        assert_eq!(mul_scaled(SCALE - 1, 1).unwrap(), 0);
        assert_eq!(mul_scaled(SCALE, 1).unwrap(), 1);
        // One unit below 3 * SCALE lands on the quotient of 2 * SCALE.
        assert_eq!(
            mul_scaled(3 * SCALE - 1, 1).unwrap(),
            mul_scaled(2 * SCALE, 1).unwrap()
        );
        assert_eq!(mul_scaled(3 * SCALE, 1).unwrap(), 3);
    }

    #[test]
    fn scaled_identities() {
        assert_eq!(mul_scaled(735_000, SCALE).unwrap(), 735_000);
        assert_eq!(div_scaled(1, 2).unwrap(), SCALE / 2);
        assert_eq!(div_scaled(2, 3).unwrap(), 666_666);
    }

    #[test]
    fn wide_intermediate_product_does_not_overflow() {
        // u64::MAX * SCALE overflows u64 but not the 128-bit intermediate.
        assert_eq!(mul_div(u64::MAX, SCALE, SCALE).unwrap(), u64::MAX);
    }

    #[test]
    fn narrowing_overflow_is_reported() {
        assert_eq!(
            mul_div(u64::MAX, 2, 1),
            Err(RewardError::ArithmeticOverflow)
        );
        assert_eq!(
            product_div(&[u64::MAX, u64::MAX, 2], 1),
            Err(RewardError::ArithmeticOverflow)
        );
    }

    #[test]
    fn zero_divisor_is_an_error() {
        assert_eq!(mul_div(1, 1, 0), Err(RewardError::ArithmeticOverflow));
        assert_eq!(product_div(&[1], 0), Err(RewardError::ArithmeticOverflow));
    }

    #[test]
    fn checked_helpers() {
        assert_eq!(checked_add(u64::MAX, 1), Err(RewardError::ArithmeticOverflow));
        assert_eq!(checked_mul(u64::MAX, 2), Err(RewardError::ArithmeticOverflow));
        assert_eq!(checked_add(2, 3).unwrap(), 5);
    }
}
