//! Fixed-point decimal type used for gas prices

use crate::int::Int;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dec(Decimal);

impl Dec {
    pub fn from_u64(n: u64) -> Self {
        Self(Decimal::from(n))
    }

    pub fn checked_mul(&self, other: Self) -> Option<Self> {
        self.0.checked_mul(other.0).map(Self)
    }

    /// Round towards positive infinity and convert to an integer.
    pub fn ceil_int(&self) -> Int {
        let whole = self.0.ceil();
        // the value is integral, so the division by 10^scale is exact
        let scale = num_traits::pow(BigInt::from(10u32), whole.scale() as usize);
        Int::from(BigInt::from(whole.mantissa()) / scale)
    }
}

impl FromStr for Dec {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Self)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_int() {
        let price: Dec = "0.025".parse().unwrap();
        let fee = price.checked_mul(Dec::from_u64(200_000)).unwrap();
        assert_eq!(fee.ceil_int(), Int::from_u64(5000));

        let price: Dec = "0.0251".parse().unwrap();
        let fee = price.checked_mul(Dec::from_u64(1_001)).unwrap();
        // 25.1251 rounds up
        assert_eq!(fee.ceil_int(), Int::from_u64(26));
    }

    #[test]
    fn test_ceil_int_keeps_large_and_scaled_values() {
        let big: Dec = "79228162514264337593543950335".parse().unwrap();
        assert_eq!(big.ceil_int().to_string(), "79228162514264337593543950335");

        let scaled: Dec = "12.000".parse().unwrap();
        assert_eq!(scaled.ceil_int(), Int::from_u64(12));

        let negative: Dec = "-1.5".parse().unwrap();
        assert_eq!(negative.ceil_int(), Int::from_i64(-1));
    }
}
