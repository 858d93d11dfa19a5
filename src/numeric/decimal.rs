use std::{fmt, str::FromStr};

use num_bigint::{BigInt, BigUint};

/// Exact decimal, the value of a rational literal such as `1.25r`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    fraction: BigInt,
    negative_exponent: u32,
}

impl Decimal {
    /// `fraction * 10^exponent`, normalized so that trailing zeros of the
    /// fraction are folded into the exponent.
    pub fn from_fraction_and_exponent(mut fraction: BigInt, mut exponent: i32) -> Self {
        while exponent > 0 {
            fraction *= 10;
            exponent -= 1;
        }
        while exponent < 0 && (&fraction) % 10 == BigInt::ZERO {
            fraction /= 10;
            exponent += 1;
        }
        Decimal {
            fraction,
            negative_exponent: exponent.unsigned_abs(),
        }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.fraction
    }

    pub fn denominator(&self) -> BigUint {
        BigUint::from(10u32).pow(self.negative_exponent)
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Decimal {
            fraction: value,
            negative_exponent: 0,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative_exponent == 0 {
            return write!(f, "{}", self.fraction);
        }
        let digits = self.fraction.magnitude().to_string();
        if self.fraction.sign() == num_bigint::Sign::Minus {
            write!(f, "-")?;
        }
        let scale = self.negative_exponent as usize;
        if digits.len() <= scale {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        } else {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int_part, frac_part)
        }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts the normalized digits of a float literal: `12`, `1.25`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecimalError(()));
        }
        let mut fraction = BigInt::ZERO;
        let mut exponent = 0;
        for (i, &b) in int_part.as_bytes().iter().chain(frac_part.as_bytes()).enumerate() {
            if !b.is_ascii_digit() {
                return Err(ParseDecimalError(()));
            }
            fraction = fraction * 10 + BigInt::from(b - b'0');
            if i >= int_part.len() {
                exponent -= 1;
            }
        }
        Ok(Decimal::from_fraction_and_exponent(fraction, exponent))
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ParseDecimalError(());

impl std::error::Error for ParseDecimalError {}
impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to parse decimal")
    }
}
