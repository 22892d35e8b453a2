//! Exact arithmetic for reserve math.
//!
//! `Fixed` is a signed decimal with 18 fractional digits on top of a `BigInt`.
//! Reserve products of two 256-bit values never overflow, and nothing in the
//! decision path goes through `f64`. Addition and subtraction are exact;
//! multiplication, division and square roots truncate toward zero at the last
//! fractional digit.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;
use std::sync::OnceLock;

use alloy::primitives::{I256, U256};
use num_bigint::{BigInt, Sign};
use thiserror::Error;

/// Number of fractional decimal digits carried by `Fixed`.
pub const FRACTION_DIGITS: u32 = 18;

fn scale() -> &'static BigInt {
    static SCALE: OnceLock<BigInt> = OnceLock::new();
    SCALE.get_or_init(|| BigInt::from(10u8).pow(FRACTION_DIGITS))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFixedError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid decimal string: {0}")]
    InvalidDigit(String),
    #[error("too many fractional digits")]
    TooPrecise,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(BigInt);

impl Fixed {
    pub fn zero() -> Self {
        Fixed(BigInt::from(0u8))
    }

    pub fn from_int(value: i64) -> Self {
        Fixed(BigInt::from(value) * scale())
    }

    /// Lift an on-chain integer amount (smallest unit) into fixed point.
    pub fn from_u256(value: U256) -> Self {
        let units = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
        Fixed(units * scale())
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }

    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn abs(&self) -> Fixed {
        Fixed(BigInt::from(self.0.magnitude().clone()))
    }

    /// `None` when dividing by zero.
    pub fn checked_div(&self, rhs: &Fixed) -> Option<Fixed> {
        if rhs.is_zero() {
            return None;
        }
        Some(Fixed(&self.0 * scale() / &rhs.0))
    }

    /// Principal square root, `None` for negative values.
    pub fn sqrt(&self) -> Option<Fixed> {
        if self.is_negative() {
            return None;
        }
        Some(Fixed((&self.0 * scale()).sqrt()))
    }

    /// Integer part as an on-chain amount. `None` for negative values.
    pub fn floor_u256(&self) -> Option<U256> {
        if self.is_negative() {
            return None;
        }
        let units = &self.0 / scale();
        let (_, bytes) = units.to_bytes_be();
        U256::try_from_be_slice(&bytes)
    }

    /// Round half away from zero to `dp` fractional digits.
    pub fn round_dp(&self, dp: u32) -> Fixed {
        if dp >= FRACTION_DIGITS {
            return self.clone();
        }
        let unit = BigInt::from(10u8).pow(FRACTION_DIGITS - dp);
        let quotient = &self.0 / &unit;
        let remainder = &self.0 % &unit;
        let twice = BigInt::from(remainder.magnitude().clone()) * 2u32;
        let carry = if twice >= unit {
            match self.0.sign() {
                Sign::Minus => BigInt::from(-1),
                _ => BigInt::from(1),
            }
        } else {
            BigInt::from(0)
        };
        Fixed((quotient + carry) * unit)
    }

    /// Lossy conversion for console output only.
    pub fn to_f64(&self) -> f64 {
        self.0
            .to_string()
            .parse::<f64>()
            .map(|raw| raw / 1e18)
            .unwrap_or(0.0)
    }
}

/// Exact signed difference `after - before` of two on-chain amounts.
pub fn signed_delta(after: U256, before: U256) -> I256 {
    I256::from_raw(after.wrapping_sub(before))
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f
            .precision()
            .map(|p| p.min(FRACTION_DIGITS as usize));
        let value = match digits {
            Some(d) => self.round_dp(d as u32),
            None => self.clone(),
        };

        let magnitude = BigInt::from(value.0.magnitude().clone());
        let int_part = &magnitude / scale();
        let frac_part = &magnitude % scale();
        let padded = format!(
            "{:0>width$}",
            frac_part.to_string(),
            width = FRACTION_DIGITS as usize
        );
        let frac = match digits {
            Some(d) => padded[..d].to_string(),
            None => padded.trim_end_matches('0').to_string(),
        };

        let sign = if value.is_negative() { "-" } else { "" };
        if frac.is_empty() {
            write!(f, "{}{}", sign, int_part)
        } else {
            write!(f, "{}{}.{}", sign, int_part, frac)
        }
    }
}

impl FromStr for Fixed {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseFixedError::Empty);
        }
        if !int_part
            .chars()
            .chain(frac_part.chars())
            .all(|c| c.is_ascii_digit())
        {
            return Err(ParseFixedError::InvalidDigit(s.to_string()));
        }
        if frac_part.len() > FRACTION_DIGITS as usize {
            return Err(ParseFixedError::TooPrecise);
        }

        let int_part = if int_part.is_empty() { "0" } else { int_part };
        let raw: BigInt = format!(
            "{}{:0<width$}",
            int_part,
            frac_part,
            width = FRACTION_DIGITS as usize
        )
        .parse()
        .map_err(|_| ParseFixedError::InvalidDigit(s.to_string()))?;

        Ok(Fixed(if negative { -raw } else { raw }))
    }
}

impl Add<&Fixed> for &Fixed {
    type Output = Fixed;
    fn add(self, rhs: &Fixed) -> Fixed {
        Fixed(&self.0 + &rhs.0)
    }
}

impl Sub<&Fixed> for &Fixed {
    type Output = Fixed;
    fn sub(self, rhs: &Fixed) -> Fixed {
        Fixed(&self.0 - &rhs.0)
    }
}

impl Mul<&Fixed> for &Fixed {
    type Output = Fixed;
    fn mul(self, rhs: &Fixed) -> Fixed {
        Fixed(&self.0 * &rhs.0 / scale())
    }
}

/// Panics on a zero divisor; use `checked_div` where that can happen.
impl Div<&Fixed> for &Fixed {
    type Output = Fixed;
    fn div(self, rhs: &Fixed) -> Fixed {
        Fixed(&self.0 * scale() / &rhs.0)
    }
}

impl Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        &self + &rhs
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        &self - &rhs
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: Fixed) -> Fixed {
        &self * &rhs
    }
}

impl Div for Fixed {
    type Output = Fixed;
    fn div(self, rhs: Fixed) -> Fixed {
        &self / &rhs
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(fixed("0.5").to_string(), "0.5");
        assert_eq!(fixed("-12.250").to_string(), "-12.25");
        assert_eq!(fixed(".75").to_string(), "0.75");
        assert_eq!(fixed("42").to_string(), "42");
        assert_eq!(format!("{:.2}", fixed("3.14159")), "3.14");
        assert_eq!(format!("{:.0}", fixed("2.5")), "3");
        assert_eq!(format!("{:.1}", fixed("-0.25")), "-0.3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Fixed>(), Err(ParseFixedError::Empty));
        assert!(matches!("1.2.3".parse::<Fixed>(), Err(ParseFixedError::InvalidDigit(_))));
        assert!(matches!("abc".parse::<Fixed>(), Err(ParseFixedError::InvalidDigit(_))));
        assert_eq!(
            "0.0000000000000000001".parse::<Fixed>(),
            Err(ParseFixedError::TooPrecise)
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(&fixed("1.5") * &fixed("4"), fixed("6"));
        assert_eq!(&fixed("1") / &fixed("3"), fixed("0.333333333333333333"));
        assert_eq!(&fixed("-1") / &fixed("3"), fixed("-0.333333333333333333"));
        assert_eq!(fixed("10") - fixed("12.5"), fixed("-2.5"));
        assert!(fixed("1").checked_div(&Fixed::zero()).is_none());
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(fixed("2").sqrt().unwrap(), fixed("1.414213562373095048"));
        assert_eq!(fixed("16").sqrt().unwrap(), fixed("4"));
        assert!(fixed("-1").sqrt().is_none());
    }

    #[test]
    fn test_large_reserve_products_do_not_overflow() {
        let reserve = Fixed::from_u256(U256::MAX);
        let k = &reserve * &reserve;
        assert_eq!(k.sqrt().unwrap(), reserve);
    }

    #[test]
    fn test_floor_u256() {
        assert_eq!(fixed("24.695").floor_u256(), Some(U256::from(24u64)));
        assert_eq!(fixed("0.9").floor_u256(), Some(U256::ZERO));
        assert_eq!(fixed("-0.1").floor_u256(), None);
        assert_eq!(Fixed::from_u256(U256::MAX).floor_u256(), Some(U256::MAX));
    }

    #[test]
    fn test_signed_delta_is_exact() {
        let before = U256::from(5_000_000_000_000_000_000u128);
        let after = U256::from(6_234_567_890_123_456_789u128);
        assert_eq!(
            signed_delta(after, before),
            I256::try_from(1_234_567_890_123_456_789i128).unwrap()
        );
        assert_eq!(
            signed_delta(before, after),
            I256::try_from(-1_234_567_890_123_456_789i128).unwrap()
        );
    }
}
