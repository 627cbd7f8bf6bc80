// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Numeric scalar for payload values.
//
// JSON payloads routinely carry 64-bit ids and the occasional integer that
// does not fit in 64 bits; literal rendering must round-trip those exactly,
// so integers get a big-int fallback instead of being forced through f64.

use core::cmp::Ordering;
use core::fmt::{self, Debug, Formatter};
use core::str::FromStr;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::ser::Serializer;
use serde::Serialize;

#[derive(Clone)]
pub enum Number {
    UInt(u64),
    Int(i64),
    Float(f64),
    Big(Arc<BigInt>),
}

impl Number {
    fn from_bigint_owned(value: BigInt) -> Self {
        if value.is_zero() {
            return Number::Int(0);
        }
        if value.is_negative() {
            if let Some(i) = value.to_i64() {
                return Number::Int(i);
            }
        } else if let Some(u) = value.to_u64() {
            return Number::UInt(u);
        }
        Number::Big(Arc::new(value))
    }

    fn to_bigint_owned(&self) -> Option<BigInt> {
        match self {
            Number::UInt(v) => Some(BigInt::from(*v)),
            Number::Int(v) => Some(BigInt::from(*v)),
            Number::Big(v) => Some((**v).clone()),
            Number::Float(f)
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007199254740992e15 =>
            {
                Some(BigInt::from(*f as i64))
            }
            Number::Float(_) => None,
        }
    }

    fn to_f64_lossy(&self) -> f64 {
        match self {
            Number::UInt(v) => *v as f64,
            Number::Int(v) => *v as f64,
            Number::Float(v) => *v,
            Number::Big(v) => match v.to_f64() {
                Some(f) => f,
                None if v.is_negative() => f64::NEG_INFINITY,
                None => f64::INFINITY,
            },
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.to_f64_lossy()
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Number::UInt(v) => Some(*v),
            Number::Int(v) => u64::try_from(*v).ok(),
            Number::Big(v) => v.to_u64(),
            Number::Float(f) if f.fract() == 0.0 && *f >= 0.0 => {
                Some(*f as u64)
            }
            Number::Float(_) => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_u64().and_then(|u| usize::try_from(u).ok())
    }

    pub fn is_integer(&self) -> bool {
        match self {
            Number::UInt(_) | Number::Int(_) | Number::Big(_) => true,
            Number::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    /// Decimal rendering that parses back to an equal number.
    pub fn to_literal(&self) -> String {
        match self {
            Number::UInt(v) => v.to_string(),
            Number::Int(v) => v.to_string(),
            Number::Big(v) => v.to_string(),
            Number::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => n.to_string(),
                None => f.to_string(),
            },
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let v = serde_json::Number::from_str(&self.to_literal())
            .map_err(|_| serde::ser::Error::custom("could not serialize number"))?;
        v.serialize(serializer)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::UInt(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value.into())
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::UInt(value as u64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number::from_bigint_owned(value)
    }
}

impl FromStr for Number {
    type Err = ParseNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseNumberError);
        }

        let is_integer_literal =
            !trimmed.contains('.') && !trimmed.contains('e') && !trimmed.contains('E');
        if is_integer_literal {
            let (negative, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
            };
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Some(mut value) = BigInt::parse_bytes(digits.as_bytes(), 10) {
                    if negative {
                        value = -value;
                    }
                    return Ok(Number::from_bigint_owned(value));
                }
            }
            return Err(ParseNumberError);
        }

        trimmed
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| ParseNumberError)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseNumberError;

impl fmt::Display for ParseNumberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("not a decimal number")
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.to_bigint_owned(), other.to_bigint_owned()) {
            return a == b;
        }
        let a = self.to_f64_lossy();
        let b = other.to_f64_lossy();
        if a.is_nan() || b.is_nan() {
            return false;
        }
        a == b
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (self.to_bigint_owned(), other.to_bigint_owned()) {
            return a.cmp(&b);
        }
        self.to_f64_lossy()
            .partial_cmp(&other.to_f64_lossy())
            .unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_round_trip() {
        for s in [
            "0",
            "42",
            "-17",
            "18446744073709551615",
            "123456789012345678901234567890",
        ] {
            let n = Number::from_str(s).unwrap();
            assert_eq!(n.to_literal(), s);
        }
    }

    #[test]
    fn float_literals_keep_fraction() {
        let n = Number::from_str("1.5").unwrap();
        assert_eq!(n.to_literal(), "1.5");
        let whole = Number::from(2.0);
        assert_eq!(whole.to_literal(), "2.0");
    }

    #[test]
    fn equality_is_numeric_across_variants() {
        assert_eq!(Number::from(3_i64), Number::from(3_u64));
        assert_eq!(Number::from(3_i64), Number::from(3.0));
        assert_ne!(Number::from(3_i64), Number::from(3.5));
    }

    #[test]
    fn rejects_non_numbers() {
        assert!(Number::from_str("").is_err());
        assert!(Number::from_str("abc").is_err());
        assert!(Number::from_str("12ab").is_err());
    }
}
