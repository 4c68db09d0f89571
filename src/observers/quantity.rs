//! Kubernetes resource quantities
//!
//! Quantities are held as a whole number of nano-units so that sums of usage
//! figures stay exact. Parsing and unit conversion both round up, matching how
//! the API server reports milli-values.

use crate::error::PluginError;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

const NANOS_PER_UNIT: i128 = 1_000_000_000;
const NANOS_PER_MILLI: i128 = 1_000_000;

/// A parsed resource quantity such as `250m`, `128Mi` or `1e3`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quantity {
    nanos: i128,
}

enum Suffix {
    /// Power of ten
    Decimal(i32),
    /// Power of 1024
    Binary(u32),
}

impl Quantity {
    pub fn from_nanos(nanos: i128) -> Self {
        Self { nanos }
    }

    pub fn nanos(&self) -> i128 {
        self.nanos
    }

    /// Value in whole thousandths, rounded up
    pub fn milli_value(&self) -> i128 {
        div_ceil(self.nanos, NANOS_PER_MILLI)
    }

    /// Value in whole units, rounded up
    pub fn value(&self) -> i128 {
        div_ceil(self.nanos, NANOS_PER_UNIT)
    }

    pub fn as_f64(&self) -> f64 {
        self.nanos as f64 / NANOS_PER_UNIT as f64
    }

    fn parse_suffix(suffix: &str) -> Option<Suffix> {
        let suffix = match suffix {
            "" => Suffix::Decimal(0),
            "n" => Suffix::Decimal(-9),
            "u" => Suffix::Decimal(-6),
            "m" => Suffix::Decimal(-3),
            "k" => Suffix::Decimal(3),
            "M" => Suffix::Decimal(6),
            "G" => Suffix::Decimal(9),
            "T" => Suffix::Decimal(12),
            "P" => Suffix::Decimal(15),
            "E" => Suffix::Decimal(18),
            "Ki" => Suffix::Binary(1),
            "Mi" => Suffix::Binary(2),
            "Gi" => Suffix::Binary(3),
            "Ti" => Suffix::Binary(4),
            "Pi" => Suffix::Binary(5),
            "Ei" => Suffix::Binary(6),
            other => {
                let exponent = other.strip_prefix(|c: char| c == 'e' || c == 'E')?;
                Suffix::Decimal(exponent.parse().ok()?)
            }
        };
        Some(suffix)
    }
}

impl FromStr for Quantity {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PluginError::Decode(format!("invalid quantity '{}'", s));
        let overflow = || PluginError::Decode(format!("quantity '{}' is out of range", s));

        let text = s.trim();
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let split = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(split);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        let suffix = Self::parse_suffix(suffix).ok_or_else(invalid)?;

        let digits = format!("{}{}", whole, fraction);
        let mantissa: i128 = digits.parse().map_err(|_| overflow())?;
        let decimals = i32::try_from(fraction.len()).map_err(|_| overflow())?;

        let nanos = match suffix {
            Suffix::Decimal(exponent) => {
                let shift = 9i32
                    .checked_add(exponent)
                    .and_then(|v| v.checked_sub(decimals))
                    .ok_or_else(overflow)?;
                if shift >= 0 {
                    let factor = 10i128.checked_pow(shift as u32).ok_or_else(overflow)?;
                    mantissa.checked_mul(factor).ok_or_else(overflow)?
                } else {
                    match 10i128.checked_pow(shift.unsigned_abs()) {
                        Some(divisor) => div_ceil(mantissa, divisor),
                        // Smaller than one nano-unit
                        None => i128::from(mantissa > 0),
                    }
                }
            }
            Suffix::Binary(power) => {
                let scaled = mantissa
                    .checked_mul(1i128 << (10 * power))
                    .and_then(|v| v.checked_mul(NANOS_PER_UNIT))
                    .ok_or_else(overflow)?;
                let divisor = 10i128.checked_pow(decimals as u32).ok_or_else(overflow)?;
                div_ceil(scaled, divisor)
            }
        };

        Ok(Self::from_nanos(if negative { -nanos } else { nanos }))
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, other: Quantity) -> Quantity {
        Quantity::from_nanos(self.nanos.saturating_add(other.nanos))
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::default(), Add::add)
    }
}

/// Integer division rounding towards positive infinity
fn div_ceil(a: i128, b: i128) -> i128 {
    let quotient = a / b;
    if a % b > 0 {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_decimal_suffixes() {
        assert_eq!(q("250m").as_f64(), 0.25);
        assert_eq!(q("2").value(), 2);
        assert_eq!(q("1k").value(), 1000);
        assert_eq!(q("3M").value(), 3_000_000);
        assert_eq!(q("1G").value(), 1_000_000_000);
        assert_eq!(q("500u").nanos(), 500_000);
        assert_eq!(q("42n").nanos(), 42);
    }

    #[test]
    fn test_binary_suffixes() {
        assert_eq!(q("1Ki").value(), 1024);
        assert_eq!(q("128Mi").value(), 128 * 1024 * 1024);
        assert_eq!(q("1.5Gi").value(), 1_610_612_736);
    }

    #[test]
    fn test_exponents() {
        assert_eq!(q("1e3").value(), 1000);
        assert_eq!(q("12E-3").milli_value(), 12);
        assert_eq!(q("2.5e2").value(), 250);
    }

    #[test]
    fn test_conversions_round_up() {
        assert_eq!(q("1n").milli_value(), 1);
        assert_eq!(q("1500001n").milli_value(), 2);
        assert_eq!(q("100m").value(), 1);
        assert_eq!(q("1e-12").nanos(), 1);
    }

    #[test]
    fn test_sum_is_exact() {
        let total: Quantity = ["0.1", "0.2"].iter().map(|s| q(s)).sum();
        assert_eq!(total.milli_value(), 300);

        let cpu: Quantity = ["125m", "250m", "1"].iter().map(|s| q(s)).sum();
        assert_eq!(cpu.milli_value(), 1375);
    }

    #[test]
    fn test_signs_and_whitespace() {
        assert_eq!(q(" +5 ").value(), 5);
        assert_eq!(q("-250m").milli_value(), -250);
    }

    #[test]
    fn test_rejects_invalid() {
        for bad in ["", "abc", "1.2.3", "5Zi", "m", "1e", "1ee3", "."] {
            assert!(
                matches!(bad.parse::<Quantity>(), Err(PluginError::Decode(_))),
                "'{}' should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!("99999999999999999999999999999999999999999".parse::<Quantity>().is_err());
        assert!("1e40".parse::<Quantity>().is_err());
        assert!(matches!(
            "1e2147483647".parse::<Quantity>(),
            Err(PluginError::Decode(_))
        ));
    }
}
