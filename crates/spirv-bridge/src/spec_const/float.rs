//! Decimal literal to IEEE-754 conversion with exception status.
//!
//! The standard library parses `f32`/`f64` with correct rounding, but does
//! not say whether the result was exact, overflowed or underflowed. That
//! status is recovered here with an exact big-integer comparison between the
//! decimal literal and the rounded result. Half precision is rounded from
//! the double approximation, with ties on a half-precision midpoint settled
//! against the exact decimal value.

// Bit packing of IEEE fields uses explicit narrowing casts.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use std::cmp::Ordering;

/// Binary interchange formats a specialization constant may be given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatFormat {
    Half,
    Single,
    Double,
}

impl FloatFormat {
    #[must_use]
    pub fn from_width(width: u32) -> Option<Self> {
        match width {
            16 => Some(Self::Half),
            32 => Some(Self::Single),
            64 => Some(Self::Double),
            _ => None,
        }
    }

    #[must_use]
    pub fn width(self) -> u32 {
        match self {
            Self::Half => 16,
            Self::Single => 32,
            Self::Double => 64,
        }
    }

    fn sign_bit(self) -> u64 {
        1 << (self.width() - 1)
    }

    fn infinity(self, negative: bool) -> u64 {
        let bits = match self {
            Self::Half => 0x7c00,
            Self::Single => 0x7f80_0000,
            Self::Double => 0x7ff0_0000_0000_0000,
        };
        if negative { bits | self.sign_bit() } else { bits }
    }

    fn quiet_nan(self, negative: bool) -> u64 {
        let bits = match self {
            Self::Half => 0x7e00,
            Self::Single => 0x7fc0_0000,
            Self::Double => 0x7ff8_0000_0000_0000,
        };
        if negative { bits | self.sign_bit() } else { bits }
    }

    /// Smallest positive normal value, as a double.
    fn min_normal(self) -> f64 {
        match self {
            Self::Half => pow2(-14),
            Self::Single => f64::from(f32::MIN_POSITIVE),
            Self::Double => f64::MIN_POSITIVE,
        }
    }
}

/// IEEE exception flags raised by a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub inexact: bool,
    pub overflow: bool,
    pub underflow: bool,
}

impl Status {
    pub const OK: Self = Self {
        inexact: false,
        overflow: false,
        underflow: false,
    };

    /// True when nothing worse than rounding happened.
    #[must_use]
    pub fn is_acceptable(self) -> bool {
        !self.overflow && !self.underflow
    }
}

/// A converted value: its bit pattern zero-extended to 64 bits, and the
/// flags raised while rounding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converted {
    pub bits: u64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid floating point literal {0:?}")]
pub struct SyntaxError(pub String);

/// Convert a decimal literal to `format` with round-to-nearest-even.
///
/// Accepted syntax is `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
/// plus the case-insensitive words `inf`, `infinity` and `nan`.
pub fn convert_decimal(text: &str, format: FloatFormat) -> Result<Converted, SyntaxError> {
    let syntax_error = || SyntaxError(text.to_string());

    let decimal = match parse_literal(text).ok_or_else(syntax_error)? {
        Literal::Infinity { negative } => {
            return Ok(Converted {
                bits: format.infinity(negative),
                status: Status::OK,
            });
        }
        Literal::Nan { negative } => {
            return Ok(Converted {
                bits: format.quiet_nan(negative),
                status: Status::OK,
            });
        }
        Literal::Finite(decimal) => decimal,
    };

    let (bits, value) = match format {
        FloatFormat::Double => {
            let value: f64 = text.parse().map_err(|_| syntax_error())?;
            (value.to_bits(), value)
        }
        FloatFormat::Single => {
            let value: f32 = text.parse().map_err(|_| syntax_error())?;
            (u64::from(value.to_bits()), f64::from(value))
        }
        FloatFormat::Half => {
            let approx: f64 = text.parse().map_err(|_| syntax_error())?;
            let half = round_to_half(approx, &decimal);
            (u64::from(half), half_to_f64(half))
        }
    };

    Ok(Converted {
        bits,
        status: status_of(&decimal, value, format),
    })
}

fn status_of(decimal: &Decimal, value: f64, format: FloatFormat) -> Status {
    if value.is_infinite() {
        return Status {
            inexact: true,
            overflow: true,
            underflow: false,
        };
    }
    let exact = compare_magnitude(decimal, value) == Ordering::Equal;
    let tiny = value.abs() < format.min_normal();
    Status {
        inexact: !exact,
        overflow: false,
        underflow: tiny && !exact,
    }
}

enum Literal {
    Finite(Decimal),
    Infinity { negative: bool },
    Nan { negative: bool },
}

/// Significant digits kept for exact comparisons. An `f64`, or a midpoint
/// between two of them, needs at most 767 to be written out exactly, so
/// anything past this can only make a literal inexact.
const MAX_DIGITS: usize = 800;

/// `digits * 10^exponent`, with the sign kept aside.
#[derive(Debug)]
struct Decimal {
    /// Significant digit values (0..=9) without leading or trailing zeros.
    /// Empty for zero.
    digits: Vec<u8>,
    exponent: i64,
    /// Nonzero digits were cut off past [`MAX_DIGITS`].
    truncated: bool,
}

fn parse_literal(text: &str) -> Option<Literal> {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    if body.eq_ignore_ascii_case("inf") || body.eq_ignore_ascii_case("infinity") {
        return Some(Literal::Infinity { negative });
    }
    if body.eq_ignore_ascii_case("nan") {
        return Some(Literal::Nan { negative });
    }

    let bytes = body.as_bytes();
    let mut pos = 0;
    let mut digits = Vec::new();
    let mut exponent: i64 = 0;
    let mut seen_digit = false;

    while let Some(&b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
        push_digit(&mut digits, b);
        seen_digit = true;
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        while let Some(&b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
            push_digit(&mut digits, b);
            exponent -= 1;
            seen_digit = true;
            pos += 1;
        }
    }
    if !seen_digit {
        return None;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        let exp_negative = match bytes.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };
        let start = pos;
        let mut value: i64 = 0;
        while let Some(&b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
            value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
            pos += 1;
        }
        if pos == start {
            return None;
        }
        exponent = if exp_negative {
            exponent.saturating_sub(value)
        } else {
            exponent.saturating_add(value)
        };
    }

    if pos != bytes.len() {
        return None;
    }

    while digits.last() == Some(&0) {
        digits.pop();
        exponent = exponent.saturating_add(1);
    }
    // Trailing zeros are gone, so a cut always drops a nonzero digit.
    let truncated = digits.len() > MAX_DIGITS;
    if truncated {
        let dropped = digits.len() - MAX_DIGITS;
        digits.truncate(MAX_DIGITS);
        exponent = exponent.saturating_add(dropped as i64);
    }
    Some(Literal::Finite(Decimal {
        digits,
        exponent,
        truncated,
    }))
}

fn push_digit(digits: &mut Vec<u8>, ascii: u8) {
    let digit = ascii - b'0';
    if digits.is_empty() && digit == 0 {
        return;
    }
    digits.push(digit);
}

/// Split a finite non-negative double into `mantissa * 2^exponent`.
fn decompose(value: f64) -> (u64, i32) {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    }
}

fn pow2(exponent: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exponent));
    f64::from_bits(((exponent + 1023) as u64) << 52)
}

/// Compare `|decimal|` against `|value|` exactly. `value` must be finite.
fn compare_magnitude(decimal: &Decimal, value: f64) -> Ordering {
    let (mantissa, exp2) = decompose(value.abs());
    match (decimal.digits.is_empty(), mantissa == 0) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    let mut lhs = BigUint::from_digits(&decimal.digits);
    let mut rhs = BigUint::from_u64(mantissa);

    // 10^q = 5^q * 2^q; move negative powers to the other side.
    let q = decimal.exponent.unsigned_abs();
    if decimal.exponent >= 0 {
        lhs.mul_pow5(q);
        lhs.shl(q);
    } else {
        rhs.mul_pow5(q);
        rhs.shl(q);
    }
    let e = u64::from(exp2.unsigned_abs());
    if exp2 >= 0 {
        rhs.shl(e);
    } else {
        lhs.shl(e);
    }

    match lhs.cmp(&rhs) {
        Ordering::Equal if decimal.truncated => Ordering::Greater,
        ordering => ordering,
    }
}

const HALF_PRECISION: i32 = 11;
const HALF_MIN_EXP: i32 = -24;
const HALF_MAX_EXP: i32 = 5;

/// Round a double approximation of `decimal` to half precision.
fn round_to_half(approx: f64, decimal: &Decimal) -> u16 {
    let sign: u16 = if approx.is_sign_negative() { 0x8000 } else { 0 };
    if approx.is_nan() {
        return sign | 0x7e00;
    }
    if approx.is_infinite() {
        return sign | 0x7c00;
    }

    let (mantissa, exp2) = decompose(approx.abs());
    if mantissa == 0 {
        return sign;
    }

    let len = 64 - mantissa.leading_zeros() as i32;
    let mut exponent = (exp2 + len - HALF_PRECISION).max(HALF_MIN_EXP);
    let shift = exponent - exp2;

    let mut significand = if shift <= 0 {
        mantissa << shift.unsigned_abs()
    } else if shift > 64 {
        // Below half the smallest subnormal.
        0
    } else {
        let wide = u128::from(mantissa);
        let quotient = (wide >> shift) as u64;
        let remainder = wide & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        let round_up = match remainder.cmp(&half) {
            Ordering::Less => false,
            Ordering::Greater => true,
            // The double sits exactly on a half-precision midpoint; the
            // decimal itself decides which way it goes.
            Ordering::Equal => match compare_magnitude(decimal, approx) {
                Ordering::Less => false,
                Ordering::Greater => true,
                Ordering::Equal => quotient & 1 == 1,
            },
        };
        quotient + u64::from(round_up)
    };

    if significand == 1 << HALF_PRECISION {
        significand >>= 1;
        exponent += 1;
    }
    if exponent > HALF_MAX_EXP {
        return sign | 0x7c00;
    }

    if significand >= 1 << (HALF_PRECISION - 1) {
        let biased = (exponent - HALF_MIN_EXP + 1) as u16;
        sign | (biased << 10) | (significand as u16 & 0x3ff)
    } else {
        sign | significand as u16
    }
}

/// Exact value of a half-precision bit pattern.
#[must_use]
pub fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 == 0 { 1.0 } else { -1.0 };
    let biased = i32::from((bits >> 10) & 0x1f);
    let fraction = f64::from(bits & 0x3ff);
    match biased {
        0 => sign * fraction * pow2(HALF_MIN_EXP),
        0x1f if fraction == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1024.0 + fraction) * pow2(biased - 25),
    }
}

/// Little-endian arbitrary precision unsigned integer, just enough for
/// exact decimal/binary comparisons.
#[derive(Debug, Clone)]
struct BigUint {
    limbs: Vec<u32>,
}

impl BigUint {
    fn from_u64(value: u64) -> Self {
        Self {
            limbs: vec![value as u32, (value >> 32) as u32],
        }
    }

    fn from_digits(digits: &[u8]) -> Self {
        let mut n = Self { limbs: vec![0] };
        for &d in digits {
            n.mul_small(10);
            n.add_small(u32::from(d));
        }
        n
    }

    fn mul_small(&mut self, factor: u32) {
        let mut carry = 0u64;
        for limb in &mut self.limbs {
            let product = u64::from(*limb) * u64::from(factor) + carry;
            *limb = product as u32;
            carry = product >> 32;
        }
        if carry != 0 {
            self.limbs.push(carry as u32);
        }
    }

    fn add_small(&mut self, addend: u32) {
        let mut carry = u64::from(addend);
        for limb in &mut self.limbs {
            if carry == 0 {
                return;
            }
            let sum = u64::from(*limb) + carry;
            *limb = sum as u32;
            carry = sum >> 32;
        }
        if carry != 0 {
            self.limbs.push(carry as u32);
        }
    }

    fn mul_pow5(&mut self, mut exponent: u64) {
        // 5^13 is the largest power of five below 2^32.
        const POW5_13: u32 = 1_220_703_125;
        while exponent >= 13 {
            self.mul_small(POW5_13);
            exponent -= 13;
        }
        self.mul_small(5u32.pow(exponent as u32));
    }

    fn shl(&mut self, bits: u64) {
        let words = (bits / 32) as usize;
        let rest = (bits % 32) as u32;
        if rest != 0 {
            let mut carry = 0u32;
            for limb in &mut self.limbs {
                let shifted = (u64::from(*limb) << rest) | u64::from(carry);
                *limb = shifted as u32;
                carry = (shifted >> 32) as u32;
            }
            if carry != 0 {
                self.limbs.push(carry);
            }
        }
        if words != 0 {
            self.limbs.splice(0..0, std::iter::repeat_n(0, words));
        }
    }

    fn significant(&self) -> &[u32] {
        let len = self
            .limbs
            .iter()
            .rposition(|&limb| limb != 0)
            .map_or(0, |i| i + 1);
        &self.limbs[..len]
    }

    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.iter().rev().cmp(b.iter().rev()))
    }
}
