//! Purpose: Exact base-10 decimals and the packed-decimal (BCD) field codec.
//! Exports: `Decimal`, `PackedFormat`, `MAX_DIGITS`.
//! Role: Leaf codec for `core::descriptor` decimal fields.
//! Invariants: Values are parsed from text; no binary floating point is involved.
//! Invariants: Values that do not fit the declared digits/scale are rejected, never truncated.
//! Notes: Positive values are written with sign nibble 0xF, negative with 0xD.

use crate::core::error::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;

pub const MAX_DIGITS: u8 = 63;

const SIGN_POSITIVE: u8 = 0x0F;
const SIGN_NEGATIVE: u8 = 0x0D;
const SIGN_NEGATIVE_ALT: u8 = 0x0B;

/// Sign + coefficient digits + scale. Zero has an empty coefficient and is never negative.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decimal {
    negative: bool,
    digits: Vec<u8>,
    scale: u32,
}

impl Decimal {
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: Vec::new(),
            scale: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Number of significant coefficient digits.
    pub fn precision(&self) -> usize {
        self.digits.len()
    }

    fn from_parts(negative: bool, mut digits: Vec<u8>, scale: u32) -> Self {
        let leading = digits.iter().take_while(|&&d| d == 0).count();
        digits.drain(..leading);
        let negative = negative && !digits.is_empty();
        Self {
            negative,
            digits,
            scale,
        }
    }

    /// Re-express at `target` fractional digits. Returns `None` when non-zero
    /// digits would be lost.
    pub fn rescale(&self, target: u32) -> Option<Decimal> {
        let mut digits = self.digits.clone();
        if target >= self.scale {
            if !digits.is_empty() {
                digits.extend(std::iter::repeat_n(0, (target - self.scale) as usize));
            }
        } else {
            let drop = (self.scale - target) as usize;
            let cut = digits.len().saturating_sub(drop);
            if digits[cut..].iter().any(|&d| d != 0) {
                return None;
            }
            digits.truncate(cut);
        }
        Some(Decimal::from_parts(self.negative, digits, target))
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            Error::new(ErrorKind::Encoding)
                .with_message(format!("{text:?} is not a decimal number"))
        };
        let trimmed = text.trim();
        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(at) => {
                let exponent: i64 = rest[at + 1..].parse().map_err(|_| invalid())?;
                (&rest[..at], exponent)
            }
            None => (rest, 0),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let mut digits = Vec::with_capacity(int_part.len() + frac_part.len());
        for ch in int_part.bytes().chain(frac_part.bytes()) {
            if !ch.is_ascii_digit() {
                return Err(invalid());
            }
            digits.push(ch - b'0');
        }

        let written_scale = i64::try_from(frac_part.len()).map_err(|_| invalid())?;
        let scale = written_scale.checked_sub(exponent).ok_or_else(invalid)?;
        if scale > written_scale + i64::from(MAX_DIGITS) {
            return Err(Error::new(ErrorKind::Encoding).with_message(format!(
                "{text:?} has an exponent below -{MAX_DIGITS}"
            )));
        }
        if scale < 0 {
            let zeros = usize::try_from(-scale).map_err(|_| invalid())?;
            if zeros > usize::from(MAX_DIGITS) {
                return Err(invalid());
            }
            digits.extend(std::iter::repeat_n(0, zeros));
            return Ok(Decimal::from_parts(negative, digits, 0));
        }
        let scale = u32::try_from(scale).map_err(|_| invalid())?;
        Ok(Decimal::from_parts(negative, digits, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = self.scale as usize;
        let width = self.digits.len().max(scale + 1);
        let mut text = String::with_capacity(width + 2);
        if self.negative {
            text.push('-');
        }
        let pad = width - self.digits.len();
        for i in 0..width {
            if i == width - scale {
                text.push('.');
            }
            let digit = if i < pad { 0 } else { self.digits[i - pad] };
            text.push(char::from(b'0' + digit));
        }
        f.write_str(&text)
    }
}

/// Layout of a packed decimal field: total digits and digits after the point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PackedFormat {
    digits: u8,
    scale: u8,
}

impl PackedFormat {
    pub fn new(digits: u8, scale: u8) -> Result<Self, Error> {
        if digits == 0 || digits > MAX_DIGITS {
            return Err(Error::new(ErrorKind::Schema).with_message(format!(
                "packed decimal size must be between 1 and {MAX_DIGITS}, got {digits}"
            )));
        }
        if scale > digits {
            return Err(Error::new(ErrorKind::Schema).with_message(format!(
                "decimals ({scale}) cannot exceed size ({digits})"
            )));
        }
        Ok(Self { digits, scale })
    }

    pub fn digits(&self) -> u8 {
        self.digits
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn width(&self) -> usize {
        usize::from(self.digits) / 2 + 1
    }

    pub fn pack_into(&self, value: &Decimal, out: &mut Vec<u8>) -> Result<(), Error> {
        let scaled = value.rescale(u32::from(self.scale)).ok_or_else(|| {
            Error::new(ErrorKind::Encoding).with_message(format!(
                "{value} has more than {} fractional digits",
                self.scale
            ))
        })?;
        if scaled.precision() > usize::from(self.digits) {
            return Err(Error::new(ErrorKind::Encoding).with_message(format!(
                "{value} needs {} digits at scale {}, field holds {}",
                scaled.precision(),
                self.scale,
                self.digits
            )));
        }

        let nibble_count = self.width() * 2;
        let pad = nibble_count - 1 - scaled.digits.len();
        let mut nibbles = Vec::with_capacity(nibble_count);
        nibbles.extend(std::iter::repeat_n(0u8, pad));
        nibbles.extend_from_slice(&scaled.digits);
        nibbles.push(if scaled.negative {
            SIGN_NEGATIVE
        } else {
            SIGN_POSITIVE
        });

        out.extend(nibbles.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]));
        Ok(())
    }

    /// Inverse of `pack_into`; `bytes` must already be `width()` long.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Decimal, Error> {
        let mut digits = Vec::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            digits.push(byte >> 4);
            digits.push(byte & 0x0F);
        }
        let sign = digits.pop().unwrap_or(SIGN_POSITIVE);
        if let Some(pos) = digits.iter().position(|&d| d > 9) {
            return Err(Error::new(ErrorKind::Decoding).with_message(format!(
                "invalid packed digit 0x{:X} at nibble {pos}",
                digits[pos]
            )));
        }
        let negative = sign == SIGN_NEGATIVE || sign == SIGN_NEGATIVE_ALT;
        Ok(Decimal::from_parts(negative, digits, u32::from(self.scale)))
    }
}

#[cfg(test)]
mod tests {
    use super::{Decimal, MAX_DIGITS, PackedFormat};
    use crate::core::error::ErrorKind;

    fn dec(text: &str) -> Decimal {
        text.parse().expect("decimal")
    }

    fn pack(format: PackedFormat, text: &str) -> Vec<u8> {
        let mut out = Vec::new();
        format.pack_into(&dec(text), &mut out).expect("pack");
        out
    }

    #[test]
    fn parses_and_formats_exactly() {
        assert_eq!(dec("12.50").to_string(), "12.50");
        assert_eq!(dec("-0.05").to_string(), "-0.05");
        assert_eq!(dec(".5").to_string(), "0.5");
        assert_eq!(dec("007").to_string(), "7");
        assert_eq!(dec("1.2e2").to_string(), "120");
        assert_eq!(dec("15E-3").to_string(), "0.015");
        assert_eq!(dec("-0.00").to_string(), "0.00");
        assert!(!dec("-0").is_negative());
    }

    #[test]
    fn rejects_non_numeric_text() {
        for text in ["", "-", "1.2.3", "12a", "e5", "1e", "0x10"] {
            let err = text.parse::<Decimal>().expect_err(text);
            assert_eq!(err.kind(), ErrorKind::Encoding, "{text}");
        }
    }

    #[test]
    fn rejects_exponents_beyond_digit_limit() {
        for text in ["1e-300000000", "1e-4000000000", "5e-64", "1e-9223372036854775808"] {
            let err = text.parse::<Decimal>().expect_err(text);
            assert_eq!(err.kind(), ErrorKind::Encoding, "{text}");
            assert!(err.message().unwrap_or_default().len() < 100, "{text}");
        }
        assert_eq!(dec("1.5e-63").scale(), 64);
        assert_eq!(dec("1e-63").to_string().len(), 65);
    }

    #[test]
    fn rescale_keeps_value_or_refuses() {
        assert_eq!(dec("12.5").rescale(2).unwrap().to_string(), "12.50");
        assert_eq!(dec("12.500").rescale(1).unwrap().to_string(), "12.5");
        assert_eq!(dec("0.000").rescale(0).unwrap().to_string(), "0");
        assert!(dec("12.345").rescale(2).is_none());
        assert!(dec("0.001").rescale(0).is_none());
    }

    #[test]
    fn width_follows_digit_count() {
        assert_eq!(PackedFormat::new(1, 0).unwrap().width(), 1);
        assert_eq!(PackedFormat::new(4, 0).unwrap().width(), 3);
        assert_eq!(PackedFormat::new(7, 2).unwrap().width(), 4);
        assert_eq!(PackedFormat::new(MAX_DIGITS, 0).unwrap().width(), 32);
    }

    #[test]
    fn packs_odd_and_even_digit_counts() {
        let amt = PackedFormat::new(7, 2).unwrap();
        assert_eq!(pack(amt, "12.5"), vec![0x00, 0x01, 0x25, 0x0F]);
        assert_eq!(pack(amt, "-3.14"), vec![0x00, 0x00, 0x31, 0x4D]);

        let even = PackedFormat::new(4, 0).unwrap();
        assert_eq!(pack(even, "1234"), vec![0x01, 0x23, 0x4F]);
        assert_eq!(pack(even, "0"), vec![0x00, 0x00, 0x0F]);
    }

    #[test]
    fn overflow_is_rejected_not_truncated() {
        let format = PackedFormat::new(3, 0).unwrap();
        let mut out = Vec::new();
        let err = format.pack_into(&dec("1234"), &mut out).expect_err("too many digits");
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let err = format.pack_into(&dec("1.5"), &mut out).expect_err("too many decimals");
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(out.is_empty());
    }

    #[test]
    fn unpack_reads_sign_variants() {
        let format = PackedFormat::new(5, 2).unwrap();
        assert_eq!(format.unpack(&[0x00, 0x31, 0x4D]).unwrap().to_string(), "-3.14");
        assert_eq!(format.unpack(&[0x00, 0x31, 0x4B]).unwrap().to_string(), "-3.14");
        assert_eq!(format.unpack(&[0x00, 0x31, 0x4C]).unwrap().to_string(), "3.14");
        assert_eq!(format.unpack(&[0x00, 0x00, 0x00]).unwrap().to_string(), "0.00");
    }

    #[test]
    fn unpack_rejects_bad_digit_nibble() {
        let format = PackedFormat::new(3, 0).unwrap();
        let err = format.unpack(&[0x1A, 0x3F]).expect_err("bad nibble");
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn invalid_layouts_are_schema_errors() {
        assert_eq!(PackedFormat::new(0, 0).unwrap_err().kind(), ErrorKind::Schema);
        assert_eq!(PackedFormat::new(64, 0).unwrap_err().kind(), ErrorKind::Schema);
        assert_eq!(PackedFormat::new(3, 4).unwrap_err().kind(), ErrorKind::Schema);
    }
}
