//! PMBus numeric encodings
//!
//! ## Linear11 (signed)
//!
//! ```text
//! |--------- 16-bit ---------|
//! | N (5 bits) | Y (11 bits) |
//! ```
//!
//! Value = Y * 2^N with both N and Y two's complement, so -16 <= N <= 15 and
//! -1024 <= Y <= 1023. The exponent travels with every value.
//!
//! ## Linear16 (unsigned)
//!
//! Value = Y * 2^N with a 16-bit unsigned Y and an exponent that is fixed per
//! device and NOT carried in the data word. The LTM4673 uses N = -13, which
//! covers 0 to ~7.99988 in steps of ~122 uV. Another device needs its own
//! exponent (usually read from VOUT_MODE).
//!
//! ## Raw
//!
//! Plain integer, no conversion.

use core::fmt;

use crate::error::{Error, Result};

/// Fixed Linear16 exponent of the LTM4673 (value = raw * 2^-13)
pub const LINEAR16_EXPONENT: i32 = -13;

/// Smallest Linear11 exponent
pub const LINEAR11_EXP_MIN: i32 = -16;
/// Largest Linear11 exponent
pub const LINEAR11_EXP_MAX: i32 = 15;
/// Smallest Linear11 mantissa
pub const LINEAR11_MANT_MIN: i32 = -1024;
/// Largest Linear11 mantissa
pub const LINEAR11_MANT_MAX: i32 = 1023;

/// Numeric encoding of a register's data word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "files", derive(serde::Serialize, serde::Deserialize))]
pub enum Encoding {
    /// Integer pass-through
    #[default]
    Raw,
    /// Signed 5-bit exponent, 11-bit mantissa
    Linear11,
    /// Unsigned 16-bit mantissa, fixed exponent
    Linear16,
}

impl Encoding {
    /// Convert a data word to engineering units
    pub fn decode(self, raw: u16) -> f64 {
        match self {
            Encoding::Raw => raw as f64,
            Encoding::Linear11 => linear11_decode(raw),
            Encoding::Linear16 => linear16_decode(raw),
        }
    }

    /// Convert engineering units to a data word
    pub fn encode(self, value: f64) -> Result<u16> {
        match self {
            Encoding::Raw => raw_encode(value),
            Encoding::Linear11 => linear11_encode(value),
            Encoding::Linear16 => linear16_encode(value),
        }
    }

    /// Size of one encoding step at `raw`
    pub fn step(self, raw: u16) -> f64 {
        match self {
            Encoding::Raw => 1.0,
            Encoding::Linear11 => 2f64.powi(linear11_exponent(raw)),
            Encoding::Linear16 => 2f64.powi(LINEAR16_EXPONENT),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Raw => write!(f, "raw"),
            Encoding::Linear11 => write!(f, "L11"),
            Encoding::Linear16 => write!(f, "L16"),
        }
    }
}

/// Convert a data word to engineering units using `encoding`
pub fn decode(encoding: Encoding, raw: u16) -> f64 {
    encoding.decode(raw)
}

/// Convert engineering units to a data word using `encoding`
pub fn encode(encoding: Encoding, value: f64) -> Result<u16> {
    encoding.encode(value)
}

/// Sign-extended exponent field of a Linear11 word
pub fn linear11_exponent(raw: u16) -> i32 {
    let n = ((raw >> 11) & 0x1F) as i32;
    if n & 0x10 != 0 {
        n - 0x20
    } else {
        n
    }
}

/// Sign-extended mantissa field of a Linear11 word
pub fn linear11_mantissa(raw: u16) -> i32 {
    let y = (raw & 0x7FF) as i32;
    if y & 0x400 != 0 {
        y - 0x800
    } else {
        y
    }
}

/// Decode a Linear11 word
pub fn linear11_decode(raw: u16) -> f64 {
    linear11_mantissa(raw) as f64 * 2f64.powi(linear11_exponent(raw))
}

/// Encode a value as Linear11
///
/// Picks the smallest exponent whose scaled mantissa still fits in
/// [-1024, 1023], then truncates the mantissa toward zero. Scaling by a
/// power of two is exact in `f64`, so the truncation is the only rounding.
pub fn linear11_encode(value: f64) -> Result<u16> {
    let range_error = || Error::EncodingRange {
        encoding: Encoding::Linear11,
        value,
    };
    if !value.is_finite() {
        return Err(range_error());
    }

    for n in LINEAR11_EXP_MIN..=LINEAR11_EXP_MAX {
        let scaled = value * 2f64.powi(-n);
        if scaled >= LINEAR11_MANT_MIN as f64 && scaled <= LINEAR11_MANT_MAX as f64 {
            let y = scaled.trunc() as i32;
            return Ok((((n as u16) & 0x1F) << 11) | ((y as u16) & 0x7FF));
        }
    }

    Err(range_error())
}

/// Decode a Linear16 word (LTM4673 exponent)
pub fn linear16_decode(raw: u16) -> f64 {
    raw as f64 * 2f64.powi(LINEAR16_EXPONENT)
}

/// Encode a value as Linear16 (LTM4673 exponent), rounding to nearest
pub fn linear16_encode(value: f64) -> Result<u16> {
    let scaled = (value * 2f64.powi(-LINEAR16_EXPONENT)).round();
    if !scaled.is_finite() || !(0.0..=u16::MAX as f64).contains(&scaled) {
        return Err(Error::EncodingRange {
            encoding: Encoding::Linear16,
            value,
        });
    }
    Ok(scaled as u16)
}

fn raw_encode(value: f64) -> Result<u16> {
    if !value.is_finite() || !(0.0..=u16::MAX as f64).contains(&value) {
        return Err(Error::EncodingRange {
            encoding: Encoding::Raw,
            value,
        });
    }
    Ok(value.trunc() as u16)
}
