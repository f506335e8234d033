//! SMBus packet error checking
//!
//! PEC is a CRC-8 (x^8 + x^2 + x + 1, init 0, no reflection) over every byte
//! of the transaction, address bytes included.

use crc::{Crc, CRC_8_SMBUS};

const SMBUS_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// How transactions carry a PEC byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PecMode {
    /// No PEC byte
    #[default]
    None,
    /// Append a literal `0x00` in place of the CRC
    Placeholder,
    /// Append the SMBus CRC-8
    Crc8,
}

impl PecMode {
    /// Returns true if transactions carry a PEC byte
    pub fn is_enabled(self) -> bool {
        !matches!(self, PecMode::None)
    }

    /// PEC byte for `bytes`, or `None` when disabled
    pub fn byte_for(self, bytes: &[u8]) -> Option<u8> {
        match self {
            PecMode::None => None,
            PecMode::Placeholder => Some(0x00),
            PecMode::Crc8 => Some(crc8(bytes)),
        }
    }
}

impl std::str::FromStr for PecMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(PecMode::None),
            "placeholder" | "zero" => Ok(PecMode::Placeholder),
            "crc8" | "crc" => Ok(PecMode::Crc8),
            other => Err(format!(
                "unknown PEC mode '{}' (expected none, placeholder or crc8)",
                other
            )),
        }
    }
}

/// SMBus CRC-8 of `bytes`
pub fn crc8(bytes: &[u8]) -> u8 {
    SMBUS_CRC.checksum(bytes)
}
