//! Channel status check

use std::fmt;

use bitflags::bitflags;

use crate::command::reg;
use crate::error::Result;
use crate::program::{Readback, DEVICE_PAGES};
use crate::transaction::{Transaction, TransactionBuilder};

bitflags! {
    /// PMBus STATUS_WORD bits
    ///
    /// The low byte is STATUS_BYTE; the high byte summarizes the detailed
    /// status registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusWord: u16 {
        /// A fault not covered by the other bits
        const NONE_OF_THE_ABOVE = 1 << 0;
        /// Communication, memory or logic fault
        const CML               = 1 << 1;
        /// Temperature fault or warning
        const TEMPERATURE       = 1 << 2;
        /// Input undervoltage fault
        const VIN_UV_FAULT      = 1 << 3;
        /// Output overcurrent fault
        const IOUT_OC_FAULT     = 1 << 4;
        /// Output overvoltage fault
        const VOUT_OV_FAULT     = 1 << 5;
        /// Output is off
        const OFF               = 1 << 6;
        /// Device busy
        const BUSY              = 1 << 7;
        /// Unknown fault
        const UNKNOWN           = 1 << 8;
        /// Other fault (see STATUS_OTHER)
        const OTHER             = 1 << 9;
        /// Fan fault
        const FANS              = 1 << 10;
        /// POWER_GOOD is negated
        const POWER_GOOD_N      = 1 << 11;
        /// Manufacturer specific fault
        const MFR_SPECIFIC      = 1 << 12;
        /// Input fault or warning
        const INPUT             = 1 << 13;
        /// Output current or power fault or warning
        const IOUT_POUT         = 1 << 14;
        /// Output voltage fault or warning
        const VOUT              = 1 << 15;
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "OK");
        }
        let names: Vec<_> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// STATUS_WORD of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    /// Channel (page)
    pub page: u8,
    /// Decoded status bits (unknown bits kept)
    pub status: StatusWord,
}

impl ChannelStatus {
    /// Returns true if no status bit is set
    pub fn is_ok(&self) -> bool {
        self.status.is_empty()
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "Channel {}: OK", self.page)
        } else {
            write!(
                f,
                "Channel {}: BAD, STATUS_WORD = 0x{:04x} ({})",
                self.page,
                self.status.bits(),
                self.status
            )
        }
    }
}

/// Transactions that read STATUS_WORD on every channel
pub fn status_reads(builder: &TransactionBuilder<'_>) -> Result<Vec<Transaction>> {
    let mut xacts = Vec::with_capacity(DEVICE_PAGES.len() * 2);
    for page in DEVICE_PAGES {
        xacts.push(builder.write("PAGE", page)?);
        xacts.push(builder.read("STATUS_WORD")?);
    }
    Ok(xacts)
}

/// Status of every channel that reported STATUS_WORD
///
/// The last value read on a page wins.
pub fn channel_status(readback: &Readback) -> Vec<ChannelStatus> {
    readback
        .pages
        .iter()
        .filter_map(|page| {
            let entry = page.find_last(reg::STATUS_WORD)?;
            Some(ChannelStatus {
                page: page.page,
                status: StatusWord::from_bits_retain(entry.value),
            })
        })
        .collect()
}
