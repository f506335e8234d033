//! Command table types

use std::borrow::Cow;
use std::fmt;

use crate::codec::Encoding;

/// SMBus access mode of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Command code only, no data (e.g. CLEAR_FAULTS)
    Send,
    /// One data byte
    Byte,
    /// Two data bytes, LSB first
    Word,
    /// Byte count followed by that many data bytes
    Block,
}

/// How many bytes a read of a register returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLength {
    /// A known number of bytes
    Fixed(u8),
    /// One count byte N, then N data bytes
    CountedBlock,
}

impl AccessMode {
    /// Response length of a read in this mode
    pub fn read_length(self) -> ReadLength {
        match self {
            AccessMode::Send => ReadLength::Fixed(0),
            AccessMode::Byte => ReadLength::Fixed(1),
            AccessMode::Word => ReadLength::Fixed(2),
            AccessMode::Block => ReadLength::CountedBlock,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Send => write!(f, "send"),
            AccessMode::Byte => write!(f, "byte"),
            AccessMode::Word => write!(f, "word"),
            AccessMode::Block => write!(f, "block"),
        }
    }
}

/// A PMBus command (register) definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandSpec {
    /// Register name as in the datasheet
    pub name: &'static str,
    /// Command code on the wire
    pub address: u8,
    /// SMBus access mode
    pub mode: AccessMode,
    /// Numeric encoding of the data word
    pub encoding: Encoding,
}

impl CommandSpec {
    /// Create a command definition
    pub const fn new(
        name: &'static str,
        address: u8,
        mode: AccessMode,
        encoding: Encoding,
    ) -> Self {
        Self {
            name,
            address,
            mode,
            encoding,
        }
    }
}

/// A register address resolved against a command table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Address is in the table
    Known(CommandSpec),
    /// Address is not in the table
    Unlisted(u8),
}

impl Register {
    /// Command code on the wire
    pub fn address(&self) -> u8 {
        match self {
            Register::Known(spec) => spec.address,
            Register::Unlisted(addr) => *addr,
        }
    }

    /// Register name, or `0xhh` for unlisted addresses
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Register::Known(spec) => Cow::Borrowed(spec.name),
            Register::Unlisted(addr) => Cow::Owned(format!("0x{:02x}", addr)),
        }
    }

    /// Command definition, if known
    pub fn spec(&self) -> Option<&CommandSpec> {
        match self {
            Register::Known(spec) => Some(spec),
            Register::Unlisted(_) => None,
        }
    }

    /// Encoding used to interpret values (raw for unlisted addresses)
    pub fn encoding(&self) -> Encoding {
        self.spec().map(|s| s.encoding).unwrap_or(Encoding::Raw)
    }
}

impl From<CommandSpec> for Register {
    fn from(spec: CommandSpec) -> Self {
        Register::Known(spec)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
