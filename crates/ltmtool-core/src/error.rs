//! Error types for ltmtool-core
//!
//! Lookup, encoding and framing problems are caller errors and come back as
//! [`Error`]. Unparseable console lines and failed comparisons are not errors:
//! the parser skips the line and the comparator reports the difference as data.

use thiserror::Error;

use crate::codec::Encoding;

/// Core error type
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// No register with this name in the command table
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// No register at this address in the command table
    #[error("unknown command address 0x{0:02x}")]
    UnknownAddress(u8),

    /// Value cannot be represented in the target encoding
    #[error("value {value} is not representable as {encoding}")]
    EncodingRange {
        /// Target encoding
        encoding: Encoding,
        /// Value that was rejected
        value: f64,
    },

    /// Command and value cannot be framed as a transaction
    #[error("invalid transaction for {command}: {reason}")]
    InvalidTransaction {
        /// Command name
        command: String,
        /// Why the transaction was rejected
        reason: &'static str,
    },

    /// A requested setting lies outside the configured limits
    #[error("{register} = {value:.4} on page 0x{page:02x} is outside limits [{min:.4}, {max:.4}]")]
    OutOfLimits {
        /// Page the setting targets
        page: u8,
        /// Register name
        register: String,
        /// Requested value (engineering units)
        value: f64,
        /// Lower limit (engineering units)
        min: f64,
        /// Upper limit (engineering units)
        max: f64,
    },

    /// Program or limit file could not be read or understood
    #[error("program error: {0}")]
    Program(String),

    /// The console link failed
    #[error("console link error: {0}")]
    Link(String),
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
