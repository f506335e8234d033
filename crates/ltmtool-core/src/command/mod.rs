//! PMBus command table
//!
//! Maps register names to command codes, access modes and encodings, and
//! back. The reverse direction is what lets readback lines, which only carry
//! addresses, be printed with register names.

mod ltm4673;
mod table;
mod types;

pub use ltm4673::{reg, LTM4673_COMMANDS};
pub use table::CommandTable;
pub use types::{AccessMode, CommandSpec, ReadLength, Register};
