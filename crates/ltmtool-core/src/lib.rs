//! ltmtool-core - PMBus encoding and console translation for the LTM4673
//!
//! This crate holds everything needed to talk to the LTM4673 power module
//! on Marble through the MMC console, without doing any I/O itself:
//!
//! - [`command`] - register table with name and address lookup
//! - [`codec`] - Linear11 / Linear16 / raw numeric encodings
//! - [`transaction`] - SMBus transaction framing per access mode
//! - [`console`] - MMC console line rendering and readback parsing
//! - [`program`] - per-page register programs and readbacks
//! - [`compare`] - program comparison
//! - [`limits`] - per-page register limits
//! - [`board`] - telemetry, status and rail margining helpers
//! - [`link`] - the line-oriented console boundary implemented elsewhere
//!
//! # Example
//!
//! ```
//! use ltmtool_core::command::CommandTable;
//! use ltmtool_core::console::render;
//! use ltmtool_core::transaction::{BusConfig, TransactionBuilder};
//!
//! let table = CommandTable::ltm4673();
//! let builder = TransactionBuilder::new(table, BusConfig::default());
//! let xact = builder.write("VOUT_COMMAND", 0x2000u16)?;
//! assert_eq!(render(&xact), "t 0xb8 0x21 0x00 0x20");
//! # Ok::<(), ltmtool_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod board;
pub mod codec;
pub mod command;
pub mod compare;
pub mod console;
pub mod error;
pub mod limits;
pub mod link;
pub mod pec;
pub mod program;
pub mod transaction;

pub use error::{Error, Result};
