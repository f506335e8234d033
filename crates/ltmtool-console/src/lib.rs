//! ltmtool-console - Serial link to the Marble MMC console
//!
//! [`SerialConsole`] moves console lines over a UART; [`Session`] drives any
//! [`ConsoleLink`](ltmtool_core::link::ConsoleLink) with the pacing the MMC
//! needs and turns transactions into readbacks.
//!
//! ```no_run
//! use ltmtool_console::{Pacing, SerialConsole, Session};
//! use ltmtool_core::command::CommandTable;
//! use ltmtool_core::transaction::{BusConfig, TransactionBuilder};
//!
//! let link = SerialConsole::open("/dev/ttyUSB3", None)?;
//! let mut session = Session::new(link, Pacing::READ);
//! let builder = TransactionBuilder::new(CommandTable::ltm4673(), BusConfig::default());
//! let readback = session.read_back(&[builder.read("READ_VOUT")?], &builder)?;
//! println!("{}", readback);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod serial;
pub mod session;

pub use error::{ConsoleError, Result};
pub use serial::{SerialConsole, DEFAULT_BAUD};
pub use session::{Pacing, Session};
