//! CLI command implementations
//!
//! Offline commands (`commands`, `encode`, `decode`, `render`, `parse`) only
//! need the command table. Device commands open a console link through
//! [`Device`], either a serial port or the simulator (`--dev sim`).

pub mod board;
pub mod console;
pub mod program;
pub mod table;

use std::error::Error;

use ltmtool_console::{Pacing, SerialConsole, Session};
use ltmtool_core::console::{parse_line, parse_page_marker};
use ltmtool_core::link::ConsoleLink;
use ltmtool_core::transaction::BusConfig;

use crate::cli::LinkArgs;

/// `--dev` value selecting the simulator
pub const SIM_DEVICE: &str = "sim";

/// An open console link and the session driving it
pub struct Device {
    session: Session<Box<dyn ConsoleLink>>,
    simulated: bool,
}

impl Device {
    /// Open the link named by `args`
    pub fn open(args: &LinkArgs, bus: BusConfig) -> Result<Self, Box<dyn Error>> {
        let (link, simulated) = open_link(args, bus)?;
        let session = Session::new(link, Pacing::READ).with_progress(args.progress);
        Ok(Self { session, simulated })
    }

    /// The session, paced for the next batch of lines
    ///
    /// The simulator answers immediately and is never paced.
    pub fn session(&mut self, pacing: Pacing) -> &mut Session<Box<dyn ConsoleLink>> {
        let pacing = if self.simulated { Pacing::NONE } else { pacing };
        self.session.set_pacing(pacing);
        &mut self.session
    }
}

#[cfg(feature = "sim")]
fn open_sim(bus: BusConfig) -> Result<Box<dyn ConsoleLink>, Box<dyn Error>> {
    use ltmtool_core::limits::LimitTable;
    use ltmtool_sim::{SimConfig, SimConsole};

    log::info!("Using simulated LTM4673 at 0x{:02x}", bus.device_address);
    let config = SimConfig {
        device_address: bus.device_address,
        limits: Some(LimitTable::ltm4673_defaults()?),
    };
    Ok(Box::new(SimConsole::new(config)))
}

#[cfg(not(feature = "sim"))]
fn open_sim(_bus: BusConfig) -> Result<Box<dyn ConsoleLink>, Box<dyn Error>> {
    Err("Simulator support not compiled in (enable the `sim` feature)".into())
}

fn open_link(args: &LinkArgs, bus: BusConfig) -> Result<(Box<dyn ConsoleLink>, bool), Box<dyn Error>> {
    if args.dev == SIM_DEVICE {
        return Ok((open_sim(bus)?, true));
    }
    let console = SerialConsole::open(&args.dev, args.baud)?;
    Ok((Box::new(console), false))
}

/// Log console output that is neither a readout nor a page marker
///
/// This is where the MMC reports clamped or vetoed writes.
pub fn report_console_notes(output: &[String]) {
    for line in output {
        if parse_line(line).is_some() || parse_page_marker(line).is_some() {
            log::debug!("< {}", line);
        } else {
            log::warn!("MMC: {}", line);
        }
    }
}
