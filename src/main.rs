//! ltmtool - LTM4673 bring-up over the Marble MMC console
//!
//! Translates PMBus register programs for the LTM4673 power module into MMC
//! console lines, sends them over a serial link (or to a simulated board),
//! and checks what comes back.
//!
//! # Architecture
//!
//! - `ltmtool-core` holds the command table, codecs, transaction framing,
//!   console translation and comparison. It does no I/O.
//! - `ltmtool-console` moves console lines over a serial port and paces them.
//! - `ltmtool-sim` answers console lines like an MMC with an LTM4673 attached.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Device;
use ltmtool_core::command::CommandTable;
use ltmtool_core::transaction::{BusConfig, TransactionBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let table = CommandTable::ltm4673();
    let bus = BusConfig::new(cli.address).with_pec(cli.pec);
    let builder = TransactionBuilder::new(table, bus);
    log::debug!(
        "Device 0x{:02x}, PEC {:?}, {} commands",
        bus.device_address,
        bus.pec,
        table.len()
    );

    match cli.command {
        Commands::Commands { filter } => {
            commands::table::cmd_commands(table, filter.as_deref());
            Ok(())
        }
        Commands::Encode { command, value } => commands::table::cmd_encode(table, &command, value),
        Commands::Decode { command, raw } => commands::table::cmd_decode(table, &command, raw),
        Commands::Render {
            command,
            raw,
            value,
            program,
            read,
        } => commands::console::cmd_render(
            &builder,
            command.as_deref(),
            raw,
            value,
            program.as_deref(),
            read,
        ),
        Commands::Parse {
            input,
            output,
            reference,
            strict,
        } => commands::console::cmd_parse(
            &builder,
            input.as_deref(),
            output.as_deref(),
            reference.as_deref(),
            strict,
        ),
        Commands::Write {
            link,
            program,
            verify,
            strict,
        } => {
            let mut device = Device::open(&link, bus)?;
            commands::program::cmd_write(&mut device, &builder, &program, verify, strict)
        }
        Commands::Read {
            link,
            program,
            commands: names,
            page,
            compare,
            output,
        } => {
            let mut device = Device::open(&link, bus)?;
            commands::program::cmd_read(
                &mut device,
                &builder,
                program.as_deref(),
                &names,
                page,
                compare,
                output.as_deref(),
            )
        }
        Commands::Limits { link, limits } => {
            let mut device = Device::open(&link, bus)?;
            commands::board::cmd_limits(&mut device, &builder, limits.as_deref())
        }
        Commands::Telemetry { link } => {
            let mut device = Device::open(&link, bus)?;
            commands::board::cmd_telemetry(&mut device, &builder)
        }
        Commands::Status { link, clear } => {
            let mut device = Device::open(&link, bus)?;
            commands::board::cmd_status(&mut device, &builder, clear)
        }
        Commands::Margin { link, rails } => {
            let mut device = Device::open(&link, bus)?;
            commands::board::cmd_margin(&mut device, &builder, &rails)
        }
    }
}
