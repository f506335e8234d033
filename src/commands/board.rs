//! Board checks: limits, telemetry, channel status and margining

use std::error::Error;
use std::path::Path;

use ltmtool_console::Pacing;
use ltmtool_core::board::{
    channel_status, margin_program, parse_rail_voltage, rail_readback_reads, status_reads,
    telemetry_reads, telemetry_readings,
};
use ltmtool_core::command::reg;
use ltmtool_core::limits::{check_limits, LimitTable};
use ltmtool_core::program::{BROADCAST_PAGE, DEVICE_PAGES};
use ltmtool_core::transaction::TransactionBuilder;

use super::{report_console_notes, Device};

/// Read the limited registers and check them
pub fn cmd_limits(
    device: &mut Device,
    builder: &TransactionBuilder<'_>,
    path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let limits = match path {
        Some(path) => {
            let limits = LimitTable::from_ron_file(path, builder.table())?;
            log::info!("Loaded limits from {}", path.display());
            limits
        }
        None => LimitTable::ltm4673_defaults()?,
    };
    log::debug!("Limits:\n{}", limits);

    let transactions = limits.read_transactions(builder)?;
    let readback = device.session(Pacing::READ).read_back(&transactions, builder)?;
    let report = check_limits(&readback, &limits);
    println!("{}", report);

    if report.checks.is_empty() {
        log::warn!("No limited register was read back");
    }
    if !report.pass() {
        return Err(format!("{} register(s) out of limits", report.failures().count()).into());
    }
    Ok(())
}

/// Dump telemetry of every channel
pub fn cmd_telemetry(
    device: &mut Device,
    builder: &TransactionBuilder<'_>,
) -> Result<(), Box<dyn Error>> {
    let transactions = telemetry_reads(builder)?;
    let readback = device.session(Pacing::READ).read_back(&transactions, builder)?;

    let mut current = None;
    for reading in telemetry_readings(&readback) {
        if current != Some(reading.page) {
            println!("Channel {}", reading.page);
            current = Some(reading.page);
        }
        println!("  {}", reading);
    }
    if current.is_none() {
        return Err("No telemetry received".into());
    }
    Ok(())
}

/// Check STATUS_WORD on every channel
pub fn cmd_status(
    device: &mut Device,
    builder: &TransactionBuilder<'_>,
    clear: bool,
) -> Result<(), Box<dyn Error>> {
    if clear {
        let transactions = [
            builder.write("PAGE", BROADCAST_PAGE)?,
            builder.build_named("CLEAR_FAULTS", None)?,
        ];
        let output = device.session(Pacing::WRITE).run_transactions(&transactions)?;
        report_console_notes(&output);
        log::info!("Cleared faults on all channels");
    }

    let readback = device
        .session(Pacing::READ)
        .read_back(&status_reads(builder)?, builder)?;
    let statuses = channel_status(&readback);
    for status in &statuses {
        println!("{}", status);
    }

    if statuses.len() < DEVICE_PAGES.len() {
        return Err(format!(
            "Only {} of {} channels reported STATUS_WORD",
            statuses.len(),
            DEVICE_PAGES.len()
        )
        .into());
    }
    let bad = statuses.iter().filter(|s| !s.is_ok()).count();
    if bad > 0 {
        return Err(format!("{} channel(s) report faults", bad).into());
    }
    println!("All channels OK");
    Ok(())
}

/// Set rail voltages and read the rails back
pub fn cmd_margin(
    device: &mut Device,
    builder: &TransactionBuilder<'_>,
    rails: &[(u8, String)],
) -> Result<(), Box<dyn Error>> {
    let limits = LimitTable::ltm4673_defaults()?;
    let mut settings = Vec::with_capacity(rails.len());
    for (page, voltage) in rails {
        let volts = parse_rail_voltage(voltage, *page, &limits)?;
        log::info!("Rail {}: {:.4} V", page, volts);
        settings.push((*page, volts));
    }

    let program = margin_program(builder.table(), &settings)?;
    let output = device.session(Pacing::WRITE).write_program(&program, builder)?;
    report_console_notes(&output);

    let readback = device
        .session(Pacing::READ)
        .read_back(&rail_readback_reads(builder)?, builder)?;
    for page in &readback.pages {
        let vout = page.find_last(reg::READ_VOUT).map(|e| e.decoded());
        let iout = page.find_last(reg::READ_IOUT).map(|e| e.decoded());
        let target = settings
            .iter()
            .rev()
            .find(|(p, _)| *p == page.page)
            .map(|(_, v)| format!(" (set {:.4} V)", v))
            .unwrap_or_default();
        match (vout, iout) {
            (Some(v), Some(i)) => println!("Rail {}: {:.4} V{}, {:.3} A", page.page, v, target, i),
            (Some(v), None) => println!("Rail {}: {:.4} V{}", page.page, v, target),
            _ => log::warn!("Rail {}: no READ_VOUT", page.page),
        }
    }
    Ok(())
}
