//! Output voltage margining

use crate::command::CommandTable;
use crate::error::{Error, Result};
use crate::limits::LimitTable;
use crate::program::{Program, DEVICE_PAGES};
use crate::transaction::{Transaction, TransactionBuilder};

/// Nominal rail voltage per page
pub const RAILS: [(u8, f64); 4] = [(0, 1.0), (1, 1.8), (2, 2.5), (3, 3.3)];

/// Nominal voltage of the rail on `page`
pub fn nominal_voltage(page: u8) -> Option<f64> {
    RAILS.iter().find(|(p, _)| *p == page).map(|(_, v)| *v)
}

/// Parse a requested rail voltage and check it against the VOUT_COMMAND
/// limits of the rail's page
///
/// Accepts a percentage of nominal (`95%`), volts with a unit (`1.05V`) or a
/// bare number of volts (`1.05`).
pub fn parse_rail_voltage(s: &str, page: u8, limits: &LimitTable) -> Result<f64> {
    let nominal = nominal_voltage(page)
        .ok_or_else(|| Error::Program(format!("no rail on page 0x{:02x}", page)))?;
    let s = s.trim();
    let invalid = || Error::Program(format!("invalid voltage '{}'", s));

    let voltage = if let Some(pct) = s.strip_suffix('%') {
        let pct: f64 = pct.trim().parse().map_err(|_| invalid())?;
        pct / 100.0 * nominal
    } else {
        let volts = s
            .strip_suffix('V')
            .or_else(|| s.strip_suffix('v'))
            .unwrap_or(s);
        volts.trim().parse().map_err(|_| invalid())?
    };
    if !voltage.is_finite() || voltage < 0.0 {
        return Err(invalid());
    }

    let vout = CommandTable::ltm4673().lookup_by_name("VOUT_COMMAND")?;
    limits.require_within(page, &vout, voltage)?;
    Ok(voltage)
}

/// VOUT_COMMAND writes for `(page, volts)` settings
pub fn margin_program(table: &CommandTable, settings: &[(u8, f64)]) -> Result<Program> {
    let vout = table.lookup_by_name("VOUT_COMMAND")?;
    let mut program = Program::new();
    for &(page, volts) in settings {
        program.push(page, vout, vout.encoding.encode(volts)?);
    }
    Ok(program)
}

/// READ_VOUT and READ_IOUT on every rail, to confirm a margin setting
pub fn rail_readback_reads(builder: &TransactionBuilder<'_>) -> Result<Vec<Transaction>> {
    let mut xacts = Vec::with_capacity(DEVICE_PAGES.len() * 3);
    for page in DEVICE_PAGES {
        xacts.push(builder.write("PAGE", page)?);
        xacts.push(builder.read("READ_VOUT")?);
        xacts.push(builder.read("READ_IOUT")?);
    }
    Ok(xacts)
}
