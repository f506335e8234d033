//! Command table and codec commands

use std::error::Error;

use ltmtool_core::command::CommandTable;

/// List the command table
pub fn cmd_commands(table: &CommandTable, filter: Option<&str>) {
    println!("{:<28} {:>6} {:<6} {:<5}", "Name", "Code", "Mode", "Enc");
    println!("{}", "-".repeat(48));

    let filter = filter.map(|f| f.to_ascii_uppercase());
    let mut shown = 0;
    for spec in table.iter() {
        if let Some(f) = &filter {
            if !spec.name.contains(f.as_str()) {
                continue;
            }
        }
        println!(
            "{:<28} {:>6} {:<6} {:<5}",
            spec.name,
            format!("0x{:02x}", spec.address),
            spec.mode,
            spec.encoding
        );
        shown += 1;
    }

    println!();
    println!("{} of {} commands", shown, table.len());
}

/// Encode an engineering value for a register
pub fn cmd_encode(table: &CommandTable, command: &str, value: f64) -> Result<(), Box<dyn Error>> {
    let spec = table.resolve(command)?;
    let raw = spec.encoding.encode(value)?;
    let decoded = spec.encoding.decode(raw);

    println!(
        "{} ({}): {} -> 0x{:04x} (reads back as {})",
        spec.name, spec.encoding, value, raw, decoded
    );
    if (decoded - value).abs() > spec.encoding.step(raw) / 2.0 {
        log::warn!("Encoded value differs from {} by more than half a step", value);
    }
    Ok(())
}

/// Decode a raw register value
pub fn cmd_decode(table: &CommandTable, command: &str, raw: u16) -> Result<(), Box<dyn Error>> {
    let spec = table.resolve(command)?;
    println!(
        "{} ({}): 0x{:04x} -> {}",
        spec.name,
        spec.encoding,
        raw,
        spec.encoding.decode(raw)
    );
    Ok(())
}
