//! Offline console translation: render and parse

use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;

use ltmtool_core::compare::{compare_programs_with, CompareMode};
use ltmtool_core::console::{render, render_many, ReadbackParser};
use ltmtool_core::program::Program;
use ltmtool_core::transaction::{TransactionBuilder, WriteValue};

/// Print the console lines for one register access or a whole program
pub fn cmd_render(
    builder: &TransactionBuilder<'_>,
    command: Option<&str>,
    raw: Option<u16>,
    value: Option<f64>,
    program: Option<&Path>,
    read: bool,
) -> Result<(), Box<dyn Error>> {
    let table = builder.table();

    if let Some(path) = program {
        let program = Program::from_toml_file(path, table)?;
        log::info!("Loaded {} registers from {}", program.entry_count(), path.display());
        let transactions = if read {
            program.read_transactions(builder)?
        } else {
            program.write_transactions(builder)?
        };
        for line in render_many(&transactions) {
            println!("{}", line);
        }
        return Ok(());
    }

    let Some(command) = command else {
        return Err("Give a command or --program".into());
    };
    let spec = table.resolve(command)?;
    let data = match (raw, value) {
        (Some(raw), _) => Some(WriteValue::Raw(raw as u32)),
        (None, Some(value)) => Some(WriteValue::Raw(spec.encoding.encode(value)? as u32)),
        (None, None) => None,
    };
    println!("{}", render(&builder.build(&spec, data)?));
    Ok(())
}

/// Parse a console log, optionally saving and comparing the readback
pub fn cmd_parse(
    builder: &TransactionBuilder<'_>,
    input: Option<&Path>,
    output: Option<&Path>,
    reference: Option<&Path>,
    strict: bool,
) -> Result<(), Box<dyn Error>> {
    let content = match input {
        Some(path) => fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };

    let table = builder.table();
    let readback =
        ReadbackParser::parse(table, builder.config().device_address, content.lines());
    log::info!(
        "Parsed {} values on {} pages",
        readback.entry_count(),
        readback.pages.len()
    );
    print!("{}", readback);

    if let Some(path) = output {
        readback.to_toml_file(path)?;
        log::info!("Saved readback to {}", path.display());
    }

    if let Some(path) = reference {
        let reference = Program::from_toml_file(path, table)?;
        let mode = if strict {
            CompareMode::Strict
        } else {
            CompareMode::Permissive
        };
        let comparison = compare_programs_with(&reference.expand_broadcast(), &readback, mode);
        println!("{}", comparison);
        if !comparison.pass {
            return Err("Readback does not match the reference program".into());
        }
    }
    Ok(())
}
