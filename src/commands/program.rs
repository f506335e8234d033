//! Program write and read-back commands

use std::error::Error;
use std::path::Path;

use ltmtool_console::Pacing;
use ltmtool_core::compare::{compare_programs, CompareMode};
use ltmtool_core::program::Program;
use ltmtool_core::transaction::TransactionBuilder;

use super::{report_console_notes, Device};

/// Write a program file, optionally verifying it
pub fn cmd_write(
    device: &mut Device,
    builder: &TransactionBuilder<'_>,
    path: &Path,
    verify: bool,
    strict: bool,
) -> Result<(), Box<dyn Error>> {
    let program = Program::from_toml_file(path, builder.table())?;
    if program.is_empty() {
        return Err(format!("{} contains no registers", path.display()).into());
    }

    let output = device.session(Pacing::WRITE).write_program(&program, builder)?;
    report_console_notes(&output);
    println!("Wrote {} registers", program.entry_count());

    if !verify {
        return Ok(());
    }

    let mode = if strict {
        CompareMode::Strict
    } else {
        CompareMode::Permissive
    };
    let comparison = device
        .session(Pacing::READ)
        .verify_program(&program, builder, mode)?;
    println!("{}", comparison);
    if !comparison.pass {
        return Err("Verification failed".into());
    }
    Ok(())
}

/// Read registers named on the command line or listed in a program file
pub fn cmd_read(
    device: &mut Device,
    builder: &TransactionBuilder<'_>,
    program: Option<&Path>,
    commands: &[String],
    page: u8,
    compare: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let table = builder.table();

    let reference = match program {
        Some(path) => Some(Program::from_toml_file(path, table)?),
        None => None,
    };

    let readback = match &reference {
        Some(reference) => device.session(Pacing::READ).read_program(reference, builder)?,
        None => {
            if commands.is_empty() {
                return Err("Nothing to read: give --program or --commands".into());
            }
            let mut transactions = vec![builder.write("PAGE", page)?];
            for name in commands {
                let spec = table.resolve(name)?;
                transactions.push(builder.build(&spec, None)?);
            }
            device.session(Pacing::READ).read_back(&transactions, builder)?
        }
    };

    if readback.is_empty() {
        log::warn!("No readouts received");
    }
    print!("{}", readback);

    if let Some(path) = output {
        readback.to_toml_file(path)?;
        log::info!("Saved readback to {}", path.display());
    }

    if let (true, Some(reference)) = (compare, &reference) {
        let comparison = compare_programs(&reference.expand_broadcast(), &readback);
        println!("{}", comparison);
        if !comparison.pass {
            return Err("Readback does not match the program".into());
        }
    }
    Ok(())
}
