//! TOML program files
//!
//! ```toml
//! [[page]]
//! page = 0xff
//! registers = [
//!     { command = "VIN_OV_FAULT_LIMIT", value = 15.0 },
//! ]
//!
//! [[page]]
//! page = 0
//! registers = [
//!     { command = "VOUT_COMMAND", raw = "0x2000" },
//!     { command = "0xd0", raw = 0x0001 },
//! ]
//! ```
//!
//! `raw` is the data word as written; `value` is in engineering units and is
//! encoded with the register's encoding. Registers are given by name or by
//! command code.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::Program;
use crate::command::CommandTable;
use crate::error::{Error, Result};

#[derive(Debug, serde::Deserialize)]
struct TomlProgramFile {
    #[serde(default)]
    page: Vec<TomlPage>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlPage {
    #[serde(deserialize_with = "deserialize_hex_u32")]
    page: u32,
    #[serde(default)]
    registers: Vec<TomlEntry>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlEntry {
    command: String,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u32")]
    raw: Option<u32>,
    value: Option<f64>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

impl HexOrInt {
    fn into_u32(self) -> std::result::Result<u32, String> {
        match self {
            HexOrInt::Int(n) => Ok(n),
            HexOrInt::Str(s) => parse_number(&s),
        }
    }
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    HexOrInt::deserialize(deserializer)?
        .into_u32()
        .map_err(serde::de::Error::custom)
}

fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_hex_u32(deserializer).map(Some)
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

impl Program {
    /// Load a program from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>, table: &CommandTable) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Program(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content, table)
    }

    /// Parse a program from a TOML string
    pub fn from_toml_str(content: &str, table: &CommandTable) -> Result<Self> {
        let file: TomlProgramFile =
            ::toml::from_str(content).map_err(|e| Error::Program(e.to_string()))?;

        let mut program = Program::new();
        for page in file.page {
            let page_num = u8::try_from(page.page)
                .map_err(|_| Error::Program(format!("page {} out of range", page.page)))?;
            // Keep empty pages so a bare page switch survives
            program.page_mut(page_num);

            for entry in page.registers {
                let register = table.resolve_register(&entry.command)?;
                let raw = match (entry.raw, entry.value) {
                    (Some(raw), None) => u16::try_from(raw).map_err(|_| {
                        Error::Program(format!("{}: raw value 0x{:x} exceeds 16 bits", entry.command, raw))
                    })?,
                    (None, Some(value)) => register.encoding().encode(value)?,
                    _ => {
                        return Err(Error::Program(format!(
                            "{}: exactly one of 'raw' or 'value' is required",
                            entry.command
                        )))
                    }
                };
                program.push(page_num, register, raw);
            }
        }

        Ok(program)
    }

    /// Save the program to a TOML file
    pub fn to_toml_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_toml_string())
            .map_err(|e| Error::Program(format!("{}: {}", path.display(), e)))
    }

    /// Convert the program to a TOML string with raw values
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();
        for page in &self.pages {
            let _ = writeln!(output, "[[page]]");
            let _ = writeln!(output, "page = 0x{:02x}", page.page);
            let _ = writeln!(output, "registers = [");
            for entry in &page.entries {
                let _ = writeln!(
                    output,
                    "    {{ command = \"{}\", raw = 0x{:04x} }},",
                    entry.register.name(),
                    entry.value
                );
            }
            let _ = writeln!(output, "]");
            output.push('\n');
        }
        output
    }
}
