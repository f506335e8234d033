//! CLI argument parsing

use clap::{Parser, Subcommand};
use ltmtool_core::pec::PecMode;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

fn parse_pec(s: &str) -> Result<PecMode, String> {
    s.parse()
}

/// Parse a `PAGE=VOLTAGE` rail setting, keeping the voltage text as given
fn parse_rail(s: &str) -> Result<(u8, String), String> {
    let (page, voltage) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected PAGE=VOLTAGE, got '{}'", s))?;
    Ok((parse_hex_u8(page.trim())?, voltage.trim().to_string()))
}

#[derive(Parser)]
#[command(name = "ltmtool")]
#[command(author, version, about = "LTM4673 bring-up over the Marble MMC console", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 8-bit PMBus address of the LTM4673
    #[arg(long, global = true, default_value = "0xb8", value_parser = parse_hex_u8)]
    pub address: u8,

    /// Packet error checking: none, placeholder or crc8
    #[arg(long, global = true, default_value = "none", value_parser = parse_pec)]
    pub pec: PecMode,

    #[command(subcommand)]
    pub command: Commands,
}

/// Console link options shared across device commands
#[derive(clap::Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial device of the MMC console, or `sim` for the simulator
    #[arg(short = 'd', long = "dev")]
    pub dev: String,

    /// Baud rate (default 115200)
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Show progress while sending
    #[arg(long)]
    pub progress: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the LTM4673 command table
    Commands {
        /// Only show commands whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Encode an engineering value for a register
    Encode {
        /// Register name or code
        command: String,

        /// Value in engineering units (V, A, degC, ...)
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Decode a raw register value
    Decode {
        /// Register name or code
        command: String,

        /// Raw data word (hex or decimal)
        #[arg(value_parser = parse_hex_u16)]
        raw: u16,
    },

    /// Print the console lines for a register access or a program
    Render {
        /// Register name or code (omit with --program)
        #[arg(required_unless_present = "program")]
        command: Option<String>,

        /// Raw value to write; reads the register if omitted
        #[arg(long, value_parser = parse_hex_u16, conflicts_with = "value")]
        raw: Option<u16>,

        /// Engineering value to write
        #[arg(long, allow_negative_numbers = true)]
        value: Option<f64>,

        /// Program file (TOML)
        #[arg(short, long, conflicts_with = "command")]
        program: Option<PathBuf>,

        /// Render the read-back lines of the program instead of the writes
        #[arg(long, requires = "program")]
        read: bool,
    },

    /// Parse a captured console log into per-page readbacks
    Parse {
        /// Console log (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Save the readback as a program file (TOML)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reference program to compare against
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Require exact order as well as values
        #[arg(long, requires = "reference")]
        strict: bool,
    },

    /// Write a program to the device
    Write {
        #[command(flatten)]
        link: LinkArgs,

        /// Program file (TOML)
        #[arg(short, long)]
        program: PathBuf,

        /// Read back and compare after writing
        #[arg(long)]
        verify: bool,

        /// Require exact order as well as values when verifying
        #[arg(long, requires = "verify")]
        strict: bool,
    },

    /// Read registers from the device
    Read {
        #[command(flatten)]
        link: LinkArgs,

        /// Read every register of this program (TOML)
        #[arg(short, long, conflicts_with = "commands")]
        program: Option<PathBuf>,

        /// Registers to read (names or codes)
        #[arg(short, long, value_delimiter = ',')]
        commands: Vec<String>,

        /// Page to read --commands from
        #[arg(long, default_value = "0", value_parser = parse_hex_u8)]
        page: u8,

        /// Compare the readback against --program
        #[arg(long, requires = "program")]
        compare: bool,

        /// Save the readback as a program file (TOML)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the device against limits
    Limits {
        #[command(flatten)]
        link: LinkArgs,

        /// Limit file (RON); built-in LTM4673 limits if omitted
        #[arg(short, long)]
        limits: Option<PathBuf>,
    },

    /// Dump telemetry of all channels
    Telemetry {
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Check STATUS_WORD of all channels
    Status {
        #[command(flatten)]
        link: LinkArgs,

        /// Clear faults before reading
        #[arg(long)]
        clear: bool,
    },

    /// Set rail voltages within their limits
    Margin {
        #[command(flatten)]
        link: LinkArgs,

        /// Rail settings as PAGE=VOLTAGE (e.g. 1=1.8V, 0=95%)
        #[arg(required = true, value_parser = parse_rail)]
        rails: Vec<(u8, String)>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_hex_u8("0xb8"), Ok(0xb8));
        assert_eq!(parse_hex_u8("3"), Ok(3));
        assert!(parse_hex_u8("0x100").is_err());
        assert_eq!(parse_hex_u16("0X2000"), Ok(0x2000));
        assert!(parse_hex_u16("-1").is_err());
    }

    #[test]
    fn test_parse_rail() {
        assert_eq!(parse_rail("1=1.8V"), Ok((1, "1.8V".to_string())));
        assert_eq!(parse_rail(" 0 = 95% "), Ok((0, "95%".to_string())));
        assert!(parse_rail("1.8V").is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "ltmtool", "read", "-d", "sim", "-c", "READ_VOUT,READ_IOUT", "--pec", "crc8",
            "--address", "0xba",
        ])
        .unwrap();
        assert_eq!(cli.address, 0xba);
        assert_eq!(cli.pec, PecMode::Crc8);
        match cli.command {
            Commands::Read { link, commands, page, .. } => {
                assert_eq!(link.dev, "sim");
                assert_eq!(commands, ["READ_VOUT", "READ_IOUT"]);
                assert_eq!(page, 0);
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_margin_needs_rails() {
        assert!(Cli::try_parse_from(["ltmtool", "margin", "-d", "sim"]).is_err());
        let cli = Cli::try_parse_from(["ltmtool", "margin", "-d", "sim", "0=1.02", "3=99%"]).unwrap();
        match cli.command {
            Commands::Margin { rails, .. } => assert_eq!(rails.len(), 2),
            _ => panic!("expected margin"),
        }
    }
}
