//! RON limit files
//!
//! ```ron
//! (
//!     pages: [
//!         (page: 0xff, limits: [
//!             (register: "PAGE", mask: 0xff, min: 0.0, max: 255.0),
//!             (register: "VIN_OV_FAULT_LIMIT", mask: 0xffff, min: 12.5, max: 16.0),
//!         ]),
//!         (page: 0, limits: [
//!             (register: "VOUT_COMMAND", mask: 0xffff, min: 0.95, max: 1.05),
//!         ]),
//!     ],
//! )
//! ```
//!
//! Bounds are in engineering units and get encoded with the register's
//! encoding. A mask of 0 protects the register.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{Limit, LimitTable};
use crate::command::CommandTable;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct LimitFile {
    pages: Vec<PageDef>,
}

#[derive(Debug, Deserialize)]
struct PageDef {
    page: u8,
    #[serde(default)]
    limits: Vec<LimitDef>,
}

#[derive(Debug, Deserialize)]
struct LimitDef {
    register: String,
    mask: u16,
    #[serde(default)]
    min: f64,
    #[serde(default)]
    max: f64,
}

impl LimitTable {
    /// Load limits from a RON file
    pub fn from_ron_file(path: impl AsRef<Path>, table: &CommandTable) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Program(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&content, table)
    }

    /// Parse limits from a RON string
    pub fn from_ron_str(content: &str, table: &CommandTable) -> Result<Self> {
        let file: LimitFile =
            ::ron::from_str(content).map_err(|e| Error::Program(format!("limit file: {}", e)))?;

        let mut limits = LimitTable::new();
        for page in file.pages {
            for def in page.limits {
                let register = table.resolve_register(&def.register)?;
                if def.mask == 0 {
                    limits.insert(page.page, register.address(), Limit::protected());
                    continue;
                }
                if def.min > def.max {
                    return Err(Error::Program(format!(
                        "{} on page 0x{:02x}: min {} is above max {}",
                        register, page.page, def.min, def.max
                    )));
                }
                let encoding = register.encoding();
                let limit = Limit::new(def.mask, encoding.encode(def.min)?, encoding.encode(def.max)?);
                limits.insert(page.page, register.address(), limit);
            }
        }

        log::debug!("Loaded {} limits", limits.iter().count());
        Ok(limits)
    }
}
