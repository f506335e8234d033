//! Bidirectional command lookup

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::ltm4673::LTM4673_COMMANDS;
use super::types::{CommandSpec, Register};
use crate::error::{Error, Result};

static LTM4673_TABLE: Lazy<CommandTable> = Lazy::new(|| CommandTable::new(LTM4673_COMMANDS));

/// Command table indexed by name and by address
///
/// Read-only once built; shared references can be used from any thread.
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: &'static [CommandSpec],
    by_name: HashMap<&'static str, usize>,
    by_address: HashMap<u8, usize>,
}

impl CommandTable {
    /// Build a table from a list of command definitions
    ///
    /// Later duplicates of a name or address are ignored with a warning.
    pub fn new(commands: &'static [CommandSpec]) -> Self {
        let mut by_name = HashMap::with_capacity(commands.len());
        let mut by_address = HashMap::with_capacity(commands.len());

        for (idx, spec) in commands.iter().enumerate() {
            if by_name.insert(spec.name, idx).is_some() {
                log::warn!("Duplicate command name {} in table", spec.name);
            }
            if by_address.insert(spec.address, idx).is_some() {
                log::warn!("Duplicate command address 0x{:02x} in table", spec.address);
            }
        }

        // Keep the first definition of each key
        for (idx, spec) in commands.iter().enumerate().rev() {
            by_name.insert(spec.name, idx);
            by_address.insert(spec.address, idx);
        }

        Self {
            commands,
            by_name,
            by_address,
        }
    }

    /// The built-in LTM4673 table
    pub fn ltm4673() -> &'static CommandTable {
        &LTM4673_TABLE
    }

    /// Look up a command by name
    pub fn lookup_by_name(&self, name: &str) -> Result<CommandSpec> {
        self.by_name
            .get(name)
            .map(|&idx| self.commands[idx])
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))
    }

    /// Resolve an address, falling back to an unlisted register
    pub fn lookup_by_address(&self, address: u8) -> Register {
        match self.by_address.get(&address) {
            Some(&idx) => Register::Known(self.commands[idx]),
            None => Register::Unlisted(address),
        }
    }

    /// Look up a command by address, failing if it is not in the table
    pub fn try_lookup_by_address(&self, address: u8) -> Result<CommandSpec> {
        self.by_address
            .get(&address)
            .map(|&idx| self.commands[idx])
            .ok_or(Error::UnknownAddress(address))
    }

    /// Resolve a command given by name (case-insensitive) or by numeric
    /// address (`0x21` or `33`)
    pub fn resolve(&self, token: &str) -> Result<CommandSpec> {
        let token = token.trim();
        if let Ok(spec) = self.lookup_by_name(token) {
            return Ok(spec);
        }
        if let Ok(spec) = self.lookup_by_name(&token.to_ascii_uppercase()) {
            return Ok(spec);
        }
        match parse_u8(token) {
            Some(addr) => self.try_lookup_by_address(addr),
            None => Err(Error::UnknownCommand(token.to_string())),
        }
    }

    /// Resolve a register given by name or command code
    ///
    /// Unlike [`CommandTable::resolve`], a numeric code missing from the
    /// table yields an unlisted register instead of an error.
    pub fn resolve_register(&self, token: &str) -> Result<Register> {
        if let Ok(spec) = self.resolve(token) {
            return Ok(Register::Known(spec));
        }
        match parse_u8(token.trim()) {
            Some(addr) => Ok(self.lookup_by_address(addr)),
            None => Err(Error::UnknownCommand(token.trim().to_string())),
        }
    }

    /// All commands in table order
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if the table holds no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn parse_u8(s: &str) -> Option<u8> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
