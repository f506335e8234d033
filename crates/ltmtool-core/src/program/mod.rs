//! Per-page register programs
//!
//! A program is what gets written to the device: an ordered list of pages,
//! each an ordered list of register values. A readback has the same shape
//! and is built from what the device reports.
//!
//! Page [`BROADCAST_PAGE`] addresses all channels at once. When comparing a
//! broadcast program against per-page readbacks, expand it first with
//! [`Program::expand_broadcast`].

#[cfg(feature = "files")]
mod toml;

use std::fmt;

use crate::command::{CommandSpec, CommandTable, Register};
use crate::error::{Error, Result};
use crate::transaction::{Transaction, TransactionBuilder, WriteValue};

/// Page value that selects every channel
pub const BROADCAST_PAGE: u8 = 0xFF;

/// Real channel pages of the LTM4673
pub const DEVICE_PAGES: [u8; 4] = [0, 1, 2, 3];

/// One register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Register the value belongs to
    pub register: Register,
    /// Raw data word
    pub value: u16,
}

impl Entry {
    /// Create an entry
    pub fn new(register: impl Into<Register>, value: u16) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }

    /// Command code of the register
    pub fn address(&self) -> u8 {
        self.register.address()
    }

    /// Value in engineering units
    pub fn decoded(&self) -> f64 {
        self.register.encoding().decode(self.value)
    }
}

/// Register values for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgram {
    /// Page number
    pub page: u8,
    /// Entries in write order; duplicates are kept
    pub entries: Vec<Entry>,
}

impl PageProgram {
    /// Create an empty page
    pub fn new(page: u8) -> Self {
        Self {
            page,
            entries: Vec::new(),
        }
    }

    /// Append an entry
    pub fn push(&mut self, register: impl Into<Register>, value: u16) {
        self.entries.push(Entry::new(register, value));
    }

    /// Last entry for `address`, i.e. the value the device ends up holding
    pub fn find_last(&self, address: u8) -> Option<&Entry> {
        self.entries.iter().rev().find(|e| e.address() == address)
    }
}

/// Register values for a sequence of pages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    /// Pages in order
    pub pages: Vec<PageProgram>,
}

/// Program reconstructed from device output
pub type Readback = Program;

impl Program {
    /// Create an empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no entries on any page
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.entries.is_empty())
    }

    /// Total number of entries
    pub fn entry_count(&self) -> usize {
        self.pages.iter().map(|p| p.entries.len()).sum()
    }

    /// First group for `page`
    pub fn page(&self, page: u8) -> Option<&PageProgram> {
        self.pages.iter().find(|p| p.page == page)
    }

    /// Group for `page`, appended at the end if not present yet
    pub fn page_mut(&mut self, page: u8) -> &mut PageProgram {
        let idx = match self.pages.iter().position(|p| p.page == page) {
            Some(idx) => idx,
            None => {
                self.pages.push(PageProgram::new(page));
                self.pages.len() - 1
            }
        };
        &mut self.pages[idx]
    }

    /// Append an entry to `page`
    pub fn push(&mut self, page: u8, register: impl Into<Register>, value: u16) {
        self.page_mut(page).push(register, value);
    }

    /// Replace the broadcast page with its effect on each device page
    ///
    /// Every device page gets the broadcast entries first, followed by its
    /// own entries. Pages that are neither broadcast nor device pages are
    /// kept as they are.
    pub fn expand_broadcast(&self) -> Program {
        let Some(broadcast) = self.page(BROADCAST_PAGE) else {
            return self.clone();
        };

        let mut expanded = Program::new();
        for page in DEVICE_PAGES {
            let group = expanded.page_mut(page);
            group.entries.extend(broadcast.entries.iter().copied());
            if let Some(own) = self.page(page) {
                group.entries.extend(own.entries.iter().copied());
            }
        }
        for page in &self.pages {
            if page.page != BROADCAST_PAGE && !DEVICE_PAGES.contains(&page.page) {
                expanded.page_mut(page.page).entries.extend(page.entries.iter().copied());
            }
        }
        expanded
    }

    /// Transactions that write this program: a PAGE write before each page,
    /// then each entry in order
    pub fn write_transactions(&self, builder: &TransactionBuilder<'_>) -> Result<Vec<Transaction>> {
        let page_cmd = builder.table().lookup_by_name("PAGE")?;
        let mut xacts = Vec::with_capacity(self.entry_count() + self.pages.len());

        for page in &self.pages {
            xacts.push(builder.build(&page_cmd, Some(WriteValue::Raw(page.page as u32)))?);
            for entry in &page.entries {
                let spec = known_spec(entry)?;
                xacts.push(builder.build(spec, Some(WriteValue::Raw(entry.value as u32)))?);
            }
        }
        Ok(xacts)
    }

    /// Transactions that read back every register of this program
    ///
    /// The broadcast page is expanded first since reads need a single page
    /// selected.
    pub fn read_transactions(&self, builder: &TransactionBuilder<'_>) -> Result<Vec<Transaction>> {
        let program = self.expand_broadcast();
        let page_cmd = builder.table().lookup_by_name("PAGE")?;
        let mut xacts = Vec::with_capacity(program.entry_count() + program.pages.len());

        for page in &program.pages {
            xacts.push(builder.build(&page_cmd, Some(WriteValue::Raw(page.page as u32)))?);
            let mut seen = Vec::new();
            for entry in &page.entries {
                if seen.contains(&entry.address()) {
                    continue;
                }
                seen.push(entry.address());
                xacts.push(builder.build(known_spec(entry)?, None)?);
            }
        }
        Ok(xacts)
    }

    /// Resolve register names in a list of `(page, name, raw)` triples
    pub fn from_named<'n>(
        table: &CommandTable,
        entries: impl IntoIterator<Item = (u8, &'n str, u16)>,
    ) -> Result<Program> {
        let mut program = Program::new();
        for (page, name, value) in entries {
            program.push(page, table.lookup_by_name(name)?, value);
        }
        Ok(program)
    }
}

fn known_spec(entry: &Entry) -> Result<&CommandSpec> {
    entry
        .register
        .spec()
        .ok_or(Error::UnknownAddress(entry.address()))
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.pages {
            writeln!(f, "page 0x{:02x}", page.page)?;
            for entry in &page.entries {
                writeln!(
                    f,
                    "  {:<28} 0x{:02x}  0x{:04x}  {:>12.6} {}",
                    entry.register.name(),
                    entry.address(),
                    entry.value,
                    entry.decoded(),
                    entry.register.encoding()
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::render_many;
    use crate::transaction::BusConfig;

    fn table() -> &'static CommandTable {
        CommandTable::ltm4673()
    }

    #[test]
    fn test_page_groups_append() {
        let mut p = Program::new();
        p.push(0, table().lookup_by_name("VOUT_COMMAND").unwrap(), 0x2000);
        p.push(1, table().lookup_by_name("VOUT_COMMAND").unwrap(), 0x399a);
        p.push(0, table().lookup_by_name("VOUT_COMMAND").unwrap(), 0x2001);

        assert_eq!(p.pages.len(), 2);
        assert_eq!(p.pages[0].entries.len(), 2);
        assert_eq!(p.entry_count(), 3);
        assert_eq!(p.pages[0].find_last(0x21).map(|e| e.value), Some(0x2001));
    }

    #[test]
    fn test_expand_broadcast() {
        let p = Program::from_named(
            table(),
            [
                (BROADCAST_PAGE, "VIN_OV_FAULT_LIMIT", 0xD320),
                (2, "VOUT_COMMAND", 0x5000),
            ],
        )
        .unwrap();
        let e = p.expand_broadcast();

        assert_eq!(e.pages.len(), 4);
        assert!(e.page(BROADCAST_PAGE).is_none());
        for page in DEVICE_PAGES {
            assert_eq!(e.page(page).unwrap().entries[0].value, 0xD320);
        }
        assert_eq!(e.page(2).unwrap().entries.len(), 2);
        assert_eq!(e.page(2).unwrap().entries[1].value, 0x5000);
    }

    #[test]
    fn test_write_transactions() {
        let b = TransactionBuilder::new(table(), BusConfig::default());
        let p = Program::from_named(table(), [(1, "VOUT_COMMAND", 0x399a)]).unwrap();
        let lines = render_many(&p.write_transactions(&b).unwrap());
        assert_eq!(lines, vec!["t 0xb8 0x00 0x01", "t 0xb8 0x21 0x9a 0x39"]);
    }

    #[test]
    fn test_read_transactions_dedup_and_expand() {
        let b = TransactionBuilder::new(table(), BusConfig::default());
        let p = Program::from_named(
            table(),
            [
                (BROADCAST_PAGE, "VIN_OV_FAULT_LIMIT", 0xD320),
                (0, "VOUT_COMMAND", 0x2000),
                (0, "VOUT_COMMAND", 0x2001),
            ],
        )
        .unwrap();
        let lines = render_many(&p.read_transactions(&b).unwrap());
        assert_eq!(lines[0], "t 0xb8 0x00 0x00");
        assert_eq!(lines[1], "t 0xb8 0x55 ! 0xb9 ? ?");
        assert_eq!(lines[2], "t 0xb8 0x21 ! 0xb9 ? ?");
        assert_eq!(lines[3], "t 0xb8 0x00 0x01");
        // 4 pages: page 0 has two reads, pages 1-3 one each
        assert_eq!(lines.len(), 4 + 2 + 3);
    }

    #[test]
    fn test_unlisted_register_cannot_be_written() {
        let b = TransactionBuilder::new(table(), BusConfig::default());
        let mut p = Program::new();
        p.push(0, Register::Unlisted(0x04), 1);
        assert_eq!(p.write_transactions(&b), Err(Error::UnknownAddress(0x04)));
    }

    #[test]
    fn test_display() {
        let p = Program::from_named(table(), [(0, "VOUT_COMMAND", 0x2000)]).unwrap();
        let text = p.to_string();
        assert!(text.starts_with("page 0x00\n"));
        assert!(text.contains("VOUT_COMMAND"));
        assert!(text.contains("0x2000"));
        assert!(text.contains("1.000000 L16"));
    }
}
