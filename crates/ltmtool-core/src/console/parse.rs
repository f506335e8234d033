//! Readback line parsing

use crate::command::{reg, CommandTable};
use crate::program::Readback;
use crate::transaction::ADDR_READ;

/// Prefix of the page marker lines the MMC prints on page changes
pub const PAGE_MARKER: &str = "# LTM4673_PAGE";

/// One register value echoed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readout {
    /// 8-bit bus address as printed (R/W bit as printed)
    pub device: u8,
    /// Command code
    pub register: u8,
    /// Value, low byte first on the line
    pub value: u16,
}

fn parse_hex_u8(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Parse a `(devaddr) regaddr: valueLow [valueHigh]` line
///
/// Returns `None` for anything else.
pub fn parse_line(line: &str) -> Option<Readout> {
    let rest = line.trim().strip_prefix('(')?;
    let (device, rest) = rest.split_once(')')?;
    let (register, values) = rest.split_once(':')?;

    let device = parse_hex_u8(device.trim())?;
    let register = parse_hex_u8(register.trim())?;

    let mut tokens = values.split_whitespace();
    let low = parse_hex_u8(tokens.next()?)?;
    let high = match tokens.next() {
        Some(t) => parse_hex_u8(t)?,
        None => 0,
    };
    if tokens.next().is_some() {
        return None;
    }

    Some(Readout {
        device,
        register,
        value: low as u16 | (high as u16) << 8,
    })
}

/// Parse a `# LTM4673_PAGE <hex>` marker line
pub fn parse_page_marker(line: &str) -> Option<u8> {
    let rest = line.trim().strip_prefix('#')?;
    let mut tokens = rest.split_whitespace();
    if tokens.next()? != "LTM4673_PAGE" {
        return None;
    }
    let page = parse_hex_u8(tokens.next()?)?;
    match tokens.next() {
        None => Some(page),
        Some(_) => None,
    }
}

/// Regroups a flat stream of console lines into per-page readbacks
///
/// Page markers and readouts of the PAGE register move the parser to a new
/// page; readouts from other devices and unrecognized lines are skipped.
#[derive(Debug)]
pub struct ReadbackParser<'a> {
    table: &'a CommandTable,
    device_address: u8,
    page: u8,
    readback: Readback,
}

impl<'a> ReadbackParser<'a> {
    /// Create a parser accepting readouts from `device_address`
    pub fn new(table: &'a CommandTable, device_address: u8) -> Self {
        Self {
            table,
            device_address: device_address & !ADDR_READ,
            page: 0,
            readback: Readback::default(),
        }
    }

    /// Page new readouts are recorded under
    pub fn current_page(&self) -> u8 {
        self.page
    }

    /// Feed one line
    pub fn feed_line(&mut self, line: &str) {
        if let Some(page) = parse_page_marker(line) {
            log::trace!("Page marker: 0x{:02x}", page);
            self.page = page;
            return;
        }

        let Some(readout) = parse_line(line) else {
            log::trace!("Skipping line: {}", line.trim());
            return;
        };

        if readout.device & !ADDR_READ != self.device_address {
            log::trace!(
                "Skipping readout from device 0x{:02x}: {}",
                readout.device,
                line.trim()
            );
            return;
        }

        if readout.register == reg::PAGE {
            self.page = (readout.value & 0xFF) as u8;
            return;
        }

        let register = self.table.lookup_by_address(readout.register);
        self.readback.push(self.page, register, readout.value);
    }

    /// Feed many lines
    pub fn feed<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.feed_line(line.as_ref());
        }
    }

    /// Finish parsing and return the regrouped readback
    pub fn finish(self) -> Readback {
        self.readback
    }

    /// Parse a complete console log
    pub fn parse<I, S>(table: &'a CommandTable, device_address: u8, lines: I) -> Readback
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parser = Self::new(table, device_address);
        parser.feed(lines);
        parser.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Register;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("(0xb8) 0x21: 0x00 0x20"),
            Some(Readout {
                device: 0xb8,
                register: 0x21,
                value: 0x2000
            })
        );
        assert_eq!(
            parse_line("  (b9) 8b: 34 12  "),
            Some(Readout {
                device: 0xb9,
                register: 0x8b,
                value: 0x1234
            })
        );
        // Single byte
        assert_eq!(parse_line("(0xb8) 0x00: 0x02").map(|r| r.value), Some(0x02));
    }

    #[test]
    fn test_parse_line_rejects_noise() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("> Unknown option"), None);
        assert_eq!(parse_line("t 0xb8 0x21 0x00 0x20"), None);
        assert_eq!(parse_line("(0xb8) 0x21:"), None);
        assert_eq!(parse_line("(0xb8) 0x21: 0x00 0x20 0x33"), None);
        assert_eq!(parse_line("(0xb8) 0x21: 0x100"), None);
        assert_eq!(parse_line("(zz) 0x21: 0x00"), None);
    }

    #[test]
    fn test_parse_page_marker() {
        assert_eq!(parse_page_marker("# LTM4673_PAGE 0x02"), Some(2));
        assert_eq!(parse_page_marker("#LTM4673_PAGE ff"), Some(0xff));
        assert_eq!(parse_page_marker("# LTM4673_PAGE"), None);
        assert_eq!(parse_page_marker("# comment"), None);
        assert_eq!(parse_page_marker("(0xb8) 0x00: 0x02"), None);
    }

    #[test]
    fn test_readback_grouping() {
        let table = CommandTable::ltm4673();
        let log = [
            "> t 0xb8 0x21 ! 0xb9 ? ?",
            "(0xb8) 0x21: 0x00 0x20",
            "# LTM4673_PAGE 0x01",
            "(0xb8) 0x21: 0x9a 0x39",
            "(0xb8) 0x00: 0x02",
            "(0xb9) 0x8b: 0x00 0x50",
            "(0xb6) 0x8b: 0x11 0x11",
            "# LTM4673_PAGE 0x00",
            "(0xb8) 0x79: 0x00 0x00",
            "garbage",
        ];
        let readback = ReadbackParser::parse(table, 0xb8, log);

        assert_eq!(readback.pages.len(), 3);

        let p0 = &readback.pages[0];
        assert_eq!(p0.page, 0);
        assert_eq!(p0.entries.len(), 2);
        assert_eq!(p0.entries[0].register.name(), "VOUT_COMMAND");
        assert_eq!(p0.entries[0].value, 0x2000);
        assert_eq!(p0.entries[1].register.name(), "STATUS_WORD");

        let p1 = &readback.pages[1];
        assert_eq!(p1.page, 1);
        assert_eq!(p1.entries.len(), 1);
        assert_eq!(p1.entries[0].value, 0x399a);

        let p2 = &readback.pages[2];
        assert_eq!(p2.page, 2);
        assert_eq!(p2.entries.len(), 1);
        assert_eq!(p2.entries[0].register.name(), "READ_VOUT");
    }

    #[test]
    fn test_unlisted_register_kept() {
        let readback =
            ReadbackParser::parse(CommandTable::ltm4673(), 0xb8, ["(0xb8) 0x04: 0x12"]);
        assert_eq!(readback.pages[0].entries[0].register, Register::Unlisted(0x04));
    }
}
