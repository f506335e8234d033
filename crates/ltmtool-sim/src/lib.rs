//! ltmtool-sim - In-memory LTM4673 behind an MMC console
//!
//! [`SimConsole`] accepts the same `t ...` bridge command lines the MMC
//! console does and answers like the MMC firmware: readouts as
//! `(0xb8) 0x8b: 0x00 0x20`, a `# LTM4673_PAGE` marker on every page change,
//! and chatter for anything it does not understand. It is useful for testing
//! and for trying out programs without a board.

use std::collections::VecDeque;

use ltmtool_core::command::{reg, AccessMode, CommandTable, Register};
use ltmtool_core::console::BRIDGE_COMMAND;
use ltmtool_core::error::Result;
use ltmtool_core::limits::{ClampOutcome, LimitTable};
use ltmtool_core::link::ConsoleLink;
use ltmtool_core::program::BROADCAST_PAGE;
use ltmtool_core::transaction::{ADDR_READ, DEFAULT_DEVICE_ADDRESS};

/// Number of channels (pages)
pub const NUM_PAGES: usize = 4;

/// Configuration for the simulated board
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 8-bit write address the device answers on
    pub device_address: u8,
    /// Write guard applied like the MMC firmware does, if any
    pub limits: Option<LimitTable>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS,
            limits: None,
        }
    }
}

/// Register file of a simulated LTM4673
#[derive(Debug, Clone)]
pub struct SimLtm4673 {
    regs: [[u16; 256]; NUM_PAGES],
    page: u8,
}

impl Default for SimLtm4673 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimLtm4673 {
    /// Power-on state: nominal rails (1.0, 1.8, 2.5, 3.3 V) on a 12 V input
    pub fn new() -> Self {
        let mut dev = Self {
            regs: [[0; 256]; NUM_PAGES],
            page: 0,
        };
        // L16 words for 1.0, 1.8, 2.5 and 3.3 V
        let vout = [0x2000, 0x399a, 0x5000, 0x699a];
        for (page, &v) in vout.iter().enumerate() {
            let regs = &mut dev.regs[page];
            regs[reg::VOUT_COMMAND as usize] = v;
            regs[reg::READ_VOUT as usize] = v;
            regs[0x20] = 0x13; // VOUT_MODE: L16, exponent -13
            regs[reg::READ_VIN as usize] = 0xD300; // 12.0 V
            regs[reg::VIN_OV_FAULT_LIMIT as usize] = 0xD3C0; // 15.0 V
            regs[reg::READ_IOUT as usize] = 0xB200; // 0.5 A
            regs[reg::READ_TEMPERATURE_1 as usize] = 0xE320; // 50 degC
            regs[reg::READ_TEMPERATURE_2 as usize] = 0xE2D0; // 45 degC
            regs[reg::MFR_READ_IOUT as usize] = 200; // 500 mA
        }
        dev
    }

    /// Currently selected page
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Register value on a device page (0-3)
    pub fn register(&self, page: u8, code: u8) -> u16 {
        self.regs[page as usize % NUM_PAGES][code as usize]
    }

    /// Set a register on a device page (0-3), e.g. to inject a fault
    pub fn set_register(&mut self, page: u8, code: u8, value: u16) {
        self.regs[page as usize % NUM_PAGES][code as usize] = value;
    }

    fn pages_selected(&self) -> std::ops::Range<usize> {
        if self.page == BROADCAST_PAGE {
            0..NUM_PAGES
        } else {
            let p = self.page as usize;
            p..p + 1
        }
    }

    fn write(&mut self, code: u8, value: u16) {
        for page in self.pages_selected() {
            self.regs[page][code as usize] = value;
            if code == reg::VOUT_COMMAND {
                // Output settles immediately
                self.regs[page][reg::READ_VOUT as usize] = value;
            }
        }
    }

    fn clear_faults(&mut self) {
        for page in self.pages_selected() {
            self.regs[page][reg::STATUS_WORD as usize] = 0;
        }
    }

    fn read(&self, code: u8) -> u16 {
        if code == reg::PAGE {
            return self.page as u16;
        }
        // Reads on the broadcast page come from channel 0
        let page = if self.page == BROADCAST_PAGE {
            0
        } else {
            self.page as usize
        };
        self.regs[page][code as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Byte(u8),
    Read,
    ReadBlock,
}

/// Split a bridge command into messages
fn parse_command(line: &str) -> Option<Vec<Vec<Token>>> {
    let mut tokens = line.split_whitespace();
    let cmd = tokens.next()?;
    if cmd.len() != 1 || !cmd.starts_with(BRIDGE_COMMAND) {
        return None;
    }

    let mut messages = vec![Vec::new()];
    for tok in tokens {
        let parsed = match tok {
            "!" => {
                messages.push(Vec::new());
                continue;
            }
            "?" => Token::Read,
            "*" => Token::ReadBlock,
            _ => {
                let hex = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X"))?;
                Token::Byte(u8::from_str_radix(hex, 16).ok()?)
            }
        };
        messages.last_mut()?.push(parsed);
    }
    Some(messages)
}

/// Simulated MMC console with an LTM4673 on its PMBus
#[derive(Debug)]
pub struct SimConsole {
    config: SimConfig,
    device: SimLtm4673,
    output: VecDeque<String>,
    sent: Vec<String>,
}

impl Default for SimConsole {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimConsole {
    /// Create a console with the given configuration
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            device: SimLtm4673::new(),
            output: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    /// The simulated device
    pub fn device(&self) -> &SimLtm4673 {
        &self.device
    }

    /// The simulated device, mutable
    pub fn device_mut(&mut self) -> &mut SimLtm4673 {
        &mut self.device
    }

    /// Every line sent so far
    pub fn sent_lines(&self) -> &[String] {
        &self.sent
    }

    fn print(&mut self, line: String) {
        self.output.push_back(line);
    }

    /// Execute one console line
    pub fn execute(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.sent.push(line.to_string());

        let Some(messages) = parse_command(line) else {
            log::debug!("sim: unrecognised line: {}", line);
            self.print("> Unknown option".to_string());
            return;
        };

        let Some(Token::Byte(addr)) = messages.first().and_then(|m| m.first()).copied() else {
            self.print("> Bad transaction".to_string());
            return;
        };
        if addr & !ADDR_READ != self.config.device_address {
            log::debug!("sim: no device at 0x{:02x}", addr);
            return;
        }

        let Some(Token::Byte(code)) = messages[0].get(1).copied() else {
            self.print("> Bad transaction".to_string());
            return;
        };

        let data: Vec<u8> = messages[0][2..]
            .iter()
            .filter_map(|t| match t {
                Token::Byte(b) => Some(*b),
                _ => None,
            })
            .collect();

        match messages.get(1) {
            None => self.handle_write(code, &data),
            Some(response) => self.handle_read(code, response),
        }
    }

    fn handle_write(&mut self, code: u8, data: &[u8]) {
        let register = CommandTable::ltm4673().lookup_by_address(code);
        let width = match register.spec().map(|s| s.mode) {
            Some(AccessMode::Send) => 0,
            Some(AccessMode::Byte) => 1,
            Some(AccessMode::Word) => 2,
            Some(AccessMode::Block) => {
                self.print(format!("> Block write to 0x{:02x} not supported", code));
                return;
            }
            None => data.len().min(2),
        };
        // Anything past the data is a PEC byte
        if data.len() < width {
            self.print(format!("> Short write to 0x{:02x}", code));
            return;
        }
        let mut value = data.first().copied().unwrap_or(0) as u16;
        if width == 2 {
            value |= (data[1] as u16) << 8;
        }

        if code == reg::PAGE {
            self.select_page(value as u8);
            return;
        }
        if width == 0 {
            if code == reg::CLEAR_FAULTS {
                self.device.clear_faults();
            }
            return;
        }

        if let Some(limits) = &self.config.limits {
            match limits.clamp(self.device.page, &register, value) {
                ClampOutcome::Within(v) => value = v,
                ClampOutcome::Clamped { to, .. } => {
                    self.print(format!("  [Limits] 0x{:04x} -> 0x{:04x}", value, to));
                    value = to;
                }
                ClampOutcome::Vetoed => {
                    self.print(format!("Vetoing write to protected register 0x{:02x}", code));
                    return;
                }
            }
        }

        log::trace!("sim: page 0x{:02x} {} <- 0x{:04x}", self.device.page, register, value);
        self.device.write(code, value);
    }

    fn select_page(&mut self, page: u8) {
        if page == BROADCAST_PAGE || (page as usize) < NUM_PAGES {
            self.device.page = page;
            self.print(format!("# LTM4673_PAGE 0x{:02x}", page));
        } else {
            self.print(format!("LTM4673 invalid PAGE written: 0x{:02x}", page));
        }
    }

    fn handle_read(&mut self, code: u8, response: &[Token]) {
        let requested = response.iter().filter(|t| **t == Token::Read).count();
        let block = response.contains(&Token::ReadBlock);
        let width = match CommandTable::ltm4673().lookup_by_address(code) {
            Register::Known(spec) => match spec.mode {
                AccessMode::Send => 0,
                AccessMode::Byte => 1,
                AccessMode::Word => 2,
                AccessMode::Block => 1,
            },
            Register::Unlisted(_) => requested.min(2),
        };
        if width == 0 || (!block && requested < width) {
            self.print(format!("> Bad read of 0x{:02x}", code));
            return;
        }

        let value = self.device.read(code);
        let addr = self.config.device_address;
        if code == reg::PAGE {
            self.print(format!("# LTM4673_PAGE 0x{:02x}", value));
        }
        // Block reads return an empty block: just the zero count byte
        let line = match (block, width) {
            (true, _) => format!("(0x{:02x}) 0x{:02x}: 0x00", addr, code),
            (false, 1) => format!("(0x{:02x}) 0x{:02x}: 0x{:02x}", addr, code, value & 0xFF),
            _ => format!(
                "(0x{:02x}) 0x{:02x}: 0x{:02x} 0x{:02x}",
                addr,
                code,
                value & 0xFF,
                value >> 8
            ),
        };
        self.print(line);
    }
}

impl ConsoleLink for SimConsole {
    fn send_line(&mut self, line: &str) -> Result<bool> {
        self.execute(line);
        Ok(true)
    }

    fn read_lines_until(&mut self, marker: Option<&str>) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.output.pop_front() {
            let done = marker.is_some_and(|m| line.contains(m));
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(console: &mut SimConsole, line: &str) -> Vec<String> {
        console.send_line(line).unwrap();
        console.read_lines_until(None).unwrap()
    }

    #[test]
    fn test_word_write_and_read() {
        let mut sim = SimConsole::default();
        assert!(run(&mut sim, "t 0xb8 0x21 0x9a 0x21").is_empty());
        assert_eq!(sim.device().register(0, 0x21), 0x219a);
        assert_eq!(
            run(&mut sim, "t 0xb8 0x21 ! 0xb9 ? ?"),
            vec!["(0xb8) 0x21: 0x9a 0x21"]
        );
        // READ_VOUT follows the setpoint
        assert_eq!(
            run(&mut sim, "t 0xb8 0x8b ! 0xb9 ? ?"),
            vec!["(0xb8) 0x8b: 0x9a 0x21"]
        );
    }

    #[test]
    fn test_page_select_and_marker() {
        let mut sim = SimConsole::default();
        assert_eq!(run(&mut sim, "t 0xb8 0x00 0x02"), vec!["# LTM4673_PAGE 0x02"]);
        assert_eq!(sim.device().page(), 2);
        assert_eq!(
            run(&mut sim, "t 0xb8 0x21 ! 0xb9 ? ?"),
            vec!["(0xb8) 0x21: 0x00 0x50"]
        );
        assert_eq!(
            run(&mut sim, "t 0xb8 0x00 ! 0xb9 ?"),
            vec!["# LTM4673_PAGE 0x02", "(0xb8) 0x00: 0x02"]
        );
        assert_eq!(
            run(&mut sim, "t 0xb8 0x00 0x07"),
            vec!["LTM4673 invalid PAGE written: 0x07"]
        );
        assert_eq!(sim.device().page(), 2);
    }

    #[test]
    fn test_broadcast_write() {
        let mut sim = SimConsole::default();
        run(&mut sim, "t 0xb8 0x00 0xff");
        run(&mut sim, "t 0xb8 0x55 0x00 0xda");
        for page in 0..4 {
            assert_eq!(sim.device().register(page, 0x55), 0xDA00);
        }
    }

    #[test]
    fn test_pec_byte_ignored() {
        let mut sim = SimConsole::default();
        run(&mut sim, "t 0xb8 0x21 0x00 0x20 0x00");
        assert_eq!(sim.device().register(0, 0x21), 0x2000);
        assert_eq!(
            run(&mut sim, "t 0xb8 0x79 ! 0xb9 ? ? ?"),
            vec!["(0xb8) 0x79: 0x00 0x00"]
        );
    }

    #[test]
    fn test_clear_faults() {
        let mut sim = SimConsole::default();
        sim.device_mut().set_register(1, reg::STATUS_WORD, 0x0840);
        run(&mut sim, "t 0xb8 0x00 0x01");
        run(&mut sim, "t 0xb8 0x03");
        assert_eq!(sim.device().register(1, reg::STATUS_WORD), 0);
    }

    #[test]
    fn test_other_device_and_noise() {
        let mut sim = SimConsole::default();
        assert!(run(&mut sim, "t 0xb6 0x21 ! 0xb7 ? ?").is_empty());
        assert_eq!(run(&mut sim, "help"), vec!["> Unknown option"]);
        assert_eq!(run(&mut sim, "t zz"), vec!["> Unknown option"]);
        assert!(run(&mut sim, "   ").is_empty());
        assert_eq!(sim.sent_lines().len(), 3);
    }

    #[test]
    fn test_write_guard() {
        let config = SimConfig {
            limits: Some(LimitTable::ltm4673_defaults().unwrap()),
            ..Default::default()
        };
        let mut sim = SimConsole::new(config);
        // 2.0 V on the 1.0 V rail is clamped to 1.05 V
        let out = run(&mut sim, "t 0xb8 0x21 0x00 0x40");
        assert_eq!(out, vec!["  [Limits] 0x4000 -> 0x219a"]);
        assert_eq!(sim.device().register(0, 0x21), 8602);

        let mut limits = LimitTable::new();
        limits.insert(0, 0x21, ltmtool_core::limits::Limit::protected());
        let mut sim = SimConsole::new(SimConfig {
            limits: Some(limits),
            ..Default::default()
        });
        let out = run(&mut sim, "t 0xb8 0x21 0x00 0x10");
        assert_eq!(out, vec!["Vetoing write to protected register 0x21"]);
        assert_eq!(sim.device().register(0, 0x21), 0x2000);
    }

    #[test]
    fn test_read_lines_until_marker() {
        let mut sim = SimConsole::default();
        sim.send_line("t 0xb8 0x00 0x01").unwrap();
        sim.send_line("t 0xb8 0x21 ! 0xb9 ? ?").unwrap();
        let first = sim.read_lines_until(Some("LTM4673_PAGE")).unwrap();
        assert_eq!(first, vec!["# LTM4673_PAGE 0x01"]);
        let rest = sim.read_lines_until(None).unwrap();
        assert_eq!(rest, vec!["(0xb8) 0x21: 0x9a 0x39"]);
    }

    #[test]
    fn test_block_read() {
        let mut sim = SimConsole::default();
        assert_eq!(run(&mut sim, "t 0xb8 0xc0 ! 0xb9 *"), vec!["(0xb8) 0xc0: 0x00"]);
    }
}
