//! Paced command sessions over a console link

use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ltmtool_core::compare::{compare_programs_with, CompareMode, Comparison};
use ltmtool_core::console::{render_many, ReadbackParser};
use ltmtool_core::link::ConsoleLink;
use ltmtool_core::program::{Program, Readback};
use ltmtool_core::transaction::{Transaction, TransactionBuilder};
use ltmtool_core::Result;

/// Delays the MMC console needs between lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after each line
    pub inter_line: Duration,
    /// Pause after the last line before collecting output
    pub settle: Duration,
}

impl Pacing {
    /// Reads: the MMC keeps up with short gaps
    pub const READ: Pacing = Pacing {
        inter_line: Duration::from_millis(10),
        settle: Duration::from_secs(1),
    };

    /// Writes: give the firmware time to print limit notes
    pub const WRITE: Pacing = Pacing {
        inter_line: Duration::from_millis(100),
        settle: Duration::from_secs(1),
    };

    /// No delays (in-memory links)
    pub const NONE: Pacing = Pacing {
        inter_line: Duration::ZERO,
        settle: Duration::ZERO,
    };
}

impl Default for Pacing {
    fn default() -> Self {
        Self::READ
    }
}

/// True for lines that are never sent: blanks and `#` comments
fn is_skipped(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// A console link plus the pacing to drive it with
pub struct Session<L: ConsoleLink> {
    link: L,
    pacing: Pacing,
    progress: bool,
}

impl<L: ConsoleLink> Session<L> {
    pub fn new(link: L, pacing: Pacing) -> Self {
        Self {
            link,
            pacing,
            progress: false,
        }
    }

    /// Show a progress bar while sending
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }

    /// Send lines, skipping blanks and `#` comments
    ///
    /// Returns the number of lines that went out. Lines the link timed out
    /// on are logged and skipped.
    pub fn send_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<usize> {
        let to_send: Vec<&str> = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .filter(|l| !is_skipped(l))
            .collect();

        let pb = self.progress_bar(to_send.len());
        let mut sent = 0;
        for line in to_send {
            if self.link.send_line(line)? {
                sent += 1;
            } else {
                log::warn!("Timed out sending: {}", line);
            }
            if !self.pacing.inter_line.is_zero() {
                thread::sleep(self.pacing.inter_line);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        log::debug!("Sent {} lines", sent);
        Ok(sent)
    }

    /// Send lines, wait for the console to settle and collect its output
    pub fn exchange<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<Vec<String>> {
        self.send_lines(lines)?;
        if !self.pacing.settle.is_zero() {
            thread::sleep(self.pacing.settle);
        }
        let output = self.link.read_lines_until(None)?;
        log::debug!("Received {} lines", output.len());
        Ok(output)
    }

    /// Render and run transactions, returning the console output
    pub fn run_transactions(&mut self, transactions: &[Transaction]) -> Result<Vec<String>> {
        let lines = render_many(transactions);
        self.exchange(&lines)
    }

    /// Run transactions and regroup the readouts by page
    pub fn read_back(
        &mut self,
        transactions: &[Transaction],
        builder: &TransactionBuilder<'_>,
    ) -> Result<Readback> {
        let output = self.run_transactions(transactions)?;
        Ok(ReadbackParser::parse(
            builder.table(),
            builder.config().device_address,
            &output,
        ))
    }

    /// Write a program; returns whatever the console printed
    pub fn write_program(
        &mut self,
        program: &Program,
        builder: &TransactionBuilder<'_>,
    ) -> Result<Vec<String>> {
        let transactions = program.write_transactions(builder)?;
        log::info!(
            "Writing {} registers on {} pages",
            program.entry_count(),
            program.pages.len()
        );
        self.run_transactions(&transactions)
    }

    /// Read back every register a program touches
    pub fn read_program(
        &mut self,
        program: &Program,
        builder: &TransactionBuilder<'_>,
    ) -> Result<Readback> {
        let transactions = program.read_transactions(builder)?;
        self.read_back(&transactions, builder)
    }

    /// Read back a program's registers and compare against it
    pub fn verify_program(
        &mut self,
        program: &Program,
        builder: &TransactionBuilder<'_>,
        mode: CompareMode,
    ) -> Result<Comparison> {
        let readback = self.read_program(program, builder)?;
        Ok(compare_programs_with(&program.expand_broadcast(), &readback, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltmtool_core::command::{reg, CommandTable};
    use ltmtool_core::limits::LimitTable;
    use ltmtool_core::pec::PecMode;
    use ltmtool_core::program::BROADCAST_PAGE;
    use ltmtool_core::transaction::BusConfig;
    use ltmtool_sim::{SimConfig, SimConsole};

    fn builder() -> TransactionBuilder<'static> {
        TransactionBuilder::new(CommandTable::ltm4673(), BusConfig::default())
    }

    fn sample_program() -> Program {
        Program::from_named(
            CommandTable::ltm4673(),
            [
                (BROADCAST_PAGE, "VIN_OV_FAULT_LIMIT", 0xD3A0),
                (0, "VOUT_COMMAND", 0x2100),
                (1, "VOUT_COMMAND", 0x3a00),
                (3, "VOUT_COMMAND", 0x6800),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_send_lines_skips_comments() {
        let mut session = Session::new(SimConsole::default(), Pacing::NONE);
        let sent = session
            .send_lines(&["# set page", "", "t 0xb8 0x00 0x01", "   "][..])
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(session.link_mut().sent_lines(), ["t 0xb8 0x00 0x01"]);
    }

    #[test]
    fn test_read_back_single_register() {
        let b = builder();
        let mut session = Session::new(SimConsole::default(), Pacing::NONE);
        let readback = session.read_back(&[b.read("READ_VOUT").unwrap()], &b).unwrap();
        let p0 = readback.page(0).unwrap();
        assert_eq!(p0.entries.len(), 1);
        assert_eq!(p0.entries[0].address(), reg::READ_VOUT);
        assert_eq!(p0.entries[0].value, 0x2000);
    }

    #[test]
    fn test_write_then_verify() {
        let b = builder();
        let program = sample_program();
        let mut session = Session::new(SimConsole::default(), Pacing::NONE);

        session.write_program(&program, &b).unwrap();
        let sim = session.link_mut().device();
        assert_eq!(sim.register(2, reg::VIN_OV_FAULT_LIMIT), 0xD3A0);
        assert_eq!(sim.register(3, reg::VOUT_COMMAND), 0x6800);

        let cmp = session
            .verify_program(&program, &b, CompareMode::Permissive)
            .unwrap();
        assert!(cmp.pass, "{}", cmp);
    }

    #[test]
    fn test_verify_detects_drift() {
        let b = builder();
        let program = sample_program();
        let mut session = Session::new(SimConsole::default(), Pacing::NONE);
        session.write_program(&program, &b).unwrap();
        session
            .link_mut()
            .device_mut()
            .set_register(1, reg::VOUT_COMMAND, 0x3000);

        let cmp = session
            .verify_program(&program, &b, CompareMode::Permissive)
            .unwrap();
        assert!(!cmp.pass);
        assert_eq!(cmp.diff.mismatch_count(), 1);
        let mismatch = &cmp.diff.page(1).unwrap().mismatches[0];
        assert_eq!(mismatch.reference, Some(0x3a00));
        assert_eq!(mismatch.observed, 0x3000);
    }

    #[test]
    fn test_guarded_write_is_clamped() {
        let b = builder();
        let config = SimConfig {
            limits: Some(LimitTable::ltm4673_defaults().unwrap()),
            ..Default::default()
        };
        let mut session = Session::new(SimConsole::new(config), Pacing::NONE);
        let program =
            Program::from_named(CommandTable::ltm4673(), [(0, "VOUT_COMMAND", 0x4000)]).unwrap();

        let output = session.write_program(&program, &b).unwrap();
        assert!(output.iter().any(|l| l.contains("[Limits]")));

        let cmp = session
            .verify_program(&program, &b, CompareMode::Permissive)
            .unwrap();
        assert!(!cmp.pass);
    }

    #[test]
    fn test_pec_reads() {
        let b = TransactionBuilder::new(
            CommandTable::ltm4673(),
            BusConfig::default().with_pec(PecMode::Crc8),
        );
        let program = sample_program();
        let mut session = Session::new(SimConsole::default(), Pacing::NONE);
        session.write_program(&program, &b).unwrap();
        let cmp = session
            .verify_program(&program, &b, CompareMode::Permissive)
            .unwrap();
        assert!(cmp.pass, "{}", cmp);
    }
}
