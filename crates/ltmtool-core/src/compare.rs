//! Program comparison
//!
//! The device may report registers in a different order than they were
//! written, and a readback usually covers only part of a program. The
//! permissive comparison therefore walks the *observed* side and looks every
//! value up in the reference by page and address. The strict comparison
//! requires both sides to be identical, order included.
//!
//! A failed comparison is not an error; it comes back as a [`Comparison`]
//! with `pass == false` and the differences in [`Comparison::diff`].

use std::fmt;

use crate::command::Register;
use crate::program::{Entry, PageProgram, Program};

/// How strictly to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Look up observed values in the reference by page and address
    #[default]
    Permissive,
    /// Require exact equality, including order
    Strict,
}

/// One observed register value that does not match the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Register that differs
    pub register: Register,
    /// Reference value, `None` if the reference does not have the register
    pub reference: Option<u16>,
    /// Value the device reported
    pub observed: u16,
}

/// Whether an observed page exists in the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Reference has the page
    Present,
    /// Reference has no such page; every observed value is unresolved
    Missing,
}

/// Differences on one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDiff {
    /// Page number
    pub page: u8,
    /// Whether the reference has this page
    pub status: PageStatus,
    /// Observed values that differ from (or are absent in) the reference
    pub mismatches: Vec<Mismatch>,
    /// Reference entries never observed (strict mode only)
    pub unobserved: Vec<Entry>,
}

impl PageDiff {
    fn new(page: u8, status: PageStatus) -> Self {
        Self {
            page,
            status,
            mismatches: Vec::new(),
            unobserved: Vec::new(),
        }
    }

    fn is_clean(&self) -> bool {
        self.status == PageStatus::Present
            && self.mismatches.is_empty()
            && self.unobserved.is_empty()
    }
}

/// All differences found by a comparison
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramDiff {
    /// Pages with differences, in observed order
    pub pages: Vec<PageDiff>,
    /// Reference pages that were never observed (strict mode only)
    pub unobserved_pages: Vec<u8>,
    /// Same contents but in a different page or entry order (strict mode only)
    pub reordered: bool,
}

impl ProgramDiff {
    /// Returns true if no differences were recorded
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.unobserved_pages.is_empty() && !self.reordered
    }

    /// Differences for `page`, if any
    pub fn page(&self, page: u8) -> Option<&PageDiff> {
        self.pages.iter().find(|p| p.page == page)
    }

    /// Total number of mismatching values
    pub fn mismatch_count(&self) -> usize {
        self.pages.iter().map(|p| p.mismatches.len()).sum()
    }
}

/// Result of comparing a readback against a reference program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Overall verdict
    pub pass: bool,
    /// What differed
    pub diff: ProgramDiff,
}

/// Compare `observed` against `reference` in permissive mode
pub fn compare_programs(reference: &Program, observed: &Program) -> Comparison {
    compare_programs_with(reference, observed, CompareMode::Permissive)
}

/// Compare `observed` against `reference`
///
/// Broadcast pages are compared as plain page numbers; expand the reference
/// with [`Program::expand_broadcast`] to compare against per-page readbacks.
pub fn compare_programs_with(reference: &Program, observed: &Program, mode: CompareMode) -> Comparison {
    let mut diff = ProgramDiff::default();

    for obs_page in &observed.pages {
        let page_diff = match reference.page(obs_page.page) {
            Some(ref_page) => diff_page(ref_page, obs_page, mode),
            None => missing_page(obs_page),
        };
        if !page_diff.is_clean() {
            diff.pages.push(page_diff);
        }
    }

    let pass = match mode {
        CompareMode::Permissive => diff.is_empty() && !observed.is_empty(),
        CompareMode::Strict => {
            diff.unobserved_pages = reference
                .pages
                .iter()
                .map(|p| p.page)
                .filter(|&page| observed.page(page).is_none())
                .collect();
            let equal = reference == observed;
            diff.reordered = !equal && diff.is_empty();
            equal && !observed.is_empty()
        }
    };

    log::debug!(
        "Compared {} observed values: {} mismatches, pass={}",
        observed.entry_count(),
        diff.mismatch_count(),
        pass
    );

    Comparison { pass, diff }
}

fn missing_page(observed: &PageProgram) -> PageDiff {
    let mut page_diff = PageDiff::new(observed.page, PageStatus::Missing);
    page_diff.mismatches = observed
        .entries
        .iter()
        .map(|e| Mismatch {
            register: e.register,
            reference: None,
            observed: e.value,
        })
        .collect();
    page_diff
}

fn diff_page(reference: &PageProgram, observed: &PageProgram, mode: CompareMode) -> PageDiff {
    let mut page_diff = PageDiff::new(observed.page, PageStatus::Present);

    for entry in &observed.entries {
        match reference.find_last(entry.address()) {
            Some(r) if r.value == entry.value => {}
            found => page_diff.mismatches.push(Mismatch {
                register: entry.register,
                reference: found.map(|r| r.value),
                observed: entry.value,
            }),
        }
    }

    if mode == CompareMode::Strict {
        page_diff.unobserved = reference
            .entries
            .iter()
            .filter(|r| observed.find_last(r.address()).is_none())
            .copied()
            .collect();
    }

    page_diff
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.diff.pages {
            match page.status {
                PageStatus::Present => writeln!(f, "page 0x{:02x}:", page.page)?,
                PageStatus::Missing => writeln!(f, "page 0x{:02x}: not in reference", page.page)?,
            }
            for m in &page.mismatches {
                match m.reference {
                    Some(r) => writeln!(
                        f,
                        "  {:<28} expected 0x{:04x}, read 0x{:04x}",
                        m.register.name(),
                        r,
                        m.observed
                    )?,
                    None => writeln!(
                        f,
                        "  {:<28} not in reference, read 0x{:04x}",
                        m.register.name(),
                        m.observed
                    )?,
                }
            }
            for e in &page.unobserved {
                writeln!(f, "  {:<28} expected 0x{:04x}, not read", e.register.name(), e.value)?;
            }
        }
        for page in &self.diff.unobserved_pages {
            writeln!(f, "page 0x{:02x}: not read", page)?;
        }
        if self.diff.reordered {
            writeln!(f, "readback order differs from reference")?;
        }
        write!(f, "{}", if self.pass { "PASS" } else { "FAIL" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandTable;

    fn program(entries: &[(u8, &str, u16)]) -> Program {
        Program::from_named(CommandTable::ltm4673(), entries.iter().copied()).unwrap()
    }

    #[test]
    fn test_exact_match_passes() {
        let reference = program(&[(0, "VOUT_COMMAND", 5)]);
        let observed = program(&[(0, "VOUT_COMMAND", 5)]);
        let c = compare_programs(&reference, &observed);
        assert!(c.pass);
        assert!(c.diff.is_empty());
    }

    #[test]
    fn test_value_mismatch() {
        let reference = program(&[(0, "VOUT_COMMAND", 5)]);
        let observed = program(&[(0, "VOUT_COMMAND", 6)]);
        let c = compare_programs(&reference, &observed);
        assert!(!c.pass);

        let page = c.diff.page(0).unwrap();
        assert_eq!(page.status, PageStatus::Present);
        assert_eq!(page.mismatches.len(), 1);
        assert_eq!(page.mismatches[0].register.name(), "VOUT_COMMAND");
        assert_eq!(
            (page.mismatches[0].reference, page.mismatches[0].observed),
            (Some(5), 6)
        );
    }

    #[test]
    fn test_missing_page() {
        let reference = program(&[(0, "VOUT_COMMAND", 5)]);
        let observed = program(&[(0, "VOUT_COMMAND", 5), (2, "VOUT_COMMAND", 5), (2, "READ_VOUT", 9)]);
        let c = compare_programs(&reference, &observed);
        assert!(!c.pass);

        let page = c.diff.page(2).unwrap();
        assert_eq!(page.status, PageStatus::Missing);
        assert_eq!(page.mismatches.len(), 2);
        assert!(page.mismatches.iter().all(|m| m.reference.is_none()));
        assert!(c.diff.page(0).is_none());
    }

    #[test]
    fn test_register_not_in_reference() {
        let reference = program(&[(0, "VOUT_COMMAND", 5)]);
        let observed = program(&[(0, "READ_VOUT", 5)]);
        let c = compare_programs(&reference, &observed);
        assert!(!c.pass);
        assert_eq!(c.diff.page(0).unwrap().mismatches[0].reference, None);
    }

    #[test]
    fn test_permissive_tolerates_reordering_and_partial_readback() {
        let reference = program(&[
            (0, "VOUT_COMMAND", 5),
            (0, "VOUT_MAX", 7),
            (1, "VOUT_COMMAND", 8),
        ]);
        let observed = program(&[(0, "VOUT_MAX", 7), (0, "VOUT_COMMAND", 5)]);
        assert!(compare_programs(&reference, &observed).pass);

        // Strict sees both the reordering and the missing page
        let c = compare_programs_with(&reference, &observed, CompareMode::Strict);
        assert!(!c.pass);
        assert_eq!(c.diff.unobserved_pages, vec![1]);
    }

    #[test]
    fn test_duplicate_reference_uses_last_write() {
        let reference = program(&[(0, "VOUT_COMMAND", 5), (0, "VOUT_COMMAND", 6)]);
        let observed = program(&[(0, "VOUT_COMMAND", 6)]);
        assert!(compare_programs(&reference, &observed).pass);
    }

    #[test]
    fn test_empty_observed_fails() {
        let reference = program(&[(0, "VOUT_COMMAND", 5)]);
        let c = compare_programs(&reference, &Program::new());
        assert!(!c.pass);
        assert!(c.diff.is_empty());
    }

    #[test]
    fn test_strict_mode() {
        let reference = program(&[(0, "VOUT_COMMAND", 5), (0, "VOUT_MAX", 7)]);

        let same = reference.clone();
        let c = compare_programs_with(&reference, &same, CompareMode::Strict);
        assert!(c.pass);
        assert!(c.diff.is_empty());

        let swapped = program(&[(0, "VOUT_MAX", 7), (0, "VOUT_COMMAND", 5)]);
        let c = compare_programs_with(&reference, &swapped, CompareMode::Strict);
        assert!(!c.pass);
        assert!(c.diff.reordered);
        assert!(c.diff.pages.is_empty());

        let partial = program(&[(0, "VOUT_COMMAND", 5)]);
        let c = compare_programs_with(&reference, &partial, CompareMode::Strict);
        assert!(!c.pass);
        assert!(!c.diff.reordered);
        assert_eq!(c.diff.page(0).unwrap().unobserved.len(), 1);
        assert_eq!(c.diff.page(0).unwrap().unobserved[0].register.name(), "VOUT_MAX");
    }

    #[test]
    fn test_display() {
        let reference = program(&[(0, "VOUT_COMMAND", 5)]);
        let observed = program(&[(0, "VOUT_COMMAND", 6)]);
        let text = compare_programs(&reference, &observed).to_string();
        assert!(text.contains("expected 0x0005, read 0x0006"));
        assert!(text.ends_with("FAIL"));
    }
}
