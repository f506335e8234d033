//! Line-oriented console boundary
//!
//! Everything in this crate works on console lines as strings. Moving them to
//! and from a board is left to implementors of [`ConsoleLink`]: a serial port
//! in `ltmtool-console`, an in-memory device in `ltmtool-sim`.

use crate::error::Result;

/// A text console that accepts command lines and prints reply lines
pub trait ConsoleLink {
    /// Send one line (without terminator)
    ///
    /// Returns false if the link timed out before the line went out.
    fn send_line(&mut self, line: &str) -> Result<bool>;

    /// Collect reply lines
    ///
    /// With `Some(marker)`, stops after the first line containing `marker`.
    /// Otherwise (or if the marker never shows up) reads until the link goes
    /// idle. Lines are trimmed and empty lines dropped.
    fn read_lines_until(&mut self, marker: Option<&str>) -> Result<Vec<String>>;
}

impl<T: ConsoleLink + ?Sized> ConsoleLink for &mut T {
    fn send_line(&mut self, line: &str) -> Result<bool> {
        (**self).send_line(line)
    }

    fn read_lines_until(&mut self, marker: Option<&str>) -> Result<Vec<String>> {
        (**self).read_lines_until(marker)
    }
}

impl<T: ConsoleLink + ?Sized> ConsoleLink for Box<T> {
    fn send_line(&mut self, line: &str) -> Result<bool> {
        (**self).send_line(line)
    }

    fn read_lines_until(&mut self, marker: Option<&str>) -> Result<Vec<String>> {
        (**self).read_lines_until(marker)
    }
}
