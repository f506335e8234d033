//! Serial port console link

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use ltmtool_core::link::ConsoleLink;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{ConsoleError, Result};

/// Default baud rate of the MMC console
pub const DEFAULT_BAUD: u32 = 115_200;

/// Read timeout; one idle period
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Consecutive idle periods after which a read gives up
pub const MAX_IDLE_TIMEOUTS: u32 = 10;

/// Line terminator sent after every command
pub const LINE_ENDING: &str = "\r\n";

/// Splits a byte stream into trimmed, non-empty lines
#[derive(Debug, Default)]
struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes and return every line they complete
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' || b == b'\r' {
                self.finish_line(&mut lines);
            } else {
                self.partial.push(b);
            }
        }
        lines
    }

    /// Return whatever is left as a final line
    fn flush(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.finish_line(&mut lines);
        lines.pop()
    }

    fn finish_line(&mut self, lines: &mut Vec<String>) {
        let line = String::from_utf8_lossy(&self.partial).trim().to_string();
        self.partial.clear();
        if !line.is_empty() {
            lines.push(line);
        }
    }
}

/// MMC console on a serial port
pub struct SerialConsole {
    port: Box<dyn SerialPort>,
    buffer: LineBuffer,
}

impl SerialConsole {
    /// Open a serial port (8N1, no flow control)
    ///
    /// Uses [`DEFAULT_BAUD`] if `baud` is `None`.
    pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
        if device.is_empty() {
            return Err(ConsoleError::InvalidParameter("empty device path".into()));
        }
        let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        log::info!("Opened serial port {} at {} baud", device, baud_rate);

        Ok(Self {
            port,
            buffer: LineBuffer::default(),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<bool> {
        let mut data = String::with_capacity(line.len() + LINE_ENDING.len());
        data.push_str(line);
        data.push_str(LINE_ENDING);

        match self.port.write_all(data.as_bytes()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        self.port.flush()?;
        Ok(true)
    }

    fn read_lines(&mut self, marker: Option<&str>) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut idle = 0;
        let mut buf = [0u8; 256];

        while idle < MAX_IDLE_TIMEOUTS {
            let n = match self.port.read(&mut buf) {
                Ok(0) => {
                    idle += 1;
                    continue;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    idle += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            idle = 0;

            for line in self.buffer.push(&buf[..n]) {
                log::trace!("< {}", line);
                let done = marker.is_some_and(|m| line.contains(m));
                lines.push(line);
                if done {
                    return Ok(lines);
                }
            }
        }

        if let Some(line) = self.buffer.flush() {
            log::trace!("< {}", line);
            lines.push(line);
        }
        Ok(lines)
    }
}

impl ConsoleLink for SerialConsole {
    fn send_line(&mut self, line: &str) -> ltmtool_core::Result<bool> {
        log::debug!("> {}", line);
        Ok(self.write_line(line)?)
    }

    fn read_lines_until(&mut self, marker: Option<&str>) -> ltmtool_core::Result<Vec<String>> {
        Ok(self.read_lines(marker)?)
    }
}
