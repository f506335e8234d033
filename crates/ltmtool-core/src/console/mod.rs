//! MMC console translation
//!
//! Outbound, transactions become bridge command lines for the MMC console:
//!
//! ```text
//! t 0xb8 0x8b ! 0xb9 ? ?
//! ```
//!
//! Inbound, the MMC echoes each completed read as
//!
//! ```text
//! (0xb8) 0x8b: 0x00 0x20
//! ```
//!
//! and page changes show up as `# LTM4673_PAGE 0x01` marker lines. The two
//! directions use different grammars; nothing here tries to parse the
//! outbound form back.

mod parse;
mod render;

pub use parse::{parse_line, parse_page_marker, Readout, ReadbackParser, PAGE_MARKER};
pub use render::{render, render_many, BRIDGE_COMMAND, TOKEN_READ_BLOCK, TOKEN_READ_BYTE, TOKEN_RESTART};
