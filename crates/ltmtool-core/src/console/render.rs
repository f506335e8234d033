//! Transaction to console line rendering

use crate::transaction::{MessageByte, Transaction};

/// Console command that runs an SMBus transaction
pub const BRIDGE_COMMAND: char = 't';
/// Read one byte
pub const TOKEN_READ_BYTE: &str = "?";
/// Read a count byte and that many bytes
pub const TOKEN_READ_BLOCK: &str = "*";
/// Repeated start between messages
pub const TOKEN_RESTART: &str = "!";

/// Render one transaction as a console line
pub fn render(transaction: &Transaction) -> String {
    let mut line = String::from(BRIDGE_COMMAND);
    for (i, message) in transaction.messages.iter().enumerate() {
        if i > 0 {
            line.push(' ');
            line.push_str(TOKEN_RESTART);
        }
        for byte in &message.bytes {
            line.push(' ');
            match byte {
                MessageByte::Literal(v) => line.push_str(&format!("0x{:02x}", v)),
                MessageByte::ReadByte => line.push_str(TOKEN_READ_BYTE),
                MessageByte::ReadBlock => line.push_str(TOKEN_READ_BLOCK),
            }
        }
    }
    line
}

/// Render a batch of transactions, one line each
pub fn render_many(transactions: &[Transaction]) -> Vec<String> {
    transactions.iter().map(render).collect()
}
