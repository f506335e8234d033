//! SMBus transaction builder
//!
//! A transaction is a list of messages. The first message starts with a start
//! condition, every later one with a repeated start. Each message is a list of
//! bytes the master writes, or placeholders for bytes it reads back.
//!
//! ```text
//! Read word:   [addr|W, code] ! [addr|R, ?, ?]
//! Read block:  [addr|W, code] ! [addr|R, *]
//! Write word:  [addr|W, code, lo, hi]
//! Send byte:   [addr|W, code]
//! ```

use crate::command::{AccessMode, CommandSpec, CommandTable, ReadLength};
use crate::error::{Error, Result};
use crate::pec::PecMode;

/// Default 8-bit write address of the LTM4673 on the Marble board
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0xB8;

/// Global (broadcast) 8-bit write address
pub const GLOBAL_DEVICE_ADDRESS: u8 = 0xB6;

/// Read bit of an 8-bit address
pub const ADDR_READ: u8 = 0x01;

/// One slot in a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageByte {
    /// Byte written by the master
    Literal(u8),
    /// Read one byte
    ReadByte,
    /// Read a count byte, then that many bytes
    ReadBlock,
}

/// Bytes between one (repeated) start condition and the next
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Message contents in bus order
    pub bytes: Vec<MessageByte>,
}

impl Message {
    fn literals(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().copied().map(MessageByte::Literal).collect(),
        }
    }

    /// Bytes the master writes in this message
    pub fn literal_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.bytes.iter().filter_map(|b| match b {
            MessageByte::Literal(v) => Some(*v),
            _ => None,
        })
    }
}

/// A complete SMBus transaction for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Command the transaction addresses
    pub command: CommandSpec,
    /// Messages separated by repeated starts
    pub messages: Vec<Message>,
}

impl Transaction {
    /// Returns true if the transaction reads anything back
    pub fn is_read(&self) -> bool {
        self.messages.iter().any(|m| {
            m.bytes
                .iter()
                .any(|b| !matches!(b, MessageByte::Literal(_)))
        })
    }
}

/// Value for a write transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteValue {
    /// Integer, split into bytes according to the access mode
    Raw(u32),
    /// Pre-split bytes, LSB first
    Bytes(Vec<u8>),
}

impl From<u8> for WriteValue {
    fn from(v: u8) -> Self {
        WriteValue::Raw(v as u32)
    }
}

impl From<u16> for WriteValue {
    fn from(v: u16) -> Self {
        WriteValue::Raw(v as u32)
    }
}

impl From<u32> for WriteValue {
    fn from(v: u32) -> Self {
        WriteValue::Raw(v)
    }
}

impl From<Vec<u8>> for WriteValue {
    fn from(v: Vec<u8>) -> Self {
        WriteValue::Bytes(v)
    }
}

impl From<&[u8]> for WriteValue {
    fn from(v: &[u8]) -> Self {
        WriteValue::Bytes(v.to_vec())
    }
}

/// Bus parameters for building transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// 8-bit write address (R/W bit clear)
    pub device_address: u8,
    /// Packet error checking
    pub pec: PecMode,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS,
            pec: PecMode::None,
        }
    }
}

impl BusConfig {
    /// Config for a device at `device_address` without PEC
    pub fn new(device_address: u8) -> Self {
        Self {
            device_address: device_address & !ADDR_READ,
            pec: PecMode::None,
        }
    }

    /// Use `pec` for every transaction
    pub fn with_pec(mut self, pec: PecMode) -> Self {
        self.pec = pec;
        self
    }

    fn write_address(&self) -> u8 {
        self.device_address & !ADDR_READ
    }

    fn read_address(&self) -> u8 {
        self.device_address | ADDR_READ
    }
}

/// Builds transactions for commands of one table on one device
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder<'a> {
    table: &'a CommandTable,
    config: BusConfig,
}

impl<'a> TransactionBuilder<'a> {
    /// Create a builder
    pub fn new(table: &'a CommandTable, config: BusConfig) -> Self {
        Self { table, config }
    }

    /// Command table in use
    pub fn table(&self) -> &'a CommandTable {
        self.table
    }

    /// Bus configuration in use
    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Build a read (`value == None`) or write transaction for `spec`
    pub fn build(&self, spec: &CommandSpec, value: Option<WriteValue>) -> Result<Transaction> {
        let messages = match value {
            None => self.read_messages(spec),
            Some(value) => vec![self.write_message(spec, value)?],
        };
        Ok(Transaction {
            command: *spec,
            messages,
        })
    }

    /// Build a transaction for a command given by name
    pub fn build_named(&self, name: &str, value: Option<WriteValue>) -> Result<Transaction> {
        let spec = self.table.lookup_by_name(name)?;
        self.build(&spec, value)
    }

    /// Read transaction for a named command
    pub fn read(&self, name: &str) -> Result<Transaction> {
        self.build_named(name, None)
    }

    /// Write transaction for a named command
    pub fn write(&self, name: &str, value: impl Into<WriteValue>) -> Result<Transaction> {
        self.build_named(name, Some(value.into()))
    }

    /// Write transaction from a value in engineering units, encoded with the
    /// command's encoding
    pub fn write_value(&self, name: &str, value: f64) -> Result<Transaction> {
        let spec = self.table.lookup_by_name(name)?;
        let raw = spec.encoding.encode(value)?;
        self.build(&spec, Some(WriteValue::Raw(raw as u32)))
    }

    fn read_messages(&self, spec: &CommandSpec) -> Vec<Message> {
        let wr = self.config.write_address();
        let rd = self.config.read_address();

        if spec.mode == AccessMode::Send {
            return vec![self.with_pec(Message::literals(&[wr, spec.address]))];
        }

        let request = Message::literals(&[wr, spec.address]);
        let mut response = Message::literals(&[rd]);
        match spec.mode.read_length() {
            ReadLength::Fixed(n) => {
                response
                    .bytes
                    .extend(std::iter::repeat(MessageByte::ReadByte).take(n as usize));
                if self.config.pec.is_enabled() {
                    response.bytes.push(MessageByte::ReadByte);
                }
            }
            ReadLength::CountedBlock => response.bytes.push(MessageByte::ReadBlock),
        }
        vec![request, response]
    }

    fn write_message(&self, spec: &CommandSpec, value: WriteValue) -> Result<Message> {
        let invalid = |reason| Error::InvalidTransaction {
            command: spec.name.to_string(),
            reason,
        };

        let mut bytes = vec![self.config.write_address(), spec.address];
        match (spec.mode, value) {
            (AccessMode::Send, _) => {}
            (AccessMode::Byte, WriteValue::Raw(v)) => bytes.push((v & 0xFF) as u8),
            (AccessMode::Byte, WriteValue::Bytes(b)) => {
                let first = b.first().ok_or_else(|| invalid("no data byte"))?;
                bytes.push(*first);
            }
            (AccessMode::Word, WriteValue::Raw(v)) => {
                bytes.push((v & 0xFF) as u8);
                bytes.push(((v >> 8) & 0xFF) as u8);
            }
            (AccessMode::Word, WriteValue::Bytes(b)) => {
                if b.len() != 2 {
                    return Err(invalid("word write needs exactly two bytes"));
                }
                bytes.extend_from_slice(&b);
            }
            (AccessMode::Block, _) => return Err(invalid("block writes are not supported")),
        }

        Ok(self.with_pec(Message::literals(&bytes)))
    }

    fn with_pec(&self, mut message: Message) -> Message {
        let data: Vec<u8> = message.literal_bytes().collect();
        if let Some(pec) = self.config.pec.byte_for(&data) {
            message.bytes.push(MessageByte::Literal(pec));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pec::crc8;
    use MessageByte::{Literal, ReadBlock, ReadByte};

    fn builder(pec: PecMode) -> TransactionBuilder<'static> {
        TransactionBuilder::new(CommandTable::ltm4673(), BusConfig::default().with_pec(pec))
    }

    #[test]
    fn test_read_word_shape() {
        let t = builder(PecMode::None).read("READ_VOUT").unwrap();
        assert_eq!(t.messages.len(), 2);
        assert_eq!(t.messages[0].bytes, vec![Literal(0xB8), Literal(0x8B)]);
        assert_eq!(
            t.messages[1].bytes,
            vec![Literal(0xB9), ReadByte, ReadByte]
        );
        assert!(t.is_read());
    }

    #[test]
    fn test_read_byte_shape() {
        let t = builder(PecMode::None).read("PAGE").unwrap();
        assert_eq!(t.messages[1].bytes, vec![Literal(0xB9), ReadByte]);
    }

    #[test]
    fn test_send_has_no_response() {
        let t = builder(PecMode::None).read("CLEAR_FAULTS").unwrap();
        assert_eq!(t.messages.len(), 1);
        assert_eq!(t.messages[0].bytes, vec![Literal(0xB8), Literal(0x03)]);
        assert!(!t.is_read());

        // Send ignores a value
        let w = builder(PecMode::None).write("CLEAR_FAULTS", 0x55u8).unwrap();
        assert_eq!(w, t);
    }

    #[test]
    fn test_read_block_shape() {
        let t = builder(PecMode::None).read("MFR_EIN").unwrap();
        assert_eq!(t.messages[1].bytes, vec![Literal(0xB9), ReadBlock]);
    }

    #[test]
    fn test_write_word_lsb_first() {
        let t = builder(PecMode::None).write("VOUT_COMMAND", 0x2000u16).unwrap();
        assert_eq!(t.messages.len(), 1);
        assert_eq!(
            t.messages[0].bytes,
            vec![Literal(0xB8), Literal(0x21), Literal(0x00), Literal(0x20)]
        );
        assert!(!t.is_read());
    }

    #[test]
    fn test_write_byte_masks_value() {
        let t = builder(PecMode::None).write("PAGE", 0x1FFu32).unwrap();
        assert_eq!(
            t.messages[0].bytes,
            vec![Literal(0xB8), Literal(0x00), Literal(0xFF)]
        );
    }

    #[test]
    fn test_write_pre_split_bytes() {
        let b = builder(PecMode::None);
        let t = b.write("VOUT_COMMAND", vec![0x34, 0x12]).unwrap();
        assert_eq!(
            t.messages[0].literal_bytes().collect::<Vec<_>>(),
            vec![0xB8, 0x21, 0x34, 0x12]
        );

        let t = b.write("PAGE", vec![0x02, 0x99]).unwrap();
        assert_eq!(
            t.messages[0].literal_bytes().collect::<Vec<_>>(),
            vec![0xB8, 0x00, 0x02]
        );

        assert!(matches!(
            b.write("VOUT_COMMAND", vec![0x34]),
            Err(Error::InvalidTransaction { .. })
        ));
        assert!(b.write("PAGE", Vec::new()).is_err());
    }

    #[test]
    fn test_block_write_rejected() {
        assert!(matches!(
            builder(PecMode::None).write("MFR_EIN", 0x41u8),
            Err(Error::InvalidTransaction { .. })
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            builder(PecMode::None).read("NOPE"),
            Err(Error::UnknownCommand("NOPE".into()))
        );
    }

    #[test]
    fn test_write_value_encodes() {
        let b = builder(PecMode::None);
        assert_eq!(
            b.write_value("VOUT_COMMAND", 1.0).unwrap(),
            b.write("VOUT_COMMAND", 0x2000u16).unwrap()
        );
        assert!(b.write_value("VOUT_COMMAND", 9.0).is_err());
    }

    #[test]
    fn test_custom_address_clears_read_bit() {
        let config = BusConfig::new(0xB9);
        let b = TransactionBuilder::new(CommandTable::ltm4673(), config);
        let t = b.read("PAGE").unwrap();
        assert_eq!(t.messages[0].bytes[0], Literal(0xB8));
        assert_eq!(t.messages[1].bytes[0], Literal(0xB9));
    }

    #[test]
    fn test_pec_placeholder() {
        let b = builder(PecMode::Placeholder);
        let w = b.write("VOUT_COMMAND", 0x2000u16).unwrap();
        assert_eq!(w.messages[0].bytes.last(), Some(&Literal(0x00)));
        assert_eq!(w.messages[0].bytes.len(), 5);

        let r = b.read("READ_VOUT").unwrap();
        assert_eq!(
            r.messages[1].bytes,
            vec![Literal(0xB9), ReadByte, ReadByte, ReadByte]
        );

        // Block responses carry their own length and are left alone
        let r = b.read("MFR_EIN").unwrap();
        assert_eq!(r.messages[1].bytes, vec![Literal(0xB9), ReadBlock]);
    }

    #[test]
    fn test_pec_crc8() {
        let w = builder(PecMode::Crc8).write("VOUT_COMMAND", 0x2000u16).unwrap();
        let expected = crc8(&[0xB8, 0x21, 0x00, 0x20]);
        assert_eq!(w.messages[0].bytes.last(), Some(&Literal(expected)));
    }
}
