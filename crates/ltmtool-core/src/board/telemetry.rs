//! Telemetry register dump

use std::fmt;

use crate::codec::linear16_decode;
use crate::command::{reg, Register};
use crate::error::Result;
use crate::program::{Readback, DEVICE_PAGES};
use crate::transaction::{Transaction, TransactionBuilder};

/// A telemetry register and the unit it reads in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryRegister {
    /// Register name
    pub name: &'static str,
    /// Physical unit after conversion
    pub unit: &'static str,
}

const fn telem(name: &'static str, unit: &'static str) -> TelemetryRegister {
    TelemetryRegister { name, unit }
}

/// Registers read by a telemetry dump, in dump order
pub const TELEMETRY: &[TelemetryRegister] = &[
    telem("READ_VIN", "V"),
    telem("READ_IIN", "A"),
    telem("READ_PIN", "W"),
    telem("READ_VOUT", "V"),
    telem("READ_IOUT", "A"),
    telem("READ_TEMPERATURE_1", "degC"),
    telem("READ_TEMPERATURE_2", "degC"),
    telem("READ_POUT", "W"),
    telem("MFR_READ_IOUT", "mA"),
    telem("MFR_IIN_PEAK", "A"),
    telem("MFR_IIN_MIN", "A"),
    telem("MFR_PIN_PEAK", "W"),
    telem("MFR_PIN_MIN", "W"),
    telem("MFR_IOUT_SENSE_VOLTAGE", "V"),
    telem("MFR_VIN_PEAK", "V"),
    telem("MFR_VOUT_PEAK", "V"),
    telem("MFR_IOUT_PEAK", "A"),
    telem("MFR_TEMPERATURE_1_PEAK", "degC"),
    telem("MFR_VIN_MIN", "V"),
    telem("MFR_VOUT_MIN", "V"),
    telem("MFR_IOUT_MIN", "A"),
    telem("MFR_TEMPERATURE_1_MIN", "degC"),
];

/// Transactions that read every telemetry register on every channel
pub fn telemetry_reads(builder: &TransactionBuilder<'_>) -> Result<Vec<Transaction>> {
    let mut xacts = Vec::with_capacity(DEVICE_PAGES.len() * (TELEMETRY.len() + 1));
    for page in DEVICE_PAGES {
        xacts.push(builder.write("PAGE", page)?);
        for t in TELEMETRY {
            xacts.push(builder.read(t.name)?);
        }
    }
    Ok(xacts)
}

/// Convert a raw telemetry word to physical units
///
/// MFR_READ_IOUT counts 2.5 mA per LSB. MFR_IOUT_SENSE_VOLTAGE is scaled by
/// 0.025 and truncated before the Linear16 conversion. Everything else goes
/// through the register's encoding.
pub fn physical_value(register: &Register, raw: u16) -> f64 {
    match register.address() {
        reg::MFR_READ_IOUT => raw as f64 * 2.5,
        reg::MFR_IOUT_SENSE_VOLTAGE => linear16_decode((raw as f64 * 0.025) as u16),
        _ => register.encoding().decode(raw),
    }
}

/// One converted telemetry value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReading {
    /// Channel the value was read on
    pub page: u8,
    /// Register read
    pub register: Register,
    /// Raw data word
    pub raw: u16,
    /// Value in `unit`
    pub value: f64,
    /// Physical unit
    pub unit: &'static str,
}

impl fmt::Display for TelemetryReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "r[{:02x}] = 0x{:04x} = {:5} = {:9.3} {:<5} {}",
            self.register.address(),
            self.raw,
            self.raw,
            self.value,
            self.unit,
            self.register.name()
        )
    }
}

/// Pick the telemetry registers out of a readback and convert them
pub fn telemetry_readings(readback: &Readback) -> Vec<TelemetryReading> {
    readback
        .pages
        .iter()
        .flat_map(|page| {
            page.entries.iter().filter_map(move |entry| {
                let t = TELEMETRY.iter().find(|t| t.name == entry.register.name())?;
                Some(TelemetryReading {
                    page: page.page,
                    register: entry.register,
                    raw: entry.value,
                    value: physical_value(&entry.register, entry.value),
                    unit: t.unit,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandTable;
    use crate::console::render;
    use crate::program::Program;
    use crate::transaction::BusConfig;

    fn register(name: &str) -> Register {
        Register::Known(CommandTable::ltm4673().lookup_by_name(name).unwrap())
    }

    #[test]
    fn test_all_telemetry_registers_are_words() {
        let table = CommandTable::ltm4673();
        for t in TELEMETRY {
            let spec = table.lookup_by_name(t.name).unwrap();
            assert_eq!(spec.mode, crate::command::AccessMode::Word, "{}", t.name);
        }
        assert_eq!(TELEMETRY.len(), 22);
    }

    #[test]
    fn test_telemetry_reads() {
        let builder = TransactionBuilder::new(CommandTable::ltm4673(), BusConfig::default());
        let xacts = telemetry_reads(&builder).unwrap();
        assert_eq!(xacts.len(), 4 * 23);
        assert_eq!(render(&xacts[0]), "t 0xb8 0x00 0x00");
        assert_eq!(render(&xacts[1]), "t 0xb8 0x88 ! 0xb9 ? ?");
        assert_eq!(render(&xacts[23]), "t 0xb8 0x00 0x01");
    }

    #[test]
    fn test_physical_value() {
        assert_eq!(physical_value(&register("MFR_READ_IOUT"), 400), 1000.0);
        assert_eq!(physical_value(&register("READ_VOUT"), 0x2000), 1.0);
        assert_eq!(physical_value(&register("READ_VIN"), 0xD320), 12.5);
        // 0x2000 * 0.025 = 204.8 -> 204
        assert_eq!(
            physical_value(&register("MFR_IOUT_SENSE_VOLTAGE"), 0x2000),
            204.0 / 8192.0
        );
    }

    #[test]
    fn test_telemetry_readings_filter() {
        let mut readback = Program::new();
        readback.push(1, register("READ_VIN"), 0xD320);
        readback.push(1, register("VOUT_COMMAND"), 0x2000);
        readback.push(1, register("MFR_READ_IOUT"), 4);

        let readings = telemetry_readings(&readback);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].page, 1);
        assert_eq!(readings[0].unit, "V");
        assert_eq!(readings[1].value, 10.0);
        assert_eq!(readings[1].unit, "mA");
        assert!(readings[0].to_string().starts_with("r[88] = 0xd320"));
    }
}
