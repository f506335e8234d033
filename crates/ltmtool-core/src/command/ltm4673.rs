//! LTM4673 register set
//!
//! Access modes and encodings follow the LTM4673 datasheet register summary.
//! Voltage-output registers are Linear16 with the device's fixed exponent;
//! input, current, temperature and timing registers are Linear11.

use super::types::AccessMode::{self, Block, Byte, Send, Word};
use super::types::CommandSpec;
use crate::codec::Encoding::{self, Linear11, Linear16, Raw};

const fn cmd(name: &'static str, address: u8, mode: AccessMode, encoding: Encoding) -> CommandSpec {
    CommandSpec::new(name, address, mode, encoding)
}

/// Every LTM4673 command, in address order
pub const LTM4673_COMMANDS: &[CommandSpec] = &[
    cmd("PAGE", 0x00, Byte, Raw),
    cmd("OPERATION", 0x01, Byte, Raw),
    cmd("ON_OFF_CONFIG", 0x02, Byte, Raw),
    cmd("CLEAR_FAULTS", 0x03, Send, Raw),
    cmd("WRITE_PROTECT", 0x10, Byte, Raw),
    cmd("STORE_USER_ALL", 0x15, Send, Raw),
    cmd("RESTORE_USER_ALL", 0x16, Send, Raw),
    cmd("CAPABILITY", 0x19, Byte, Raw),
    cmd("VOUT_MODE", 0x20, Byte, Raw),
    cmd("VOUT_COMMAND", 0x21, Word, Linear16),
    cmd("VOUT_MAX", 0x24, Word, Linear16),
    cmd("VOUT_MARGIN_HIGH", 0x25, Word, Linear16),
    cmd("VOUT_MARGIN_LOW", 0x26, Word, Linear16),
    cmd("VIN_ON", 0x35, Word, Linear11),
    cmd("VIN_OFF", 0x36, Word, Linear11),
    cmd("IOUT_CAL_GAIN", 0x38, Word, Linear11),
    cmd("VOUT_OV_FAULT_LIMIT", 0x40, Word, Linear16),
    cmd("VOUT_OV_FAULT_RESPONSE", 0x41, Byte, Raw),
    cmd("VOUT_OV_WARN_LIMIT", 0x42, Word, Linear16),
    cmd("VOUT_UV_WARN_LIMIT", 0x43, Word, Linear16),
    cmd("VOUT_UV_FAULT_LIMIT", 0x44, Word, Linear16),
    cmd("VOUT_UV_FAULT_RESPONSE", 0x45, Byte, Raw),
    cmd("IOUT_OC_FAULT_LIMIT", 0x46, Word, Linear11),
    cmd("IOUT_OC_FAULT_RESPONSE", 0x47, Byte, Raw),
    cmd("IOUT_OC_WARN_LIMIT", 0x4a, Word, Linear11),
    cmd("IOUT_UC_FAULT_LIMIT", 0x4b, Word, Linear11),
    cmd("IOUT_UC_FAULT_RESPONSE", 0x4c, Byte, Raw),
    cmd("OT_FAULT_LIMIT", 0x4f, Word, Linear11),
    cmd("OT_FAULT_RESPONSE", 0x50, Byte, Raw),
    cmd("OT_WARN_LIMIT", 0x51, Word, Linear11),
    cmd("UT_WARN_LIMIT", 0x52, Word, Linear11),
    cmd("UT_FAULT_LIMIT", 0x53, Word, Linear11),
    cmd("UT_FAULT_RESPONSE", 0x54, Byte, Raw),
    cmd("VIN_OV_FAULT_LIMIT", 0x55, Word, Linear11),
    cmd("VIN_OV_FAULT_RESPONSE", 0x56, Byte, Raw),
    cmd("VIN_OV_WARN_LIMIT", 0x57, Word, Linear11),
    cmd("VIN_UV_WARN_LIMIT", 0x58, Word, Linear11),
    cmd("VIN_UV_FAULT_LIMIT", 0x59, Word, Linear11),
    cmd("VIN_UV_FAULT_RESPONSE", 0x5a, Byte, Raw),
    cmd("POWER_GOOD_ON", 0x5e, Word, Linear16),
    cmd("POWER_GOOD_OFF", 0x5f, Word, Linear16),
    cmd("TON_DELAY", 0x60, Word, Linear11),
    cmd("TON_RISE", 0x61, Word, Linear11),
    cmd("TON_MAX_FAULT_LIMIT", 0x62, Word, Linear11),
    cmd("TON_MAX_FAULT_RESPONSE", 0x63, Byte, Raw),
    cmd("TOFF_DELAY", 0x64, Word, Linear11),
    cmd("STATUS_BYTE", 0x78, Byte, Raw),
    cmd("STATUS_WORD", 0x79, Word, Raw),
    cmd("STATUS_VOUT", 0x7a, Byte, Raw),
    cmd("STATUS_IOUT", 0x7b, Byte, Raw),
    cmd("STATUS_INPUT", 0x7c, Byte, Raw),
    cmd("STATUS_TEMPERATURE", 0x7d, Byte, Raw),
    cmd("STATUS_CML", 0x7e, Byte, Raw),
    cmd("STATUS_MFR_SPECIFIC", 0x80, Byte, Raw),
    cmd("READ_VIN", 0x88, Word, Linear11),
    cmd("READ_IIN", 0x89, Word, Linear11),
    cmd("READ_VOUT", 0x8b, Word, Linear16),
    cmd("READ_IOUT", 0x8c, Word, Linear11),
    cmd("READ_TEMPERATURE_1", 0x8d, Word, Linear11),
    cmd("READ_TEMPERATURE_2", 0x8e, Word, Linear11),
    cmd("READ_POUT", 0x96, Word, Linear11),
    cmd("READ_PIN", 0x97, Word, Linear11),
    cmd("PMBUS_REVISION", 0x98, Byte, Raw),
    cmd("USER_DATA_00", 0xb0, Word, Raw),
    cmd("USER_DATA_01", 0xb1, Word, Raw),
    cmd("USER_DATA_02", 0xb2, Word, Raw),
    cmd("USER_DATA_03", 0xb3, Word, Raw),
    cmd("USER_DATA_04", 0xb4, Word, Raw),
    cmd("MFR_LTC_RESERVED_1", 0xb5, Word, Raw),
    cmd("MFR_T_SELF_HEAT", 0xb8, Word, Linear11),
    cmd("MFR_IOUT_CAL_GAIN_TAU_INV", 0xb9, Word, Linear11),
    cmd("MFR_IOUT_CAL_GAIN_THETA", 0xba, Word, Linear11),
    cmd("MFR_READ_IOUT", 0xbb, Word, Raw),
    cmd("MFR_LTC_RESERVED_2", 0xbc, Word, Raw),
    cmd("MFR_EE_UNLOCK", 0xbd, Byte, Raw),
    cmd("MFR_EE_ERASE", 0xbe, Byte, Raw),
    cmd("MFR_EE_DATA", 0xbf, Word, Raw),
    cmd("MFR_EIN", 0xc0, Block, Raw),
    cmd("MFR_EIN_CONFIG", 0xc1, Byte, Raw),
    cmd("MFR_SPECIAL_LOT", 0xc2, Byte, Raw),
    cmd("MFR_IIN_CAL_GAIN_TC", 0xc3, Word, Raw),
    cmd("MFR_IIN_PEAK", 0xc4, Word, Linear11),
    cmd("MFR_IIN_MIN", 0xc5, Word, Linear11),
    cmd("MFR_PIN_PEAK", 0xc6, Word, Linear11),
    cmd("MFR_PIN_MIN", 0xc7, Word, Linear11),
    cmd("MFR_COMMAND_PLUS", 0xc8, Word, Raw),
    cmd("MFR_DATA_PLUS0", 0xc9, Word, Raw),
    cmd("MFR_DATA_PLUS1", 0xca, Word, Raw),
    cmd("MFR_CONFIG_LTM4673", 0xd0, Word, Raw),
    cmd("MFR_CONFIG_ALL_LTM4673", 0xd1, Word, Raw),
    cmd("MFR_FAULTB0_PROPAGATE", 0xd2, Byte, Raw),
    cmd("MFR_FAULTB1_PROPAGATE", 0xd3, Byte, Raw),
    cmd("MFR_PWRGD_EN", 0xd4, Word, Raw),
    cmd("MFR_FAULTB0_RESPONSE", 0xd5, Byte, Raw),
    cmd("MFR_FAULTB1_RESPONSE", 0xd6, Byte, Raw),
    cmd("MFR_IOUT_PEAK", 0xd7, Word, Linear11),
    cmd("MFR_IOUT_MIN", 0xd8, Word, Linear11),
    cmd("MFR_CONFIG2_LTM4673", 0xd9, Byte, Raw),
    cmd("MFR_CONFIG3_LTM4673", 0xda, Byte, Raw),
    cmd("MFR_RETRY_DELAY", 0xdb, Word, Linear11),
    cmd("MFR_RESTART_DELAY", 0xdc, Word, Linear11),
    cmd("MFR_VOUT_PEAK", 0xdd, Word, Linear16),
    cmd("MFR_VIN_PEAK", 0xde, Word, Linear11),
    cmd("MFR_TEMPERATURE_1_PEAK", 0xdf, Word, Linear11),
    cmd("MFR_DAC", 0xe0, Word, Raw),
    cmd("MFR_POWERGOOD_ASSERTION_DELAY", 0xe1, Word, Linear11),
    cmd("MFR_WATCHDOG_T_FIRST", 0xe2, Word, Linear11),
    cmd("MFR_WATCHDOG_T", 0xe3, Word, Linear11),
    cmd("MFR_PAGE_FF_MASK", 0xe4, Byte, Raw),
    cmd("MFR_PADS", 0xe5, Word, Raw),
    cmd("MFR_I2C_BASE_ADDRESS", 0xe6, Byte, Raw),
    cmd("MFR_SPECIAL_ID", 0xe7, Word, Raw),
    cmd("MFR_IIN_CAL_GAIN", 0xe8, Word, Linear11),
    cmd("MFR_VOUT_DISCHARGE_THRESHOLD", 0xe9, Word, Linear11),
    cmd("MFR_FAULT_LOG_STORE", 0xea, Send, Raw),
    cmd("MFR_FAULT_LOG_RESTORE", 0xeb, Send, Raw),
    cmd("MFR_FAULT_LOG_CLEAR", 0xec, Send, Raw),
    cmd("MFR_FAULT_LOG_STATUS", 0xed, Byte, Raw),
    cmd("MFR_FAULT_LOG", 0xee, Block, Raw),
    cmd("MFR_COMMON", 0xef, Byte, Raw),
    cmd("MFR_IOUT_CAL_GAIN_TC", 0xf6, Word, Raw),
    cmd("MFR_RETRY_COUNT", 0xf7, Byte, Raw),
    cmd("MFR_TEMP_1_GAIN", 0xf8, Word, Raw),
    cmd("MFR_TEMP_1_OFFSET", 0xf9, Word, Linear11),
    cmd("MFR_IOUT_SENSE_VOLTAGE", 0xfa, Word, Raw),
    cmd("MFR_VOUT_MIN", 0xfb, Word, Linear16),
    cmd("MFR_VIN_MIN", 0xfc, Word, Linear11),
    cmd("MFR_TEMPERATURE_1_MIN", 0xfd, Word, Linear11),
];

/// Command codes used directly by the tooling
pub mod reg {
    /// Channel select; 0xFF addresses all channels
    pub const PAGE: u8 = 0x00;
    /// Clear all latched faults
    pub const CLEAR_FAULTS: u8 = 0x03;
    /// Output voltage setpoint (L16)
    pub const VOUT_COMMAND: u8 = 0x21;
    /// Input overvoltage fault limit (L11)
    pub const VIN_OV_FAULT_LIMIT: u8 = 0x55;
    /// Summary status word
    pub const STATUS_WORD: u8 = 0x79;
    /// Input voltage telemetry (L11)
    pub const READ_VIN: u8 = 0x88;
    /// Input current telemetry (L11)
    pub const READ_IIN: u8 = 0x89;
    /// Output voltage telemetry (L16)
    pub const READ_VOUT: u8 = 0x8b;
    /// Output current telemetry (L11)
    pub const READ_IOUT: u8 = 0x8c;
    /// External temperature telemetry (L11)
    pub const READ_TEMPERATURE_1: u8 = 0x8d;
    /// Internal temperature telemetry (L11)
    pub const READ_TEMPERATURE_2: u8 = 0x8e;
    /// Output power telemetry (L11)
    pub const READ_POUT: u8 = 0x96;
    /// Input power telemetry (L11)
    pub const READ_PIN: u8 = 0x97;
    /// Raw output current readback, 2.5 mA per LSB
    pub const MFR_READ_IOUT: u8 = 0xbb;
    /// Current sense voltage readback
    pub const MFR_IOUT_SENSE_VOLTAGE: u8 = 0xfa;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AccessMode;
    use crate::codec::Encoding;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_addresses_unique() {
        let names: HashSet<_> = LTM4673_COMMANDS.iter().map(|c| c.name).collect();
        let addrs: HashSet<_> = LTM4673_COMMANDS.iter().map(|c| c.address).collect();
        assert_eq!(names.len(), LTM4673_COMMANDS.len());
        assert_eq!(addrs.len(), LTM4673_COMMANDS.len());
    }

    #[test]
    fn test_address_order() {
        assert!(LTM4673_COMMANDS
            .windows(2)
            .all(|w| w[0].address < w[1].address));
    }

    #[test]
    fn test_selected_entries() {
        let find = |a: u8| LTM4673_COMMANDS.iter().find(|c| c.address == a).unwrap();

        let vout = find(reg::VOUT_COMMAND);
        assert_eq!(vout.name, "VOUT_COMMAND");
        assert_eq!(vout.mode, AccessMode::Word);
        assert_eq!(vout.encoding, Encoding::Linear16);

        assert_eq!(find(reg::READ_VIN).encoding, Encoding::Linear11);
        assert_eq!(find(reg::CLEAR_FAULTS).mode, AccessMode::Send);
        assert_eq!(find(0xee).mode, AccessMode::Block);
        assert_eq!(find(reg::PAGE).mode, AccessMode::Byte);
    }
}
