//! Marble board helpers
//!
//! Canned programs for the checks done during board bring-up: a telemetry
//! dump, a per-channel status check and output voltage margining.

mod margin;
mod status;
mod telemetry;

pub use margin::{
    margin_program, nominal_voltage, parse_rail_voltage, rail_readback_reads, RAILS,
};
pub use status::{channel_status, status_reads, ChannelStatus, StatusWord};
pub use telemetry::{
    physical_value, telemetry_readings, telemetry_reads, TelemetryReading, TelemetryRegister,
    TELEMETRY,
};
