//! # MVMP Protocol Constants and Types
//!
//! Core protocol definitions for the MVMP charge-controller serial link.
//!
//! Response frame layout:
//!
//! ```text
//! | magic "MVMP" (4) | length (1) | payload (length - 1) | checksum (1) |
//! ```
//!
//! `length` counts the payload plus the trailing checksum byte.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use super::bits::{FaultFlags, StatusFlags, WarningFlags};
use super::fixed_point::FixedDecimal;

/// Response frame magic header
pub const MVMP_MAGIC: &[u8; 4] = b"MVMP";

/// Magic (4) + length (1)
pub const MVMP_HEADER_SIZE: usize = 5;

/// Minimum payload size understood by the telemetry decoder
pub const MVMP_TELEMETRY_PAYLOAD_SIZE: usize = 56;

/// Telemetry poll command (host -> device)
pub const MVMP_POLL_COMMAND: &[u8] = b"CMHB\x06MPPTHB";

/// Fixed preamble of the set-clock command ("CTIM\rRETIME")
pub const MVMP_SET_CLOCK_PREAMBLE: &[u8; 11] = b"CTIM\x0DRETIME";

/// Total size of the set-clock command (preamble + 7 clock bytes)
pub const MVMP_SET_CLOCK_COMMAND_SIZE: usize = 18;

/// Raw battery-temperature value the device reports when no probe is fitted
pub const BATTERY_TEMPERATURE_UNKNOWN: u8 = 0xFF;

/// Errors raised while validating or decoding a response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer does not start with "MVMP"
    #[error("invalid frame header")]
    HeaderMismatch,

    /// Declared or required length exceeds the bytes available
    #[error("frame truncated: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// Trailing checksum disagrees with the payload sum
    #[error("checksum mismatch: calculated 0x{expected:02X}, received 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Errors raised while building an outbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Year cannot be split into a high and a low byte
    #[error("year {0} does not fit in two bytes")]
    YearOutOfRange(i32),
}

/// A validated response frame borrowing from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Declared length (payload + checksum)
    pub length: u8,

    /// Payload bytes (`length - 1` of them)
    pub payload: &'a [u8],

    /// Checksum byte following the payload
    pub checksum: u8,
}

/// Firmware version reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for ProgramVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for ProgramVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Controller real-time clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday: u8,
}

impl fmt::Display for DeviceClock {
    /// Formats as `YYYY-MM-DD HH:MM:SS`; the weekday is not part of the timestamp.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl Serialize for DeviceClock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Hour and minute of a DC output schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u8,
    pub minute: u8,
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for ScheduleTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Settings persisted in the controller's non-volatile storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoredSettings {
    pub battery_type: u8,

    /// System voltage in volts
    pub system_voltage: f64,

    pub charging_percentage: u8,

    /// Low-voltage output cut-off in volts
    pub battery_low_output_voltage: f64,

    /// Bulk (strong) charging voltage in volts
    pub battery_strong_charging_voltage: f64,

    /// Float charging voltage in volts
    pub battery_float_charging_voltage: f64,

    pub dc_output_type: u8,
    pub dc_turn_on: ScheduleTime,
    pub dc_turn_off: ScheduleTime,

    /// DC output recovery voltage in volts
    pub dc_output_recovery_voltage: f64,
}

/// One decoded telemetry reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub status: StatusFlags,
    pub warnings: WarningFlags,
    pub faults: FaultFlags,

    pub program_version: ProgramVersion,

    /// PV input voltage in volts
    pub pv_input_voltage: u16,

    /// Battery capacity in Ah
    pub battery_capacity: u8,
    pub battery_cells: u8,

    /// Battery voltage in volts
    pub battery_voltage: f64,
    pub battery_type: u8,

    /// Battery temperature in °C, `None` when the probe is absent
    pub battery_temperature: Option<u8>,

    /// Charging current in amps
    pub charging_current: FixedDecimal,

    /// Battery voltage × charging current, in watts, rounded to 3 decimals
    pub charging_power: f64,

    pub chip_temperature: u8,
    pub machine_temperature: u8,
    pub load_percentage: u8,

    /// Energy generated today in kWh
    pub daily_generated_energy: FixedDecimal,

    /// Lifetime generated energy in kWh
    pub total_generated_energy: FixedDecimal,

    /// Run time in hours
    pub system_run_time: FixedDecimal,

    pub machine_type: u8,
    pub system_status_code: u8,
    pub system_time: DeviceClock,
    pub stored: StoredSettings,
}
