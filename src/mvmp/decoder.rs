//! # MVMP Response Decoder
//!
//! Validates response frames and decodes the telemetry payload.

use tracing::debug;

use super::bits::{FaultFlags, StatusFlags, WarningFlags};
use super::checksum::sum8;
use super::fixed_point::FixedDecimal;
use super::protocol::*;

/// Payload byte offsets of the telemetry record
mod offset {
    pub const STATUS_A: usize = 0;
    pub const STATUS_B: usize = 1;
    // 2: reserved
    pub const WARN_A: usize = 3;
    pub const WARN_B: usize = 4;
    // 5: reserved
    pub const FAULT_A: usize = 6;
    pub const FAULT_B: usize = 7;
    pub const VERSION_MAJOR: usize = 8;
    pub const VERSION_MINOR: usize = 9;
    pub const PV_INPUT_VOLTAGE: usize = 10;
    pub const BATTERY_CAPACITY: usize = 12;
    pub const BATTERY_CELLS: usize = 13;
    pub const BATTERY_VOLTAGE: usize = 14;
    pub const BATTERY_TYPE: usize = 16;
    pub const BATTERY_TEMPERATURE: usize = 17;
    pub const CHARGING_CURRENT_INT: usize = 18;
    pub const CHIP_TEMPERATURE: usize = 19;
    pub const MACHINE_TEMPERATURE: usize = 20;
    pub const LOAD_PERCENTAGE: usize = 21;
    pub const DAILY_ENERGY_INT: usize = 22;
    pub const DAILY_ENERGY_DEC: usize = 24;
    pub const MACHINE_TYPE: usize = 26;
    pub const TOTAL_ENERGY_DEC: usize = 27;
    pub const TOTAL_ENERGY_INT: usize = 28;
    pub const RUN_TIME_INT: usize = 30;
    pub const RUN_TIME_DEC: usize = 32;
    pub const SYSTEM_STATUS_CODE: usize = 33;
    pub const CLOCK_YEAR: usize = 34;
    pub const CLOCK_MONTH: usize = 36;
    pub const CLOCK_DAY: usize = 37;
    pub const CLOCK_HOUR: usize = 38;
    pub const CLOCK_MINUTE: usize = 39;
    pub const CLOCK_SECOND: usize = 40;
    pub const CLOCK_WEEKDAY: usize = 41;
    pub const STORED_BATTERY_TYPE: usize = 42;
    pub const STORED_SYSTEM_VOLTAGE: usize = 43;
    pub const STORED_CHARGING_PERCENTAGE: usize = 44;
    pub const STORED_LOW_OUTPUT_VOLTAGE: usize = 45;
    pub const STORED_STRONG_CHARGING_VOLTAGE: usize = 46;
    pub const STORED_FLOAT_CHARGING_VOLTAGE: usize = 47;
    pub const STORED_DC_OUTPUT_TYPE: usize = 48;
    pub const STORED_DC_ON_HOUR: usize = 49;
    pub const STORED_DC_ON_MINUTE: usize = 50;
    pub const STORED_DC_OFF_HOUR: usize = 51;
    pub const STORED_DC_OFF_MINUTE: usize = 52;
    pub const STORED_DC_RECOVERY_VOLTAGE: usize = 53;
    pub const CHARGING_CURRENT_DEC: usize = 54;
    // 55: reserved
}

/// Decode a complete MVMP response frame
///
/// # Arguments
///
/// * `buffer` - Bytes read from the serial port, starting at the magic header.
///   Bytes after the checksum are ignored.
///
/// # Returns
///
/// * `Result<Frame, DecodeError>` - Frame borrowing its payload from `buffer`
///
/// # Errors
///
/// Returns error if:
/// - The buffer does not start with "MVMP"
/// - The buffer is shorter than the length byte declares
/// - The checksum does not match the payload
pub fn decode_frame(buffer: &[u8]) -> std::result::Result<Frame<'_>, DecodeError> {
    if !buffer.starts_with(MVMP_MAGIC) {
        return Err(DecodeError::HeaderMismatch);
    }

    if buffer.len() < MVMP_HEADER_SIZE {
        return Err(DecodeError::Truncated {
            needed: MVMP_HEADER_SIZE,
            available: buffer.len(),
        });
    }

    let length = buffer[MVMP_HEADER_SIZE - 1];
    let end = frame_end(length);
    if buffer.len() < end {
        return Err(DecodeError::Truncated {
            needed: end,
            available: buffer.len(),
        });
    }

    let payload = &buffer[MVMP_HEADER_SIZE..end - 1];
    let checksum = buffer[end - 1];

    let calculated = sum8(payload);
    if calculated != checksum {
        return Err(DecodeError::ChecksumMismatch {
            expected: calculated,
            actual: checksum,
        });
    }

    Ok(Frame {
        length,
        payload,
        checksum,
    })
}

/// Offset one past the checksum for a declared length
///
/// The declared length must at least cover the checksum byte.
fn frame_end(length: u8) -> usize {
    MVMP_HEADER_SIZE + (length as usize).max(1)
}

/// Total size of the frame at the start of `buffer`
///
/// `None` until the header and length byte have arrived, or when the buffer
/// does not start with "MVMP".
pub fn frame_size(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < MVMP_HEADER_SIZE || !buffer.starts_with(MVMP_MAGIC) {
        return None;
    }
    Some(frame_end(buffer[MVMP_HEADER_SIZE - 1]))
}

/// Validate a response frame and return its payload
///
/// # Examples
///
/// ```
/// use mvmp_bridge::mvmp::decoder::validate;
///
/// let buffer = [b'M', b'V', b'M', b'P', 3, 0x10, 0x20, 0x30];
/// assert_eq!(validate(&buffer), Ok(&[0x10u8, 0x20][..]));
/// ```
pub fn validate(buffer: &[u8]) -> std::result::Result<&[u8], DecodeError> {
    decode_frame(buffer).map(|frame| frame.payload)
}

/// Decode a telemetry payload
///
/// # Arguments
///
/// * `payload` - Validated frame payload (at least 56 bytes)
///
/// # Returns
///
/// * `Result<Telemetry, DecodeError>` - Fully populated reading
pub fn decode_telemetry(payload: &[u8]) -> std::result::Result<Telemetry, DecodeError> {
    if payload.len() < MVMP_TELEMETRY_PAYLOAD_SIZE {
        return Err(DecodeError::Truncated {
            needed: MVMP_TELEMETRY_PAYLOAD_SIZE,
            available: payload.len(),
        });
    }

    let byte = |at: usize| payload[at];
    let word = |at: usize| u16::from_le_bytes([payload[at], payload[at + 1]]);
    let decivolts = |at: usize| payload[at] as f64 / 10.0;

    let battery_voltage = word(offset::BATTERY_VOLTAGE) as f64 / 10.0;
    let charging_current = FixedDecimal::compose(
        byte(offset::CHARGING_CURRENT_INT).into(),
        byte(offset::CHARGING_CURRENT_DEC).into(),
    );

    let battery_temperature = match byte(offset::BATTERY_TEMPERATURE) {
        BATTERY_TEMPERATURE_UNKNOWN => None,
        raw => Some(raw),
    };

    let telemetry = Telemetry {
        status: StatusFlags::from_bytes(byte(offset::STATUS_A), byte(offset::STATUS_B)),
        warnings: WarningFlags::from_bytes(byte(offset::WARN_A), byte(offset::WARN_B)),
        faults: FaultFlags::from_bytes(byte(offset::FAULT_A), byte(offset::FAULT_B)),
        program_version: ProgramVersion {
            major: byte(offset::VERSION_MAJOR),
            minor: byte(offset::VERSION_MINOR),
        },
        pv_input_voltage: word(offset::PV_INPUT_VOLTAGE),
        battery_capacity: byte(offset::BATTERY_CAPACITY),
        battery_cells: byte(offset::BATTERY_CELLS),
        battery_voltage,
        battery_type: byte(offset::BATTERY_TYPE),
        battery_temperature,
        charging_current,
        charging_power: round3(battery_voltage * charging_current.value()),
        chip_temperature: byte(offset::CHIP_TEMPERATURE),
        machine_temperature: byte(offset::MACHINE_TEMPERATURE),
        load_percentage: byte(offset::LOAD_PERCENTAGE),
        daily_generated_energy: FixedDecimal::compose(
            word(offset::DAILY_ENERGY_INT).into(),
            word(offset::DAILY_ENERGY_DEC).into(),
        ),
        total_generated_energy: FixedDecimal::compose(
            word(offset::TOTAL_ENERGY_INT).into(),
            byte(offset::TOTAL_ENERGY_DEC).into(),
        ),
        system_run_time: FixedDecimal::compose(
            word(offset::RUN_TIME_INT).into(),
            byte(offset::RUN_TIME_DEC).into(),
        ),
        machine_type: byte(offset::MACHINE_TYPE),
        system_status_code: byte(offset::SYSTEM_STATUS_CODE),
        system_time: DeviceClock {
            year: word(offset::CLOCK_YEAR),
            month: byte(offset::CLOCK_MONTH),
            day: byte(offset::CLOCK_DAY),
            hour: byte(offset::CLOCK_HOUR),
            minute: byte(offset::CLOCK_MINUTE),
            second: byte(offset::CLOCK_SECOND),
            weekday: byte(offset::CLOCK_WEEKDAY),
        },
        stored: StoredSettings {
            battery_type: byte(offset::STORED_BATTERY_TYPE),
            system_voltage: decivolts(offset::STORED_SYSTEM_VOLTAGE),
            charging_percentage: byte(offset::STORED_CHARGING_PERCENTAGE),
            battery_low_output_voltage: decivolts(offset::STORED_LOW_OUTPUT_VOLTAGE),
            battery_strong_charging_voltage: decivolts(offset::STORED_STRONG_CHARGING_VOLTAGE),
            battery_float_charging_voltage: decivolts(offset::STORED_FLOAT_CHARGING_VOLTAGE),
            dc_output_type: byte(offset::STORED_DC_OUTPUT_TYPE),
            dc_turn_on: ScheduleTime {
                hour: byte(offset::STORED_DC_ON_HOUR),
                minute: byte(offset::STORED_DC_ON_MINUTE),
            },
            dc_turn_off: ScheduleTime {
                hour: byte(offset::STORED_DC_OFF_HOUR),
                minute: byte(offset::STORED_DC_OFF_MINUTE),
            },
            dc_output_recovery_voltage: decivolts(offset::STORED_DC_RECOVERY_VOLTAGE),
        },
    };

    debug!(
        "Decoded telemetry: pv={}V battery={}V current={}A clock={}",
        telemetry.pv_input_voltage,
        telemetry.battery_voltage,
        telemetry.charging_current,
        telemetry.system_time
    );

    Ok(telemetry)
}

/// Validate a response frame and decode its telemetry payload
pub fn decode_response(buffer: &[u8]) -> std::result::Result<Telemetry, DecodeError> {
    validate(buffer).and_then(decode_telemetry)
}

/// Round to 3 decimals, exact halves to the even neighbour
fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}
