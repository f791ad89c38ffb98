//! # Status, Warning and Fault Bit Fields
//!
//! Each group is built from two payload bytes (A and B). A flag is set when
//! `(byte >> position) & 1 == 1`; bits not listed in a table are reserved
//! and ignored.

use std::fmt;

use serde::Serialize;

/// Test a single bit of a flag byte
///
/// # Examples
///
/// ```
/// use mvmp_bridge::mvmp::bits::bit;
///
/// assert!(bit(0b0000_1000, 3));
/// assert!(!bit(0b0000_1000, 2));
/// ```
pub fn bit(byte: u8, position: u8) -> bool {
    (byte >> position) & 0x01 == 1
}

/// Device status (payload bytes 0 and 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusFlags {
    /// Byte A bit 3
    pub charging_temp_limit: bool,
    /// Byte A bit 2
    pub battery_voltage_full: bool,
    /// Byte A bit 1
    pub charging: bool,
    /// Byte A bit 0
    pub dc_output: bool,
    /// Byte B bit 1
    pub alarm: bool,
    /// Byte B bit 0
    pub fault: bool,
}

impl StatusFlags {
    pub fn from_bytes(a: u8, b: u8) -> Self {
        Self {
            charging_temp_limit: bit(a, 3),
            battery_voltage_full: bit(a, 2),
            charging: bit(a, 1),
            dc_output: bit(a, 0),
            alarm: bit(b, 1),
            fault: bit(b, 0),
        }
    }

    /// Label shown by the controller for the charging temperature limit
    pub fn charging_temp_limit_label(&self) -> &'static str {
        on_off(self.charging_temp_limit)
    }

    /// Label shown by the controller for the charging state
    pub fn charging_label(&self) -> &'static str {
        if self.charging {
            "Charging"
        } else {
            "Not Charging"
        }
    }

    /// Label shown by the controller for the DC load output
    pub fn dc_output_label(&self) -> &'static str {
        on_off(self.dc_output)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "temp_limit={} battery_full={} charging={} dc_output={} alarm={} fault={}",
            self.charging_temp_limit_label(),
            self.battery_voltage_full,
            self.charging_label(),
            self.dc_output_label(),
            self.alarm,
            self.fault
        )
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "Off"
    }
}

/// Active warnings (payload bytes 3 and 4)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarningFlags {
    // Byte A
    pub solar_voltage_high: bool,
    pub battery_temp_high: bool,
    pub machine_temp_high: bool,
    pub chip_temp_high: bool,
    pub storage_data_error: bool,
    pub storage_operation_fail: bool,
    pub clock_oscillator_fail: bool,
    pub external_oscillator_fail: bool,

    // Byte B
    pub battery_voltage_error: bool,
    /// Byte B bit 3; reported separately from the byte A temperature warning
    pub battery_over_temperature: bool,
    pub load_over_alarm: bool,
    pub battery_voltage_low: bool,
    pub battery_voltage_very_low: bool,
}

impl WarningFlags {
    pub fn from_bytes(a: u8, b: u8) -> Self {
        Self {
            solar_voltage_high: bit(a, 7),
            battery_temp_high: bit(a, 6),
            machine_temp_high: bit(a, 5),
            chip_temp_high: bit(a, 4),
            storage_data_error: bit(a, 3),
            storage_operation_fail: bit(a, 2),
            clock_oscillator_fail: bit(a, 1),
            external_oscillator_fail: bit(a, 0),

            battery_voltage_error: bit(b, 4),
            battery_over_temperature: bit(b, 3),
            load_over_alarm: bit(b, 2),
            battery_voltage_low: bit(b, 1),
            battery_voltage_very_low: bit(b, 0),
        }
    }

    /// Names of all warnings currently raised
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("solar_voltage_high", self.solar_voltage_high),
            ("battery_temp_high", self.battery_temp_high),
            ("machine_temp_high", self.machine_temp_high),
            ("chip_temp_high", self.chip_temp_high),
            ("storage_data_error", self.storage_data_error),
            ("storage_operation_fail", self.storage_operation_fail),
            ("clock_oscillator_fail", self.clock_oscillator_fail),
            ("external_oscillator_fail", self.external_oscillator_fail),
            ("battery_voltage_error", self.battery_voltage_error),
            ("battery_over_temperature", self.battery_over_temperature),
            ("load_over_alarm", self.load_over_alarm),
            ("battery_voltage_low", self.battery_voltage_low),
            ("battery_voltage_very_low", self.battery_voltage_very_low),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Latched faults (payload bytes 6 and 7)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FaultFlags {
    // Byte A
    pub battery_temp_low: bool,
    pub battery_temp_sensor_fault: bool,
    pub battery_voltage_high: bool,
    pub machine_temp_sensor_fault: bool,
    pub dc_output_fault_lock: bool,
    pub battery_temp_high_fault: bool,
    pub machine_temp_high_fault: bool,
    pub chip_temp_high_fault: bool,

    // Byte B
    pub battery_voltage_input_error: bool,
}

impl FaultFlags {
    pub fn from_bytes(a: u8, b: u8) -> Self {
        Self {
            battery_temp_low: bit(a, 7),
            battery_temp_sensor_fault: bit(a, 6),
            battery_voltage_high: bit(a, 5),
            machine_temp_sensor_fault: bit(a, 4),
            dc_output_fault_lock: bit(a, 3),
            battery_temp_high_fault: bit(a, 2),
            machine_temp_high_fault: bit(a, 1),
            chip_temp_high_fault: bit(a, 0),

            battery_voltage_input_error: bit(b, 0),
        }
    }

    /// Names of all faults currently latched
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("battery_temp_low", self.battery_temp_low),
            ("battery_temp_sensor_fault", self.battery_temp_sensor_fault),
            ("battery_voltage_high", self.battery_voltage_high),
            ("machine_temp_sensor_fault", self.machine_temp_sensor_fault),
            ("dc_output_fault_lock", self.dc_output_fault_lock),
            ("battery_temp_high_fault", self.battery_temp_high_fault),
            ("machine_temp_high_fault", self.machine_temp_high_fault),
            ("chip_temp_high_fault", self.chip_temp_high_fault),
            ("battery_voltage_input_error", self.battery_voltage_input_error),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_positions() {
        for position in 0..8 {
            let byte = 1u8 << position;
            for other in 0..8 {
                assert_eq!(bit(byte, other), other == position);
            }
        }
    }

    #[test]
    fn test_status_byte_0x0b() {
        // 0b0000_1011: temp limit, charging, dc output
        let status = StatusFlags::from_bytes(0x0B, 0x00);
        assert!(status.charging_temp_limit);
        assert!(!status.battery_voltage_full);
        assert!(status.charging);
        assert!(status.dc_output);

        assert_eq!(status.charging_temp_limit_label(), "ON");
        assert_eq!(status.charging_label(), "Charging");
        assert_eq!(status.dc_output_label(), "ON");
    }

    #[test]
    fn test_status_byte_b_and_reserved_bits() {
        let status = StatusFlags::from_bytes(0xF0, 0xFC);
        assert_eq!(status, StatusFlags::default());

        let status = StatusFlags::from_bytes(0x00, 0x03);
        assert!(status.alarm);
        assert!(status.fault);
        assert_eq!(status.dc_output_label(), "Off");
        assert_eq!(status.charging_label(), "Not Charging");
    }

    #[test]
    fn test_warning_bytes() {
        let warnings = WarningFlags::from_bytes(0b1000_0001, 0b0001_1000);
        assert!(warnings.solar_voltage_high);
        assert!(warnings.external_oscillator_fail);
        assert!(!warnings.battery_temp_high);
        assert!(warnings.battery_voltage_error);
        assert!(warnings.battery_over_temperature);
        assert!(!warnings.battery_voltage_very_low);

        assert_eq!(
            warnings.active(),
            vec![
                "solar_voltage_high",
                "external_oscillator_fail",
                "battery_voltage_error",
                "battery_over_temperature",
            ]
        );
    }

    #[test]
    fn test_warning_byte_b_upper_bits_reserved() {
        let warnings = WarningFlags::from_bytes(0x00, 0xE0);
        assert!(warnings.active().is_empty());
    }

    #[test]
    fn test_fault_bytes() {
        let faults = FaultFlags::from_bytes(0xFF, 0xFE);
        assert_eq!(faults.active().len(), 8);
        assert!(!faults.battery_voltage_input_error);

        let faults = FaultFlags::from_bytes(0x00, 0x01);
        assert_eq!(faults.active(), vec!["battery_voltage_input_error"]);
    }

    #[test]
    fn test_status_display() {
        let status = StatusFlags::from_bytes(0x0B, 0x02);
        assert_eq!(
            status.to_string(),
            "temp_limit=ON battery_full=false charging=Charging dc_output=ON alarm=true fault=false"
        );
    }
}
