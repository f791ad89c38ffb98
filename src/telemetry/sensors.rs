//! Sensor updates derived from a telemetry reading

use serde::Serialize;
use serde_json::{json, Value};

use crate::mvmp::protocol::Telemetry;

/// Metadata attached to a sensor state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub device_class: &'static str,
    pub unit_of_measurement: &'static str,
    pub friendly_name: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
}

/// A single named sensor value
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    /// Sensor name including the configured prefix
    pub name: String,
    pub state: Value,
    pub attributes: SensorAttributes,
}

impl SensorUpdate {
    /// Entity id under the `sensor` domain
    pub fn entity_id(&self) -> String {
        format!("sensor.{}", self.name)
    }

    /// JSON body accepted by a state API
    pub fn state_body(&self) -> Value {
        json!({
            "state": self.state,
            "attributes": self.attributes,
        })
    }
}

fn attributes(
    device_class: &'static str,
    unit_of_measurement: &'static str,
    friendly_name: &'static str,
) -> SensorAttributes {
    SensorAttributes {
        device_class,
        unit_of_measurement,
        friendly_name,
        state_class: None,
    }
}

/// Build the published sensor set for one reading
///
/// Load percentage is decoded but not published. Battery temperature is
/// skipped when the controller reports no probe.
pub fn sensor_updates(prefix: &str, telemetry: &Telemetry) -> Vec<SensorUpdate> {
    let mut sensors = vec![
        (
            "pvInputVoltage",
            json!(telemetry.pv_input_voltage),
            attributes("voltage", "V", "PV Input Voltage"),
        ),
        (
            "batteryVoltage",
            json!(telemetry.battery_voltage),
            attributes("voltage", "V", "Battery Voltage"),
        ),
        (
            "chargingCurrent",
            json!(telemetry.charging_current),
            attributes("current", "A", "Charging Current"),
        ),
        (
            "chargingPower",
            json!(telemetry.charging_power),
            attributes("power", "W", "Charging Power"),
        ),
        (
            "batteryCapacity",
            json!(telemetry.battery_capacity),
            attributes("battery", "Ah", "Battery Capacity"),
        ),
        (
            "batteryCells",
            json!(telemetry.battery_cells),
            attributes("value", "cells", "Battery Cells"),
        ),
        (
            "dailyGeneratedEnergy",
            json!(telemetry.daily_generated_energy),
            SensorAttributes {
                state_class: Some("total"),
                ..attributes("energy", "kWh", "Daily Generated Energy")
            },
        ),
        (
            "totalGeneratedEnergy",
            json!(telemetry.total_generated_energy),
            SensorAttributes {
                state_class: Some("total_increasing"),
                ..attributes("energy", "kWh", "Total Generated Energy")
            },
        ),
        (
            "systemRunTime",
            json!(telemetry.system_run_time),
            attributes("value", "h", "System Run Time"),
        ),
        (
            "programVersion",
            json!(telemetry.program_version),
            attributes("version", "", "Program Version"),
        ),
        (
            "machineTemperature",
            json!(telemetry.machine_temperature),
            attributes("temperature", "°C", "Machine Temperature"),
        ),
    ];

    if let Some(temperature) = telemetry.battery_temperature {
        sensors.push((
            "batteryTemperature",
            json!(temperature),
            attributes("temperature", "°C", "Battery Temperature"),
        ));
    }

    sensors
        .into_iter()
        .map(|(name, state, attributes)| SensorUpdate {
            name: format!("{}{}", prefix, name),
            state,
            attributes,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvmp::decoder::decode_telemetry;
    use crate::mvmp::decoder::test_support::sample_payload;

    fn sample() -> Telemetry {
        decode_telemetry(&sample_payload()).unwrap()
    }

    #[test]
    fn test_sensor_set_and_order() {
        let updates = sensor_updates("mppt_", &sample());
        let names: Vec<&str> = updates.iter().map(|u| u.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "mppt_pvInputVoltage",
                "mppt_batteryVoltage",
                "mppt_chargingCurrent",
                "mppt_chargingPower",
                "mppt_batteryCapacity",
                "mppt_batteryCells",
                "mppt_dailyGeneratedEnergy",
                "mppt_totalGeneratedEnergy",
                "mppt_systemRunTime",
                "mppt_programVersion",
                "mppt_machineTemperature",
                "mppt_batteryTemperature",
            ]
        );
    }

    #[test]
    fn test_sensor_values() {
        let updates = sensor_updates("mppt_", &sample());
        let state = |name: &str| {
            updates
                .iter()
                .find(|u| u.name == format!("mppt_{}", name))
                .map(|u| u.state.clone())
                .unwrap()
        };

        assert_eq!(state("pvInputVoltage"), json!(100));
        assert_eq!(state("batteryVoltage"), json!(15.0));
        assert_eq!(state("chargingCurrent"), json!(10.5));
        assert_eq!(state("chargingPower"), json!(157.5));
        assert_eq!(state("dailyGeneratedEnergy"), json!(1.25));
        assert_eq!(state("programVersion"), json!("2.7"));
        assert_eq!(state("batteryTemperature"), json!(25));
    }

    #[test]
    fn test_battery_temperature_omitted_when_unknown() {
        let mut telemetry = sample();
        telemetry.battery_temperature = None;

        let updates = sensor_updates("mppt_", &telemetry);
        assert_eq!(updates.len(), 11);
        assert!(updates.iter().all(|u| u.name != "mppt_batteryTemperature"));
    }

    #[test]
    fn test_state_body() {
        let updates = sensor_updates("solar_", &sample());
        let energy = updates
            .iter()
            .find(|u| u.name == "solar_totalGeneratedEnergy")
            .unwrap();

        assert_eq!(energy.entity_id(), "sensor.solar_totalGeneratedEnergy");
        assert_eq!(
            energy.state_body(),
            json!({
                "state": 300.8,
                "attributes": {
                    "device_class": "energy",
                    "unit_of_measurement": "kWh",
                    "friendly_name": "Total Generated Energy",
                    "state_class": "total_increasing",
                }
            })
        );
    }

    #[test]
    fn test_state_class_omitted_when_unset() {
        let updates = sensor_updates("mppt_", &sample());
        let body = updates[0].state_body();
        assert!(body["attributes"].get("state_class").is_none());
        assert_eq!(body["attributes"]["unit_of_measurement"], "V");
    }
}
