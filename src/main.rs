//! # MVMP Bridge
//!
//! Poll an MVMP solar charge controller over serial and publish its telemetry.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load configuration, apply command line overrides
//!    - Open the serial connection to the controller
//!    - Optionally load local time into the controller clock
//!
//! 2. **Main Loop**
//!    - Poll for one telemetry reading (bounded wait)
//!    - Log the reading and publish sensor updates
//!    - Sleep the day or night interval
//!    - Handle Ctrl+C for graceful shutdown
//!
//! Expected output:
//! ```text
//! INFO mvmp_bridge: MVMP Bridge v0.1.0 starting...
//! INFO mvmp_bridge::serial: Successfully opened MPPT controller at /dev/ttyUSB0 (2400 baud)
//! INFO mvmp_bridge: PV 100V | battery 15V | 10.5A 157.5W | today 1.25kWh | total 300.8kWh
//! ```

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, Timelike};
use clap::Parser;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use mvmp_bridge::config::Config;
use mvmp_bridge::mvmp::protocol::Telemetry;
use mvmp_bridge::serial::MpptSerial;
use mvmp_bridge::telemetry::{publish_all, sensor_updates, HttpSink, LogSink, TelemetrySink};

/// MVMP Bridge - read telemetry from an MVMP solar charge controller
#[derive(Debug, Parser)]
#[clap(author, version)]
struct Options {
    /// Serial port of the controller (overrides the config file)
    port: Option<String>,

    /// Config file to read
    #[clap(short = 'c', long = "config")]
    config_file: Option<PathBuf>,

    /// Poll once and exit
    #[clap(long)]
    once: bool,

    /// Do not set the controller clock on start
    #[clap(long)]
    no_clock_sync: bool,
}

impl Options {
    fn load_config(&self) -> mvmp_bridge::error::Result<Config> {
        let mut config = match &self.config_file {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        config.validate()?;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let options = Options::parse();
    let config = options.load_config()?;

    info!("MVMP Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut serial = MpptSerial::from_config(&config.serial)?;
    info!("Controller serial port opened at: {}", serial.device_path());

    if config.clock.sync_on_start && !options.no_clock_sync {
        let now = Local::now().naive_local();
        match serial.set_clock(&now).await {
            Ok(()) => sleep(Duration::from_millis(config.clock.settle_ms)).await,
            Err(e) => warn!("Failed to set controller clock: {}", e),
        }
    }

    let timing = config.poll.timing();
    let mut sink: Box<dyn TelemetrySink> = match HttpSink::from_config(&config.sink)? {
        Some(http) => {
            info!("Publishing sensor updates to {}", config.sink.url.as_deref().unwrap_or_default());
            Box::new(http)
        }
        None => Box::new(LogSink::new()),
    };
    let mut poll_count: u64 = 0;
    let mut failed_count: u64 = 0;

    info!(
        "Polling every {}ms ({}ms at night)",
        config.poll.day_interval_ms, config.poll.night_interval_ms
    );
    info!("Press Ctrl+C to exit");

    loop {
        poll_count += 1;

        match serial.poll(timing).await {
            Ok(telemetry) => {
                log_reading(&telemetry);

                if config.sink.enabled {
                    let updates = sensor_updates(&config.sink.sensor_prefix, &telemetry);
                    publish_all(sink.as_mut(), &updates).await;
                }
            }
            Err(e) if options.once => {
                error!("Poll failed: {}", e);
                return Err(e.into());
            }
            Err(e) => {
                failed_count += 1;
                warn!("Poll failed: {}", e);
            }
        }

        if options.once {
            break;
        }

        let pause = config.poll.interval_for_hour(Local::now().hour());

        tokio::select! {
            _ = sleep(pause) => {}

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total polls: {} ({} failed)", poll_count, failed_count);
    Ok(())
}

/// Log a one-line summary plus any raised warnings or faults
fn log_reading(telemetry: &Telemetry) {
    info!(
        "PV {}V | battery {}V | {}A {}W | today {}kWh | total {}kWh",
        telemetry.pv_input_voltage,
        telemetry.battery_voltage,
        telemetry.charging_current,
        telemetry.charging_power,
        telemetry.daily_generated_energy,
        telemetry.total_generated_energy
    );
    info!("Controller clock {} | {}", telemetry.system_time, telemetry.status);

    let warnings = telemetry.warnings.active();
    if !warnings.is_empty() {
        warn!("Controller warnings: {}", warnings.join(", "));
    }

    let faults = telemetry.faults.active();
    if !faults.is_empty() {
        error!("Controller faults: {}", faults.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = Options::try_parse_from(["mvmp-bridge"]).unwrap();
        assert!(options.port.is_none());
        assert!(options.config_file.is_none());
        assert!(!options.once);
        assert!(!options.no_clock_sync);
    }

    #[test]
    fn test_options_port_and_flags() {
        let options = Options::try_parse_from([
            "mvmp-bridge",
            "/dev/ttyS3",
            "--once",
            "--no-clock-sync",
            "-c",
            "bridge.toml",
        ])
        .unwrap();

        assert_eq!(options.port.as_deref(), Some("/dev/ttyS3"));
        assert_eq!(options.config_file, Some(PathBuf::from("bridge.toml")));
        assert!(options.once);
        assert!(options.no_clock_sync);
    }

    #[test]
    fn test_port_overrides_default_config() {
        let options = Options::try_parse_from(["mvmp-bridge", "/dev/ttyS3"]).unwrap();
        let config = options.load_config().unwrap();
        assert_eq!(config.serial.port, "/dev/ttyS3");
    }

    #[test]
    fn test_empty_port_override_is_rejected() {
        let options = Options::try_parse_from(["mvmp-bridge", ""]).unwrap();
        assert!(options.load_config().is_err());
    }
}
