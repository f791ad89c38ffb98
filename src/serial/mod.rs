//! # Serial Communication Module
//!
//! Handles serial communication with the MVMP charge controller.
//!
//! This module handles:
//! - Opening the serial port (8N1, default 2400 baud)
//! - Sending poll and set-clock commands
//! - Running a bounded poll session for each telemetry reading

pub mod port_trait;

use std::time::Duration;

use chrono::{Datelike, Timelike};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{MvmpError, Result};
use crate::mvmp::encoder::encode_set_clock;
use crate::mvmp::protocol::Telemetry;
use crate::session::{PollSession, PollTiming};
use port_trait::{SerialPortIO, TokioSerialPort};

/// Default baud rate of the controller's serial link
pub const MVMP_BAUD_RATE: u32 = 2400;

/// Default read/write timeout of the port
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Device paths tried after the configured one (in order of preference)
pub const FALLBACK_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// MPPT Serial Port Handler
///
/// Owns the connection to the charge controller. Borrowing it mutably for
/// each poll keeps at most one session active on the port.
pub struct MpptSerial<P: SerialPortIO = TokioSerialPort> {
    /// Serial port handle
    port: P,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl<P: SerialPortIO> std::fmt::Debug for MpptSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpptSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl MpptSerial<TokioSerialPort> {
    /// Open connection to the controller at a specific path
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mvmp_bridge::serial::MpptSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = MpptSerial::open("/dev/ttyUSB0", 2400)?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate, DEFAULT_TIMEOUT)
    }

    /// Open the configured port, falling back to the common device paths
    pub fn from_config(config: &SerialConfig) -> Result<Self> {
        let paths = candidate_paths(config);
        Self::open_with_paths(&paths, config.baud_rate, Duration::from_millis(config.timeout_ms))
    }

    /// Open connection trying each device path in turn
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Link speed
    /// * `timeout` - Read/write timeout
    ///
    /// # Returns
    ///
    /// * `Result<MpptSerial>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout) {
                Ok(port) => {
                    info!("Successfully opened MPPT controller at {} ({} baud)", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort::new(port, timeout), *path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(MvmpError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| MvmpError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

/// Configured port first, then the fallback paths not already listed
fn candidate_paths(config: &SerialConfig) -> Vec<&str> {
    let mut paths = vec![config.port.as_str()];
    paths.extend(
        FALLBACK_DEVICE_PATHS
            .iter()
            .copied()
            .filter(|path| *path != config.port),
    );
    paths
}

impl<P: SerialPortIO> MpptSerial<P> {
    /// Wrap an already opened port
    pub fn with_port(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
        }
    }

    /// Send a raw command to the controller
    pub async fn send_command(&mut self, command: &[u8]) -> Result<()> {
        self.port
            .write_all(command)
            .await
            .map_err(|e| MvmpError::Serial(format!("Failed to write command: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| MvmpError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent command ({} bytes): {:02X?}", command.len(), command);
        Ok(())
    }

    /// Load a calendar time into the controller clock
    ///
    /// The controller does not acknowledge the command.
    pub async fn set_clock<T>(&mut self, timestamp: &T) -> Result<()>
    where
        T: Datelike + Timelike,
    {
        let command = encode_set_clock(timestamp)?;
        self.send_command(&command).await?;

        info!(
            "Set controller clock to {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            timestamp.year(),
            timestamp.month(),
            timestamp.day(),
            timestamp.hour(),
            timestamp.minute(),
            timestamp.second()
        );
        Ok(())
    }

    /// Request and decode one telemetry reading
    pub async fn poll(&mut self, timing: PollTiming) -> Result<Telemetry> {
        PollSession::new(&mut self.port, timing).run().await
    }

    /// Mutable access to the underlying port
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}
