//! # Poll Session
//!
//! One telemetry request/response cycle against an exclusively borrowed port.
//!
//! ```text
//! Idle -> AwaitingResponse -> Validating -> Done
//!              |                  |
//!              +----> Failed <----+
//! ```
//!
//! Waiting is a bounded loop: check the pending-byte count, and if nothing
//! has arrived sleep `retry_interval` and count a retry. Once the count
//! exceeds `max_retries` the session fails with a timeout, so the longest
//! possible wait is `response_delay + retry_interval * (max_retries + 1)`.

use std::mem;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{MvmpError, Result};
use crate::mvmp::decoder::decode_response;
use crate::mvmp::encoder::encode_poll;
use crate::mvmp::protocol::Telemetry;
use crate::serial::port_trait::SerialPortIO;

/// Timing of the bounded wait for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Pause after sending the poll before the first check
    pub response_delay: Duration,

    /// Pause between pending-byte checks
    pub retry_interval: Duration,

    /// Empty checks tolerated before giving up
    pub max_retries: u32,
}

impl PollTiming {
    /// Longest time a session can spend waiting for data
    pub fn max_wait(&self) -> Duration {
        self.response_delay + self.retry_interval * (self.max_retries + 1)
    }
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            response_delay: Duration::from_millis(100),
            retry_interval: Duration::from_millis(100),
            max_retries: 10,
        }
    }
}

/// Session state
#[derive(Debug)]
pub enum PollState {
    /// Poll command not yet sent
    Idle,

    /// Poll sent, waiting for the port to report pending bytes
    AwaitingResponse { retries: u32 },

    /// Response read, not yet decoded
    Validating(Vec<u8>),

    /// Terminal: reading decoded
    Done(Telemetry),

    /// Terminal: timeout, transport or decode failure
    Failed(MvmpError),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Done(_) | PollState::Failed(_))
    }
}

/// A single poll cycle
///
/// # Examples
///
/// ```no_run
/// use mvmp_bridge::serial::MpptSerial;
/// use mvmp_bridge::session::{PollSession, PollTiming};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut serial = MpptSerial::open("/dev/ttyUSB0", 2400)?;
///     let telemetry = PollSession::new(serial.port_mut(), PollTiming::default())
///         .run()
///         .await?;
///     println!("PV input: {} V", telemetry.pv_input_voltage);
///     Ok(())
/// }
/// ```
pub struct PollSession<'a, P: SerialPortIO + ?Sized> {
    port: &'a mut P,
    timing: PollTiming,
    state: PollState,
}

impl<'a, P: SerialPortIO + ?Sized> PollSession<'a, P> {
    pub fn new(port: &'a mut P, timing: PollTiming) -> Self {
        Self {
            port,
            timing,
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Perform one state transition; terminal states are left unchanged
    pub async fn step(&mut self) {
        let state = mem::replace(&mut self.state, PollState::Idle);
        self.state = match state {
            PollState::Idle => self.send_poll().await,
            PollState::AwaitingResponse { retries } => self.check_response(retries).await,
            PollState::Validating(buffer) => Self::validate(&buffer),
            terminal @ (PollState::Done(_) | PollState::Failed(_)) => terminal,
        };
    }

    /// Drive the session to completion
    pub async fn run(mut self) -> Result<Telemetry> {
        loop {
            match mem::replace(&mut self.state, PollState::Idle) {
                PollState::Done(telemetry) => return Ok(telemetry),
                PollState::Failed(error) => return Err(error),
                state => {
                    self.state = state;
                    self.step().await;
                }
            }
        }
    }

    async fn send_poll(&mut self) -> PollState {
        let command = encode_poll();

        if let Err(e) = self.port.write_all(&command).await {
            return PollState::Failed(MvmpError::Serial(format!("Failed to write poll: {}", e)));
        }
        if let Err(e) = self.port.flush().await {
            return PollState::Failed(MvmpError::Serial(format!(
                "Failed to flush serial port: {}",
                e
            )));
        }

        debug!("Sent poll command ({} bytes)", command.len());

        if !self.timing.response_delay.is_zero() {
            sleep(self.timing.response_delay).await;
        }

        PollState::AwaitingResponse { retries: 0 }
    }

    async fn check_response(&mut self, retries: u32) -> PollState {
        let pending = match self.port.bytes_pending() {
            Ok(pending) => pending,
            Err(e) => {
                return PollState::Failed(MvmpError::Serial(format!(
                    "Failed to query pending bytes: {}",
                    e
                )))
            }
        };

        if pending > 0 {
            return match self.port.read_available().await {
                Ok(buffer) => {
                    debug!("Received {} bytes: {:02X?}", buffer.len(), buffer);
                    PollState::Validating(buffer)
                }
                Err(e) => {
                    PollState::Failed(MvmpError::Serial(format!("Failed to read response: {}", e)))
                }
            };
        }

        if !self.timing.retry_interval.is_zero() {
            sleep(self.timing.retry_interval).await;
        }
        let retries = retries + 1;

        if retries > self.timing.max_retries {
            let waited = self.timing.max_wait();
            warn!("No response after {} checks ({:?})", retries, waited);
            return PollState::Failed(MvmpError::Timeout {
                attempts: retries,
                waited,
            });
        }

        PollState::AwaitingResponse { retries }
    }

    fn validate(buffer: &[u8]) -> PollState {
        match decode_response(buffer) {
            Ok(telemetry) => PollState::Done(telemetry),
            Err(e) => {
                warn!("Discarding response frame: {}", e);
                PollState::Failed(e.into())
            }
        }
    }
}
