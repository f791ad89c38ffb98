//! Telemetry sinks

use async_trait::async_trait;
use tracing::{info, warn};

use super::sensors::SensorUpdate;
use crate::error::Result;

/// Destination for sensor updates
#[async_trait]
pub trait TelemetrySink: Send {
    /// Publish a single sensor update
    async fn publish(&mut self, update: &SensorUpdate) -> Result<()>;
}

/// Sink that writes each update to the log as a JSON line
#[derive(Debug, Default)]
pub struct LogSink {
    published: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates written so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[async_trait]
impl TelemetrySink for LogSink {
    async fn publish(&mut self, update: &SensorUpdate) -> Result<()> {
        info!(target: "mvmp_bridge::sensor", "{} {}", update.entity_id(), update.state_body());
        self.published += 1;
        Ok(())
    }
}

/// Publish every update, logging failures and carrying on
///
/// Returns the number of updates the sink accepted.
pub async fn publish_all<S>(sink: &mut S, updates: &[SensorUpdate]) -> usize
where
    S: TelemetrySink + ?Sized,
{
    let mut accepted = 0;

    for update in updates {
        match sink.publish(update).await {
            Ok(()) => accepted += 1,
            Err(e) => warn!("Failed to publish {}: {}", update.entity_id(), e),
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MvmpError;
    use crate::mvmp::decoder::decode_telemetry;
    use crate::mvmp::decoder::test_support::sample_payload;
    use crate::telemetry::sensors::sensor_updates;

    /// Sink that rejects one named sensor and records the rest
    struct FlakySink {
        reject: &'static str,
        received: Vec<String>,
    }

    #[async_trait]
    impl TelemetrySink for FlakySink {
        async fn publish(&mut self, update: &SensorUpdate) -> Result<()> {
            if update.name == self.reject {
                return Err(MvmpError::Sink("HTTP 500".to_string()));
            }
            self.received.push(update.name.clone());
            Ok(())
        }
    }

    fn updates() -> Vec<SensorUpdate> {
        sensor_updates("mppt_", &decode_telemetry(&sample_payload()).unwrap())
    }

    #[tokio::test]
    async fn test_log_sink_counts_updates() {
        let updates = updates();
        let mut sink = LogSink::new();

        let accepted = publish_all(&mut sink, &updates).await;

        assert_eq!(accepted, updates.len());
        assert_eq!(sink.published(), updates.len() as u64);
    }

    #[tokio::test]
    async fn test_publish_all_continues_after_failure() {
        let updates = updates();
        let mut sink = FlakySink {
            reject: "mppt_chargingCurrent",
            received: Vec::new(),
        };

        let accepted = publish_all(&mut sink, &updates).await;

        assert_eq!(accepted, updates.len() - 1);
        assert!(!sink.received.contains(&"mppt_chargingCurrent".to_string()));
        assert_eq!(sink.received.last().map(String::as_str), Some("mppt_batteryTemperature"));
    }

    #[tokio::test]
    async fn test_publish_all_through_trait_object() {
        let updates = updates();
        let mut sink: Box<dyn TelemetrySink> = Box::new(LogSink::new());

        assert_eq!(publish_all(sink.as_mut(), &updates).await, updates.len());
    }
}
