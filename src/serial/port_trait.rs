//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::mvmp::decoder::frame_size;

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Number of received bytes waiting to be read
    fn bytes_pending(&self) -> io::Result<u32>;

    /// Read one response from the port
    async fn read_available(&mut self) -> io::Result<Vec<u8>>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
    /// Line silence that ends a read
    idle_timeout: Duration,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream, idle_timeout: Duration) -> Self {
        Self { port, idle_timeout }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }

    fn bytes_pending(&self) -> io::Result<u32> {
        use tokio_serial::SerialPort;
        self.port.bytes_to_read().map_err(io::Error::from)
    }

    /// Read until the frame named by the length byte is complete, or until
    /// the line stays idle for `idle_timeout`
    async fn read_available(&mut self) -> io::Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut data = Vec::new();
        let mut chunk = [0u8; 64];

        loop {
            if frame_size(&data).is_some_and(|size| data.len() >= size) {
                break;
            }

            match timeout(self.idle_timeout, self.port.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => data.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!("Serial line idle after {} bytes", data.len());
                    break;
                }
            }
        }

        Ok(data)
    }
}
