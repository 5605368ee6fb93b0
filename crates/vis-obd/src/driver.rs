//! Command exchanges against the adapter

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

use crate::channel::ElmChannel;
use crate::config::SerialConfig;
use crate::error::ObdError;
use crate::filter::{normalize_reply, PROMPT};

/// Capacity for acknowledgement and sensor replies.
const REPLY_CAPACITY: usize = 64;

/// Capacity for trouble-code replies, which may span multiple frames.
const DTC_REPLY_CAPACITY: usize = 128;

const RESET_COMMAND: &[u8] = b"ATZ\r\n";
const AUTO_PROTOCOL_COMMAND: &[u8] = b"ATSP0\r\n";
const READ_DTC_COMMAND: &[u8] = b"03\r";

/// Driver for an ELM327-compatible adapter on a serial channel.
///
/// The driver owns the process's only handle to the device. Each command
/// exchange (write, then read single bytes until the prompt) runs with the
/// channel lock held, so at most one exchange is in flight at any instant;
/// waiters are queued in FIFO order by the lock.
pub struct ElmDriver<C: ElmChannel = SerialStream> {
    config: SerialConfig,
    port: Mutex<Option<C>>,
}

impl ElmDriver<SerialStream> {
    /// Create a driver for the configured device. No connection is opened
    /// until [`ElmDriver::connect`] is called.
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: Mutex::new(None),
        }
    }

    /// Open the serial device and run the adapter handshake.
    ///
    /// Fails with [`ObdError::AlreadyConnected`] if a connection is open;
    /// the existing connection is left untouched. The port is configured
    /// for raw byte-oriented transfer: 8 data bits, no parity, one stop
    /// bit, no flow control. The reset and protocol-negotiation handshake
    /// must complete within `handshake_timeout`.
    pub async fn connect(&self, handshake_timeout: Duration) -> Result<(), ObdError> {
        let mut guard = self.port.lock().await;
        if guard.is_some() {
            return Err(ObdError::AlreadyConnected);
        }

        let mut port = tokio_serial::new(self.config.device.as_str(), self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.config.byte_timeout())
            .open_native_async()
            .map_err(ObdError::DeviceOpenFailed)?;
        info!(
            device = %self.config.device,
            baud = self.config.baud_rate,
            "serial port opened"
        );

        timeout(handshake_timeout, self.handshake(&mut port))
            .await
            .map_err(|_| ObdError::NoTerminatorObserved {
                waited_ms: handshake_timeout.as_millis() as u64,
            })??;

        *guard = Some(port);
        Ok(())
    }

    /// Reset the adapter, wait for it to settle, then select automatic
    /// protocol detection.
    async fn handshake(&self, port: &mut SerialStream) -> Result<(), ObdError> {
        let byte_timeout = self.config.byte_timeout();

        let reset = exchange(port, RESET_COMMAND, REPLY_CAPACITY, byte_timeout).await?;
        debug!(response = %normalize_reply(&reset), "adapter reset");

        tokio::time::sleep(self.config.settle_delay()).await;

        let proto = exchange(port, AUTO_PROTOCOL_COMMAND, REPLY_CAPACITY, byte_timeout).await?;
        debug!(response = %normalize_reply(&proto), "protocol set to automatic");
        Ok(())
    }
}

impl<C: ElmChannel> ElmDriver<C> {
    /// Attach a driver to an already-open channel.
    ///
    /// Used by tests and simulators; hardware connections go through
    /// [`ElmDriver::connect`], which also runs the adapter handshake.
    pub fn with_channel(config: SerialConfig, channel: C) -> Self {
        Self {
            config,
            port: Mutex::new(Some(channel)),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.port.lock().await.is_some()
    }

    /// Send a mode-1 style query and return the normalized reply.
    pub async fn send_query(&self, command: &[u8]) -> Result<String, ObdError> {
        let raw = self.exchange_exclusive(command, REPLY_CAPACITY).await?;
        Ok(normalize_reply(&raw))
    }

    /// Request stored diagnostic trouble codes (mode 3). Uses the larger
    /// reply buffer since codes can span multiple frames.
    pub async fn read_diagnostic_codes(&self) -> Result<String, ObdError> {
        let raw = self
            .exchange_exclusive(READ_DTC_COMMAND, DTC_REPLY_CAPACITY)
            .await?;
        Ok(normalize_reply(&raw))
    }

    /// Write a command to the vehicle bus (mode 8) and return the
    /// normalized reply. Residual bytes left in the device queues are
    /// discarded before the channel is released, so they cannot corrupt
    /// the next exchange.
    pub async fn write_bus_command(&self, command: &[u8]) -> Result<String, ObdError> {
        let raw = {
            let mut guard = self.port.lock().await;
            let port = guard.as_mut().ok_or(ObdError::NotConnected)?;
            let raw = exchange(port, command, REPLY_CAPACITY, self.config.byte_timeout()).await?;
            port.discard_pending()?;
            raw
        };
        Ok(normalize_reply(&raw))
    }

    /// Close the serial channel. The connection guard is reset under the
    /// same lock, so a concurrent exchange either completes first or fails
    /// with [`ObdError::NotConnected`].
    pub async fn disconnect(&self) -> Result<(), ObdError> {
        let mut guard = self.port.lock().await;
        guard.take().ok_or(ObdError::NotConnected)?;
        info!("serial connection closed");
        Ok(())
    }

    async fn exchange_exclusive(
        &self,
        command: &[u8],
        capacity: usize,
    ) -> Result<Vec<u8>, ObdError> {
        let mut guard = self.port.lock().await;
        let port = guard.as_mut().ok_or(ObdError::NotConnected)?;
        exchange(port, command, capacity, self.config.byte_timeout()).await
    }
}

/// One write-then-read-until-prompt cycle against the adapter.
///
/// The caller must hold the channel exclusively for the whole call; that
/// is what makes a command exchange atomic.
async fn exchange<C: ElmChannel>(
    port: &mut C,
    command: &[u8],
    capacity: usize,
    byte_timeout: Duration,
) -> Result<Vec<u8>, ObdError> {
    port.write_all(command).await?;
    port.flush().await?;
    read_until_prompt(port, capacity, byte_timeout).await
}

/// Read single bytes until the adapter prompt, within a fixed capacity.
///
/// Each byte is granted `byte_timeout`; a reply that never shows the
/// prompt fails instead of blocking forever, and one longer than
/// `capacity` fails instead of growing without bound.
async fn read_until_prompt<C: ElmChannel>(
    port: &mut C,
    capacity: usize,
    byte_timeout: Duration,
) -> Result<Vec<u8>, ObdError> {
    let mut reply = Vec::with_capacity(capacity);
    let mut byte = [0u8; 1];
    loop {
        let read = timeout(byte_timeout, port.read(&mut byte))
            .await
            .map_err(|_| ObdError::NoTerminatorObserved {
                waited_ms: byte_timeout.as_millis() as u64,
            })??;
        if read == 0 {
            return Err(ObdError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "serial channel closed mid-reply",
            )));
        }
        reply.push(byte[0]);
        if byte[0] == PROMPT {
            return Ok(reply);
        }
        if reply.len() == capacity {
            return Err(ObdError::BufferOverflow { capacity });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    use super::*;

    fn test_config() -> SerialConfig {
        SerialConfig {
            device: "test".to_string(),
            baud_rate: 38400,
            byte_timeout_ms: 200,
            settle_delay_ms: 1,
        }
    }

    fn attached_driver() -> (ElmDriver<DuplexStream>, DuplexStream) {
        let (driver_side, adapter_side) = duplex(1024);
        (
            ElmDriver::with_channel(test_config(), driver_side),
            adapter_side,
        )
    }

    #[tokio::test]
    async fn query_decodes_engine_rpm_reply() {
        let (driver, mut adapter) = attached_driver();
        let scripted = tokio::spawn(async move {
            let mut command = [0u8; 5];
            adapter.read_exact(&mut command).await.unwrap();
            assert_eq!(&command, b"010C\r");
            adapter.write_all(b"41 0C 1A F8\r\r>").await.unwrap();
        });

        let reply = driver.send_query(b"010C\r").await.unwrap();
        assert_eq!(reply, "410C1AF8");
        scripted.await.unwrap();
    }

    #[tokio::test]
    async fn missing_terminator_times_out_and_leaves_channel_usable() {
        let (driver, mut adapter) = attached_driver();
        let scripted = tokio::spawn(async move {
            let mut command = [0u8; 5];
            adapter.read_exact(&mut command).await.unwrap();
            // Truncated reply: no prompt ever arrives.
            adapter.write_all(b"41 0C").await.unwrap();

            adapter.read_exact(&mut command).await.unwrap();
            adapter.write_all(b"41 0C 1A F8\r>").await.unwrap();
        });

        let err = driver.send_query(b"010C\r").await.unwrap_err();
        assert!(matches!(err, ObdError::NoTerminatorObserved { .. }));

        // The channel must remain usable for the next exchange.
        let reply = driver.send_query(b"010C\r").await.unwrap();
        assert_eq!(reply, "410C1AF8");
        scripted.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_reply_reports_buffer_overflow() {
        let (driver, mut adapter) = attached_driver();
        let scripted = tokio::spawn(async move {
            let mut command = [0u8; 5];
            adapter.read_exact(&mut command).await.unwrap();
            adapter.write_all(&[b'A'; 100]).await.unwrap();
        });

        let err = driver.send_query(b"010C\r").await.unwrap_err();
        assert!(matches!(err, ObdError::BufferOverflow { capacity: 64 }));
        scripted.await.unwrap();
    }

    #[tokio::test]
    async fn trouble_code_reply_fits_larger_buffer() {
        let (driver, mut adapter) = attached_driver();
        let scripted = tokio::spawn(async move {
            let mut command = [0u8; 3];
            adapter.read_exact(&mut command).await.unwrap();
            assert_eq!(&command, b"03\r");
            // 100 payload bytes: over the acknowledgement capacity, within
            // the trouble-code capacity.
            adapter.write_all(&[b'4'; 100]).await.unwrap();
            adapter.write_all(b">").await.unwrap();
        });

        let reply = driver.read_diagnostic_codes().await.unwrap();
        assert_eq!(reply.len(), 100);
        scripted.await.unwrap();
    }

    #[tokio::test]
    async fn bus_write_roundtrip() {
        let (driver, mut adapter) = attached_driver();
        let scripted = tokio::spawn(async move {
            let mut command = [0u8; 5];
            adapter.read_exact(&mut command).await.unwrap();
            adapter.write_all(b"OK\r>").await.unwrap();
        });

        let reply = driver.write_bus_command(b"0800\r").await.unwrap();
        assert_eq!(reply, "OK");
        scripted.await.unwrap();
    }

    #[tokio::test]
    async fn exchanges_serialize_under_concurrent_callers() {
        const EXCHANGE_DELAY: Duration = Duration::from_millis(50);

        let (driver, mut adapter) = attached_driver();
        let driver = Arc::new(driver);
        let scripted = tokio::spawn(async move {
            for _ in 0..2 {
                let mut command = [0u8; 5];
                adapter.read_exact(&mut command).await.unwrap();
                tokio::time::sleep(EXCHANGE_DELAY).await;
                adapter.write_all(b"41 0C 1A F8\r>").await.unwrap();
            }
        });

        let started = Instant::now();
        let first = tokio::spawn({
            let driver = driver.clone();
            async move { driver.send_query(b"010C\r").await }
        });
        let second = tokio::spawn({
            let driver = driver.clone();
            async move { driver.send_query(b"010C\r").await }
        });

        assert_eq!(first.await.unwrap().unwrap(), "410C1AF8");
        assert_eq!(second.await.unwrap().unwrap(), "410C1AF8");
        // Serialized exchanges take at least the sum of both delays.
        assert!(started.elapsed() >= EXCHANGE_DELAY * 2);
        scripted.await.unwrap();
    }

    #[tokio::test]
    async fn operations_fail_once_disconnected() {
        let (driver, _adapter) = attached_driver();
        assert!(driver.is_connected().await);

        driver.disconnect().await.unwrap();
        assert!(!driver.is_connected().await);

        let err = driver.send_query(b"010C\r").await.unwrap_err();
        assert!(matches!(err, ObdError::NotConnected));
        let err = driver.disconnect().await.unwrap_err();
        assert!(matches!(err, ObdError::NotConnected));
    }
}
