//! Byte-channel seam between the driver and the physical port

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{ClearBuffer, SerialPort, SerialStream};

/// Byte channel an ELM327 exchange runs over.
///
/// The live implementation is [`tokio_serial::SerialStream`]; tests and
/// simulators attach the driver to in-memory pipes instead of hardware.
pub trait ElmChannel: AsyncRead + AsyncWrite + Unpin + Send {
    /// Drop any unread bytes left in the device input/output queues.
    fn discard_pending(&mut self) -> std::io::Result<()>;
}

impl ElmChannel for SerialStream {
    fn discard_pending(&mut self) -> std::io::Result<()> {
        self.clear(ClearBuffer::All)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

/// In-memory pipes have no device queues to flush.
impl ElmChannel for tokio::io::DuplexStream {
    fn discard_pending(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
