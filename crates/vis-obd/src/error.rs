//! Serial transport driver errors

use thiserror::Error;

/// Errors from the serial AT-command transport driver.
///
/// All of these are local to the driver and returned to the caller as
/// values; none are retried internally.
#[derive(Debug, Error)]
pub enum ObdError {
    /// `connect` was called while a connection is already open
    #[error("a serial connection is already open")]
    AlreadyConnected,

    /// The underlying serial device could not be opened
    #[error("failed to open serial device: {0}")]
    DeviceOpenFailed(#[source] tokio_serial::Error),

    /// A command operation was invoked with no open connection
    #[error("no serial connection is open")]
    NotConnected,

    /// The read timeout elapsed before the adapter prompt appeared.
    /// The exchange is abandoned; the channel stays open for the next one.
    #[error("no terminator observed within {waited_ms} ms")]
    NoTerminatorObserved { waited_ms: u64 },

    /// The reply outgrew its fixed capacity before the prompt appeared
    #[error("reply exceeded the {capacity}-byte buffer before the terminator")]
    BufferOverflow { capacity: usize },

    /// I/O failure on the serial channel
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}
