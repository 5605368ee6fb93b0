//! vis-obd - ELM327 serial transport driver
//!
//! Async request/response exchanges against an ELM327-compatible OBD-II
//! adapter over a serial channel. One [`ElmDriver`] owns the single
//! hardware connection; every exchange is serialized behind its lock, so
//! concurrent callers can never interleave bytes on the wire.

mod channel;
mod config;
mod driver;
mod error;
mod filter;

pub use channel::ElmChannel;
pub use config::SerialConfig;
pub use driver::ElmDriver;
pub use error::ObdError;
pub use filter::normalize_reply;
