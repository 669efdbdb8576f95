//! Error types for gls29ee512.

use crate::protocol::Verb;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for gls29ee512 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gls29ee512 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No terminator seen within the timeout budget. Carries everything the
    /// device sent so the operator can see where the exchange stalled.
    #[error("Timeout waiting for {expected}; buffer contents:\n{}", crate::protocol::decode_text(.buffer))]
    Timeout {
        /// Human-readable description of the expected terminator(s).
        expected: String,
        /// Bytes accumulated before the deadline elapsed.
        buffer: Vec<u8>,
    },

    /// Fewer than a full page of payload arrived for a read command.
    #[error("Short read at page {page}: received {received} of {} bytes", crate::protocol::PAGE_SIZE)]
    ShortRead {
        /// Page index the read command addressed.
        page: u16,
        /// Payload bytes received before the deadline.
        received: usize,
    },

    /// The device completed the page operation without the success marker.
    /// A protocol-level failure, distinct from a transport timeout.
    #[error("Failed {verb} at page {page}:\n{diagnostic}")]
    PageFailed {
        /// Page index of the failed operation.
        page: u16,
        /// Operation that failed.
        verb: Verb,
        /// Device status text, idle-prompt echo stripped.
        diagnostic: String,
    },

    /// Input file is not exactly one ROM image long.
    #[error("Expected {expected} bytes of ROM image, got {actual}")]
    ImageSize {
        /// Required image length.
        expected: usize,
        /// Actual file length.
        actual: usize,
    },

    /// Dump destination already exists; never overwritten silently.
    #[error("Refusing to overwrite {0}")]
    DumpTargetExists(PathBuf),

    /// No candidate serial device found during auto-detection.
    #[error("No serial device found")]
    DeviceNotFound,

    /// More than one candidate serial device found during auto-detection.
    #[error("Found {0} candidate serial devices, expected exactly one")]
    AmbiguousDevice(usize),
}
