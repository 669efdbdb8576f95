//! Serial link abstraction.
//!
//! The protocol layer is generic over `Read + Write`, so it stays
//! I/O-agnostic; the [`Link`] trait adds the small amount of port state the
//! session and CLI care about (name, timeout, baud rate). The session is
//! generic over [`Link`], so tests drive it with an in-memory mock.

pub mod detect;
pub mod serial;

pub use detect::{DetectedPort, auto_detect_device, detect_ports};
pub use serial::SerialLink;

use std::io::{Read, Write};
use std::time::Duration;

/// Baud rate agreed out-of-band with the bridge firmware.
pub const DEFAULT_BAUD: u32 = 500_000;

/// Per-read timeout budget for all link operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable link configuration, fixed for the life of a transfer session.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Port name/path (e.g., "/dev/ttyACM0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Per-read timeout.
    pub timeout: Duration,
}

impl LinkConfig {
    /// Configuration for a port with the protocol's fixed defaults.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the baud rate.
    #[must_use]
    pub fn with_baud(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Byte transport to the programmer bridge.
pub trait Link: Read + Write + Send {
    /// Get the per-read timeout.
    fn timeout(&self) -> Duration;

    /// Get the configured baud rate.
    fn baud_rate(&self) -> u32;

    /// Get the port name/path.
    fn name(&self) -> &str;
}
