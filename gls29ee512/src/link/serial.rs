//! Serial port link implementation.

use crate::error::Result;
use crate::link::{Link, LinkConfig};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Serial port connection to the programmer bridge.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    timeout: Duration,
    baud_rate: u32,
}

impl SerialLink {
    /// Open the serial device described by `config` (8N1, no flow control).
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()?;

        Ok(Self {
            port,
            name: config.port_name.clone(),
            timeout: config.timeout,
            baud_rate: config.baud_rate,
        })
    }
}

impl Link for SerialLink {
    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_config_defaults() {
        let config = LinkConfig::new("/dev/ttyACM0");
        assert_eq!(config.baud_rate, 500_000);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_link_config_builder() {
        let config = LinkConfig::new("/dev/ttyACM0")
            .with_baud(115_200)
            .with_timeout(Duration::from_secs(1));
        assert_eq!(config.port_name, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }
}
