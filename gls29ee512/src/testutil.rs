//! In-memory serial mock shared by the unit tests.

use crate::link::Link;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

/// Mock serial port with separate read/write buffers.
///
/// Reads drain a scripted response stream; an exhausted stream reports
/// `TimedOut` the way a real serial port does. Writes are captured for
/// later inspection.
pub struct MockSerial {
    read_buf: VecDeque<u8>,
    write_buf: Vec<u8>,
}

impl MockSerial {
    /// Short deadline for tests; real transfers use 5 seconds.
    pub const TIMEOUT: Duration = Duration::from_millis(50);

    pub fn new(response: &[u8]) -> Self {
        Self {
            read_buf: response.iter().copied().collect(),
            write_buf: Vec::new(),
        }
    }

    /// Everything the driver wrote, in order.
    pub fn written(&self) -> &[u8] {
        &self.write_buf
    }

    /// Scripted response bytes not yet consumed.
    pub fn remaining(&self) -> Vec<u8> {
        self.read_buf.iter().copied().collect()
    }
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.read_buf.is_empty() {
            return Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.read_buf.len());
        for b in buf.iter_mut().take(n) {
            *b = self.read_buf.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Link for MockSerial {
    fn timeout(&self) -> Duration {
        Self::TIMEOUT
    }

    fn baud_rate(&self) -> u32 {
        500_000
    }

    fn name(&self) -> &str {
        "mock"
    }
}
