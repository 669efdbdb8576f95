//! Deadline-bounded prompt matching.
//!
//! Converts the raw byte stream from a link into "terminator seen" events.
//! The matcher compares raw byte suffixes, never decoded text, so payload
//! bytes and partial multi-byte sequences can never falsely match.

use crate::error::{Error, Result};
use crate::protocol::decode_text;
use std::io::Read;
use std::time::{Duration, Instant};

/// Accumulates bytes from a link until the buffer ends with one of the
/// expected terminator sequences, or a deadline elapses.
pub struct PromptMatcher<'a, R: Read> {
    link: &'a mut R,
    timeout: Duration,
}

impl<'a, R: Read> PromptMatcher<'a, R> {
    /// Wrap a link with a per-call timeout budget.
    pub fn new(link: &'a mut R, timeout: Duration) -> Self {
        Self { link, timeout }
    }

    /// Block until the accumulated buffer ends with one of `terminators`.
    ///
    /// Returns the full buffer and the index of the matched terminator.
    /// Terminators are checked in the supplied order after every appended
    /// byte, so the first suffix match wins and no extra bytes are consumed.
    ///
    /// The deadline is wall clock, measured once at call start; partial
    /// reads do not reset it. On expiry the accumulated buffer travels in
    /// the error for diagnostic display.
    pub fn expect(&mut self, terminators: &[&[u8]]) -> Result<(Vec<u8>, usize)> {
        let start = Instant::now();
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];

        while start.elapsed() < self.timeout {
            match self.link.read(&mut byte) {
                Ok(0) => {},
                Ok(_) => {
                    buf.push(byte[0]);
                    for (index, terminator) in terminators.iter().enumerate() {
                        if buf.ends_with(terminator) {
                            return Ok((buf, index));
                        }
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {},
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Err(Error::Timeout {
            expected: describe_terminators(terminators),
            buffer: buf,
        })
    }
}

fn describe_terminators(terminators: &[&[u8]]) -> String {
    terminators
        .iter()
        .map(|t| format!("{:?}", decode_text(t)))
        .collect::<Vec<_>>()
        .join(" or ")
}
