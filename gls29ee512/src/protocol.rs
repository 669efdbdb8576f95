//! Page-transfer protocol for the GLS29EE512 serial bridge.
//!
//! The bridge firmware exposes a line-oriented command interface. The host
//! issues one command per 128-byte page and the device answers with two
//! prompt bytes bracketing the payload exchange:
//!
//! ```text
//! Host  -> Device   "<verb> <page-index>\n"     verb = read | write | verify
//! Device-> Host     '#'                          ready for payload
//! Host <-> Device   128 raw bytes                direction depends on verb
//! Device-> Host     "<status text>" '>'          back at the idle prompt
//! ```
//!
//! For `write` and `verify` the status text must contain the `OK` marker;
//! anything else classifies the page as failed. The two-phase `#`/`>`
//! handshake keeps payload bytes (which may themselves look like prompts)
//! out of the prompt matching.

use crate::error::{Error, Result};
use crate::expect::PromptMatcher;
use log::trace;
use std::fmt;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// EEPROM page size in bytes; one protocol transaction per page.
pub const PAGE_SIZE: usize = 128;

/// Full device address space in bytes.
pub const ROM_SIZE: usize = 65536;

/// Number of pages in a full transfer.
pub const PAGE_COUNT: usize = ROM_SIZE / PAGE_SIZE;

/// Prompt byte: device is ready for the page payload.
pub const PROMPT_READY: &[u8] = b"#";

/// Prompt byte: device finished the operation and is idle again.
pub const PROMPT_IDLE: &[u8] = b">";

/// Substring in the completion text denoting per-page success.
pub const SUCCESS_MARKER: &[u8] = b"OK";

/// Idle-prompt echo the firmware prints; stripped from diagnostics.
const IDLE_ECHO: &[u8] = b"ready>";

/// Page-level operation verbs understood by the bridge firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Read a page from the EEPROM.
    Read,
    /// Program a page.
    Write,
    /// Compare a page against the supplied payload.
    Verify,
}

impl Verb {
    /// Wire spelling of the verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a completed page transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Device reported success.
    Done,
    /// Device completed without the success marker.
    Failed {
        /// Decoded status text, idle-prompt echo stripped.
        diagnostic: String,
    },
}

/// Executes one page-level transaction at a time and classifies the result.
///
/// Generic over the transport so tests can drive it with an in-memory mock.
pub struct PageDriver<'a, L: Read + Write> {
    link: &'a mut L,
    timeout: Duration,
}

impl<'a, L: Read + Write> PageDriver<'a, L> {
    /// Create a driver over an open link with a per-phase timeout budget.
    pub fn new(link: &'a mut L, timeout: Duration) -> Self {
        Self { link, timeout }
    }

    /// Send the command line for a page. Never batched.
    fn command(&mut self, verb: Verb, page: u16) -> Result<()> {
        trace!("issuing {verb} for page {page}");
        self.link
            .write_all(format!("{verb} {page}\n").as_bytes())?;
        self.link.flush()?;
        Ok(())
    }

    /// Program or verify one page: command, ready prompt, payload, result.
    ///
    /// A timeout on either prompt is fatal. A completion text without the
    /// success marker classifies the page as [`PageOutcome::Failed`].
    pub fn send_page(&mut self, verb: Verb, page: u16, payload: &[u8]) -> Result<PageOutcome> {
        debug_assert_eq!(payload.len(), PAGE_SIZE);

        self.command(verb, page)?;
        PromptMatcher::new(&mut *self.link, self.timeout).expect(&[PROMPT_READY])?;

        self.link.write_all(payload)?;
        self.link.flush()?;

        let (result, _) =
            PromptMatcher::new(&mut *self.link, self.timeout).expect(&[PROMPT_IDLE])?;

        if contains_success_marker(&result) {
            Ok(PageOutcome::Done)
        } else {
            Ok(PageOutcome::Failed {
                diagnostic: decode_diagnostic(&result),
            })
        }
    }

    /// Read one page into `out`: command, ready prompt, exactly
    /// [`PAGE_SIZE`] payload bytes, idle prompt.
    ///
    /// Receiving fewer payload bytes within the budget is a fatal
    /// [`Error::ShortRead`].
    pub fn read_page(&mut self, page: u16, out: &mut [u8; PAGE_SIZE]) -> Result<()> {
        self.command(Verb::Read, page)?;
        PromptMatcher::new(&mut *self.link, self.timeout).expect(&[PROMPT_READY])?;

        let start = Instant::now();
        let mut received = 0;
        while received < out.len() && start.elapsed() < self.timeout {
            match self.link.read(&mut out[received..]) {
                Ok(0) => {},
                Ok(n) => received += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {},
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
                Err(e) => return Err(Error::Io(e)),
            }
        }
        if received < out.len() {
            return Err(Error::ShortRead { page, received });
        }

        PromptMatcher::new(&mut *self.link, self.timeout).expect(&[PROMPT_IDLE])?;
        Ok(())
    }
}

/// Check whether the completion text contains the success marker.
///
/// Substring match anywhere in the response, matching the firmware's
/// free-form status output.
pub fn contains_success_marker(result: &[u8]) -> bool {
    result
        .windows(SUCCESS_MARKER.len())
        .any(|w| w == SUCCESS_MARKER)
}

/// Decode device bytes one-to-one into text.
///
/// Each byte maps to the char with the same value (Latin-1 style), so
/// arbitrary firmware output never panics the reporter and every byte
/// stays visible.
pub fn decode_text(raw: &[u8]) -> String {
    raw.iter().map(|&b| char::from(b)).collect()
}

/// Decode a failed page's status bytes with the idle-prompt echo removed.
pub fn decode_diagnostic(raw: &[u8]) -> String {
    decode_text(&strip_idle_echo(raw))
}

fn strip_idle_echo(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i..].starts_with(IDLE_ECHO) {
            i += IDLE_ECHO.len();
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSerial;

    #[test]
    fn test_page_geometry() {
        assert_eq!(PAGE_COUNT, 512);
        assert_eq!(PAGE_COUNT * PAGE_SIZE, ROM_SIZE);
    }

    #[test]
    fn test_contains_success_marker() {
        assert!(contains_success_marker(b"page write OK\r\nready>"));
        assert!(contains_success_marker(b"OK"));
        assert!(!contains_success_marker(b"verify mismatch at 0x40"));
        assert!(!contains_success_marker(b""));
        // Case-sensitive, as the firmware emits it.
        assert!(!contains_success_marker(b"ok"));
    }

    #[test]
    fn test_decode_text_preserves_all_bytes() {
        let raw: Vec<u8> = (0..=255).collect();
        let text = decode_text(&raw);
        assert_eq!(text.chars().count(), 256);
        for (i, c) in text.chars().enumerate() {
            assert_eq!(c as u32, i as u32);
        }
    }

    #[test]
    fn test_decode_diagnostic_strips_idle_echo() {
        assert_eq!(
            decode_diagnostic(b"mismatch at 0x40\r\nready>"),
            "mismatch at 0x40\r\n"
        );
        assert_eq!(decode_diagnostic(b"ready>ready>"), "");
        // Non-UTF-8 bytes survive the decode.
        assert_eq!(decode_diagnostic(&[0xFF, b'!']), "\u{ff}!");
    }

    #[test]
    fn test_send_page_success() {
        let mut port = MockSerial::new(b"#page write OK\r\nready>");
        let payload = [0xA5u8; PAGE_SIZE];

        let mut driver = PageDriver::new(&mut port, MockSerial::TIMEOUT);
        let outcome = driver.send_page(Verb::Write, 3, &payload).unwrap();
        assert_eq!(outcome, PageOutcome::Done);

        // Command line first, then the raw payload.
        let written = port.written();
        assert!(written.starts_with(b"write 3\n"));
        assert_eq!(&written[b"write 3\n".len()..], &payload[..]);
    }

    #[test]
    fn test_send_page_missing_marker_is_failed_not_error() {
        let mut port = MockSerial::new(b"#mismatch at 0x40\r\nready>");
        let payload = [0u8; PAGE_SIZE];

        let mut driver = PageDriver::new(&mut port, MockSerial::TIMEOUT);
        let outcome = driver.send_page(Verb::Verify, 10, &payload).unwrap();
        match outcome {
            PageOutcome::Failed { diagnostic } => {
                assert_eq!(diagnostic, "mismatch at 0x40\r\n");
            },
            PageOutcome::Done => panic!("page without marker must classify as Failed"),
        }
    }

    #[test]
    fn test_send_page_timeout_on_ready_prompt_is_fatal() {
        // Device never answers the command.
        let mut port = MockSerial::new(b"");
        let payload = [0u8; PAGE_SIZE];

        let mut driver = PageDriver::new(&mut port, MockSerial::TIMEOUT);
        let err = driver
            .send_page(Verb::Write, 0, &payload)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_read_page_full() {
        let mut response = Vec::new();
        response.extend_from_slice(b"#");
        response.extend((0..PAGE_SIZE).map(|i| i as u8));
        response.extend_from_slice(b">");

        let mut port = MockSerial::new(&response);
        let mut page = [0u8; PAGE_SIZE];

        let mut driver = PageDriver::new(&mut port, MockSerial::TIMEOUT);
        driver.read_page(7, &mut page).unwrap();

        assert_eq!(page[0], 0);
        assert_eq!(page[127], 127);
        assert_eq!(port.written(), b"read 7\n");
    }

    #[test]
    fn test_read_page_short_read_is_fatal() {
        // Only 100 of 128 payload bytes before the line goes quiet.
        let mut response = Vec::new();
        response.extend_from_slice(b"#");
        response.extend(std::iter::repeat_n(0x55u8, 100));

        let mut port = MockSerial::new(&response);
        let mut page = [0u8; PAGE_SIZE];

        let mut driver = PageDriver::new(&mut port, MockSerial::TIMEOUT);
        let err = driver.read_page(0, &mut page).unwrap_err();
        match err {
            Error::ShortRead { page, received } => {
                assert_eq!(page, 0);
                assert_eq!(received, 100);
            },
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }
}
