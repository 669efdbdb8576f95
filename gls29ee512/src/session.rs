//! Transfer session: drives the page driver across the whole device.
//!
//! A session owns the open link for one invocation and transacts the 512
//! pages strictly in ascending order; a later page's command is never sent
//! before the prior page's idle prompt was observed. There are no retries:
//! the first fatal error or failed page aborts the run and the error
//! propagates to the caller, which alone decides the process exit status.

use crate::error::{Error, Result};
use crate::expect::PromptMatcher;
use crate::image::RomImage;
use crate::link::Link;
use crate::protocol::{PAGE_COUNT, PAGE_SIZE, PROMPT_IDLE, PageDriver, PageOutcome, ROM_SIZE, Verb};
use log::{debug, warn};
use std::io::Write;
use std::time::Duration;

/// One end-to-end run of dump, write, or verify across all pages.
///
/// Generic over the link so tests can drive it with an in-memory mock.
pub struct TransferSession<L: Link> {
    link: L,
    timeout: Duration,
}

impl<L: Link> TransferSession<L> {
    /// Take exclusive ownership of an open link for this session.
    ///
    /// Every prompt wait and payload read inherits the link's timeout.
    pub fn new(link: L) -> Self {
        let timeout = link.timeout();
        debug!(
            "session on {} at {} baud, timeout {timeout:?}",
            link.name(),
            link.baud_rate()
        );
        Self { link, timeout }
    }

    /// Advisory probe for the idle prompt right after connecting.
    ///
    /// The device may greet with a startup banner ending in `>`, or may
    /// already be idle and silent. A timeout here is only a warning; every
    /// later timeout during page transfer is fatal.
    pub fn probe_idle(&mut self) {
        match PromptMatcher::new(&mut self.link, self.timeout).expect(&[PROMPT_IDLE]) {
            Ok(_) => debug!("device is at its idle prompt"),
            Err(e) => warn!("{e}\ncontinuing anyway..."),
        }
    }

    /// Program the full image, page by page.
    ///
    /// `progress` observes the monotonically increasing byte count after
    /// each completed page; it has no effect on protocol behavior.
    pub fn write_image<F>(&mut self, image: &RomImage, progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        self.send_all_pages(Verb::Write, image, progress)
    }

    /// Verify the device contents against the full image, page by page.
    pub fn verify_image<F>(&mut self, image: &RomImage, progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        self.send_all_pages(Verb::Verify, image, progress)
    }

    fn send_all_pages<F>(&mut self, verb: Verb, image: &RomImage, mut progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        let mut driver = PageDriver::new(&mut self.link, self.timeout);
        let mut done = 0;

        for (page, payload) in image.pages() {
            match driver.send_page(verb, page, payload)? {
                PageOutcome::Done => {},
                PageOutcome::Failed { diagnostic } => {
                    // Abort immediately; remaining pages are never attempted.
                    return Err(Error::PageFailed {
                        page,
                        verb,
                        diagnostic,
                    });
                },
            }
            done += payload.len();
            progress(done, ROM_SIZE);
        }

        Ok(())
    }

    /// Read the full device into `out`, page by page in ascending order.
    ///
    /// Pages already received stay in `out` when a later page aborts the
    /// run, so the operator can inspect how far the transfer progressed.
    pub fn dump<W, F>(&mut self, out: &mut W, mut progress: F) -> Result<()>
    where
        W: Write,
        F: FnMut(usize, usize),
    {
        let mut driver = PageDriver::new(&mut self.link, self.timeout);
        let mut page_buf = [0u8; PAGE_SIZE];
        let mut done = 0;

        for page in 0..PAGE_COUNT as u16 {
            driver.read_page(page, &mut page_buf)?;
            out.write_all(&page_buf)?;
            done += PAGE_SIZE;
            progress(done, ROM_SIZE);
        }
        out.flush()?;

        Ok(())
    }

    /// Consume the session and return the link.
    pub fn into_link(self) -> L {
        self.link
    }
}
