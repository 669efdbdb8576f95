//! # gls29ee512
//!
//! A library for programming GLS29EE512 parallel EEPROMs through a
//! microcontroller bridge reachable over a serial link.
//!
//! The host issues one line-oriented command per 128-byte page; the bridge
//! executes it against the chip and answers with prompt bytes and a status
//! token. This crate provides:
//!
//! - The page-transfer protocol driver (`read`/`write`/`verify` per page)
//! - Prompt-based synchronization with deadline-bounded matching
//! - The 65536-byte ROM image model
//! - The transfer session that drives dump, write, and verify runs
//! - Serial link handling and device auto-discovery
//!
//! Chip-specific programming algorithms (erase/unlock sequences) live on
//! the bridge firmware, not here.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gls29ee512::{LinkConfig, RomImage, SerialLink, TransferSession};
//!
//! fn main() -> gls29ee512::Result<()> {
//!     let image = RomImage::from_file("rom.bin".as_ref())?;
//!
//!     let config = LinkConfig::new("/dev/ttyACM0");
//!     let link = SerialLink::open(&config)?;
//!
//!     let mut session = TransferSession::new(link);
//!     session.probe_idle();
//!     session.write_image(&image, |done, total| {
//!         println!("wrote {done}/{total} bytes");
//!     })?;
//!     session.verify_image(&image, |_, _| {})?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod expect;
pub mod image;
pub mod link;
pub mod protocol;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use {
    error::{Error, Result},
    expect::PromptMatcher,
    image::{RomImage, create_dump_file},
    link::{
        DEFAULT_BAUD, DEFAULT_TIMEOUT, DetectedPort, Link, LinkConfig, SerialLink,
        auto_detect_device, detect_ports,
    },
    protocol::{
        PAGE_COUNT, PAGE_SIZE, PROMPT_IDLE, PROMPT_READY, PageDriver, PageOutcome, ROM_SIZE,
        SUCCESS_MARKER, Verb, contains_success_marker, decode_diagnostic, decode_text,
    },
    session::TransferSession,
};
