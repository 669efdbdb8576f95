//! ROM image model.
//!
//! A ROM image is exactly [`ROM_SIZE`] bytes. Length is validated before any
//! device I/O so a truncated or oversized file never half-programs a chip.

use crate::error::{Error, Result};
use crate::protocol::{PAGE_SIZE, ROM_SIZE};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

/// An exact 65536-byte EEPROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    data: Vec<u8>,
}

impl RomImage {
    /// Build an image from raw bytes, rejecting any length other than
    /// [`ROM_SIZE`].
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != ROM_SIZE {
            return Err(Error::ImageSize {
                expected: ROM_SIZE,
                actual: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Load an image from a file, rejecting wrong-sized files before any
    /// device I/O happens.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// The 128-byte page at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the 512 pages of the image.
    pub fn page(&self, index: u16) -> &[u8] {
        let offset = usize::from(index) * PAGE_SIZE;
        &self.data[offset..offset + PAGE_SIZE]
    }

    /// Iterate pages in ascending offset order with their page index.
    pub fn pages(&self) -> impl Iterator<Item = (u16, &[u8])> {
        self.data
            .chunks_exact(PAGE_SIZE)
            .enumerate()
            .map(|(i, chunk)| (i as u16, chunk))
    }

    /// The raw image bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Create the dump output file, refusing to overwrite an existing one.
pub fn create_dump_file(path: &Path) -> Result<File> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(Error::DumpTargetExists(path.to_path_buf()))
        },
        Err(e) => Err(Error::Io(e)),
    }
}
