//! # tinytotp Store
//!
//! The storage component for **tinytotp** provides the places that secrets can be persisted in.
//! Both stores behave like a small EEPROM: a fixed amount of bytes that reads as `0xFF` until
//! written, with secrets placed as records at fixed slots (see [`record_offset`]).

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]

use std::{
    fs::{self, File, OpenOptions},
    io::{prelude::*, SeekFrom},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::debug;
pub use tinytotp_core::store::{record_offset, SecretStore, RECORD_LEN};
use tinytotp_core::store::{self, check_range};

/// Amount of slots in the default store.
pub const DEFAULT_SLOTS: usize = 8;
/// Size of the default store, enough to hold [`DEFAULT_SLOTS`] records.
pub const DEFAULT_SIZE: usize = DEFAULT_SLOTS * RECORD_LEN;

/// Value of bytes that were never written.
const ERASED: u8 = 0xff;

/// Errors that can occur when opening a store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to find the home directory of the executing user.
    #[error("failed to find the home folder")]
    HomefolderNotFound,
    /// An I/O related error happened.
    #[error("I/O bound error")]
    Io(#[from] std::io::Error),
}

/// In-memory store of `N` bytes, mostly useful for tests and for platforms where the secret is
/// loaded once at startup.
#[derive(Clone)]
pub struct MemoryStore<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> MemoryStore<N> {
    /// Create a new, fully erased store.
    #[must_use]
    pub fn new() -> Self {
        Self { data: [ERASED; N] }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SecretStore for MemoryStore<N> {
    fn size(&self) -> usize {
        N
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), store::Error> {
        check_range(offset, buf.len(), N)?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), store::Error> {
        check_range(offset, data.len(), N)?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Store that is backed by a file of fixed size.
///
/// Every write goes straight to the file and is synced before returning, so the order of writes
/// is kept on disk as well.
pub struct FileStore {
    file: File,
    size: usize,
}

impl FileStore {
    /// Open the store at the given location, creating it (and any missing parent folders) if
    /// needed.
    ///
    /// Files that are smaller than `size` are extended with erased bytes. Content beyond `size` is
    /// left untouched but never accessed.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self, Error> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        debug!("opened store `{}`", path.display());

        let current = file.metadata()?.len() as usize;
        if current < size {
            debug!(
                "extending store `{}` from {current} to {size} bytes",
                path.display()
            );
            file.seek(SeekFrom::End(0))?;
            file.write_all(&vec![ERASED; size - current])?;
            file.sync_data()?;
        }

        Ok(Self { file, size })
    }

    /// Open the store at the [default location](default_path) with the [default
    /// size](DEFAULT_SIZE).
    pub fn open_default() -> Result<Self, Error> {
        Self::open(default_path()?, DEFAULT_SIZE)
    }
}

impl SecretStore for FileStore {
    fn size(&self) -> usize {
        self.size
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), store::Error> {
        check_range(offset, buf.len(), self.size)?;

        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(buf).map_err(Into::into)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), store::Error> {
        check_range(offset, data.len(), self.size)?;

        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.sync_data().map_err(Into::into)
    }
}

/// Location of the store file in the user's data folder.
pub fn default_path() -> Result<PathBuf, Error> {
    Ok(ProjectDirs::from("rocks", "dnaka91", "tinytotp")
        .ok_or(Error::HomefolderNotFound)?
        .data_dir()
        .join("secrets.bin"))
}
