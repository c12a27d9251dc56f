//! Interface to the non-volatile storage that secrets can be persisted in, and the layout of a
//! stored secret.
//!
//! A stored secret (a _record_) is a single length byte followed by that many raw key bytes:
//!
//! ```text
//! +--------+------------------------+
//! | len u8 | secret bytes (len)     |
//! +--------+------------------------+
//! ```
//!
//! Records are placed at caller chosen offsets. [`RECORD_LEN`] bytes are enough for any secret,
//! and [`record_offset`] gives the offset of fixed size slots that hold one record each.

use log::debug;

use crate::{Secret, SECRET_CAPACITY};

/// Bytes a single record may occupy at most.
pub const RECORD_LEN: usize = 1 + SECRET_CAPACITY;

/// Errors of secret stores and of reading/writing records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The accessed range doesn't lie within the store.
    #[error("range of {len} bytes at offset {offset} is outside the store of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
    /// The record at the offset was never written or was erased.
    #[error("no secret stored at offset {offset}")]
    EmptyRecord { offset: usize },
    /// The stored length byte is larger than any secret can be.
    #[error("stored secret of {len} bytes exceeds the capacity of {capacity} bytes")]
    RecordTooLong { len: usize, capacity: usize },
    /// An I/O related error happened.
    #[error("I/O bound error")]
    Io(#[from] std::io::Error),
}

/// A byte addressable, fixed size storage like an EEPROM or a file.
///
/// Implementations must reject any access outside of `0..size()` with [`Error::OutOfBounds`]
/// without modifying anything. [`check_range`] helps with that.
pub trait SecretStore {
    /// Total amount of addressable bytes.
    fn size(&self) -> usize;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Error>;

    /// Write all of `data` starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Error>;
}

impl<S: SecretStore + ?Sized> SecretStore for &mut S {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Error> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Error> {
        (**self).write(offset, data)
    }
}

/// Ensure that `len` bytes at `offset` fit into a store of `size` bytes.
pub fn check_range(offset: usize, len: usize, size: usize) -> Result<(), Error> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfBounds { offset, len, size }),
    }
}

/// Offset of the fixed size slot with the given index.
///
/// Saturates at `usize::MAX` for huge slots, which lies outside of any store and is rejected on
/// access.
#[must_use]
pub fn record_offset(slot: usize) -> usize {
    slot.saturating_mul(RECORD_LEN)
}

/// Persist a secret as record at `offset`.
///
/// The whole record range is checked before anything is written. The length byte is first
/// cleared, then the key is written and the real length comes last. An interrupted save therefore
/// leaves an empty record behind, never one that loads as (wrong) secret.
pub fn save_record<S>(store: &mut S, offset: usize, secret: &Secret) -> Result<(), Error>
where
    S: SecretStore + ?Sized,
{
    let bytes = secret.expose_secret();
    check_range(offset, 1 + bytes.len(), store.size())?;

    store.write(offset, &[0])?;
    store.write(offset + 1, bytes)?;
    store.write(offset, &[bytes.len() as u8])?;

    debug!("saved secret of {} bytes at offset {offset}", bytes.len());
    Ok(())
}

/// Load the record at `offset`.
///
/// The length byte is validated against [`SECRET_CAPACITY`] and the record range against the
/// store size before the key itself is read.
pub fn load_record<S>(store: &mut S, offset: usize) -> Result<Secret, Error>
where
    S: SecretStore + ?Sized,
{
    check_range(offset, 1, store.size())?;

    let mut len = [0];
    store.read(offset, &mut len)?;
    let len = usize::from(len[0]);

    if len == 0 {
        return Err(Error::EmptyRecord { offset });
    }
    if len > SECRET_CAPACITY {
        return Err(Error::RecordTooLong {
            len,
            capacity: SECRET_CAPACITY,
        });
    }
    check_range(offset + 1, len, store.size())?;

    let mut buf = [0; SECRET_CAPACITY];
    store.read(offset + 1, &mut buf[..len])?;

    // The length is already known to be valid, so creating the secret can't fail.
    let secret = Secret::from_bytes(&buf[..len]).map_err(|_| Error::EmptyRecord { offset });
    secrecy::Zeroize::zeroize(&mut buf);

    debug!("loaded secret of {len} bytes from offset {offset}");
    secret
}

/// Invalidate the record at `offset` by clearing its length byte.
pub fn erase_record<S>(store: &mut S, offset: usize) -> Result<(), Error>
where
    S: SecretStore + ?Sized,
{
    check_range(offset, 1, store.size())?;
    store.write(offset, &[0])
}
