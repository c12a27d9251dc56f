use std::fmt;

use secrecy::Zeroize;

use crate::base32::{self, DecodeError};

/// Maximum amount of raw bytes a [`Secret`] can hold. Enough for 160-bit (20 bytes) keys as
/// recommended by RFC 4226 with some room for longer ones.
pub const SECRET_CAPACITY: usize = 32;

/// Errors when creating a [`Secret`] from raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    /// No bytes were given.
    #[error("the secret is empty")]
    Empty,
    /// More bytes were given than a secret can hold.
    #[error("the secret is {len} bytes long but at most {capacity} bytes are supported")]
    TooLong { len: usize, capacity: usize },
}

/// The decoded shared key that codes are generated from. It should be kept private as much as
/// possible.
///
/// A secret is never empty and never longer than [`SECRET_CAPACITY`]. The content is wiped from
/// memory when the value is dropped.
pub struct Secret {
    bytes: [u8; SECRET_CAPACITY],
    len: usize,
}

impl Secret {
    /// Copy raw key bytes into a new secret.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, SecretError> {
        if raw.is_empty() {
            return Err(SecretError::Empty);
        }
        if raw.len() > SECRET_CAPACITY {
            return Err(SecretError::TooLong {
                len: raw.len(),
                capacity: SECRET_CAPACITY,
            });
        }

        let mut bytes = [0; SECRET_CAPACITY];
        bytes[..raw.len()].copy_from_slice(raw);

        Ok(Self {
            bytes,
            len: raw.len(),
        })
    }

    /// Decode a Base32 encoded key, as it is usually handed out to users, into a new secret.
    ///
    /// The input length is checked before decoding (see [`base32::decoded_len_bound`]), which
    /// limits text input to 48 characters including separators, or 30 bytes. Longer keys up to
    /// [`SECRET_CAPACITY`], like 256-bit ones, can only be set through [`Self::from_bytes`].
    pub fn from_base32(text: impl AsRef<[u8]>) -> Result<Self, DecodeError> {
        let mut bytes = [0; SECRET_CAPACITY];

        match base32::decode(text.as_ref(), &mut bytes) {
            Ok(len) => Ok(Self { bytes, len }),
            Err(e) => {
                bytes.zeroize();
                Err(e)
            }
        }
    }

    /// Length of the key in bytes, always in `1..=SECRET_CAPACITY`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`, secrets can't be empty. Exists for API symmetry with [`Self::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Access the raw key bytes.
    #[must_use]
    pub fn expose_secret(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for Secret {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
        self.len.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {}])", self.len)
    }
}
