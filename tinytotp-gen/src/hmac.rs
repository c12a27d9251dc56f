//! HMAC ([RFC 2104]) on top of the [`Sha1`] engine.
//!
//! [RFC 2104]: https://datatracker.ietf.org/doc/html/rfc2104

use std::io;

use secrecy::Zeroize;

use crate::sha1::{Digest, Sha1, BLOCK_LEN, DIGEST_LEN};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Running HMAC-SHA1 computation.
///
/// The inner hash is started right away in [`Hmac::new`], so any data passed to [`Hmac::update`]
/// becomes the message. The padded key is wiped when the value is dropped.
pub struct Hmac {
    key: [u8; BLOCK_LEN],
    sha1: Sha1,
}

impl Hmac {
    /// Prepare the padded key and start the inner hash.
    ///
    /// Keys longer than a block are hashed first, shorter ones are padded with zeroes. Any key
    /// length is accepted, including the empty key.
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        let mut padded = [0; BLOCK_LEN];
        if key.len() > BLOCK_LEN {
            padded[..DIGEST_LEN].copy_from_slice(Sha1::digest(key).as_ref());
        } else {
            padded[..key.len()].copy_from_slice(key);
        }

        let mut sha1 = Sha1::new();
        for byte in padded {
            sha1.write_byte(byte ^ IPAD);
        }

        Self { key: padded, sha1 }
    }

    /// Calculate the MAC of a message in one go.
    #[must_use]
    pub fn mac(key: &[u8], message: impl AsRef<[u8]>) -> Digest {
        let mut hmac = Self::new(key);
        hmac.update(message);
        hmac.finalize()
    }

    /// Append message bytes.
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        self.sha1.update(data);
    }

    /// Complete the inner hash and calculate the outer one over it.
    #[must_use]
    pub fn finalize(mut self) -> Digest {
        let inner = self.sha1.finalize_reset();

        for byte in self.key {
            self.sha1.write_byte(byte ^ OPAD);
        }
        self.sha1.update(inner);

        self.sha1.finalize_reset()
    }
}

impl Drop for Hmac {
    fn drop(&mut self) {
        self.key.zeroize();
        self.sha1.reset();
    }
}

impl io::Write for Hmac {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
