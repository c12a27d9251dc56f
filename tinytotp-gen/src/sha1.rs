//! Incremental SHA-1 as specified in [FIPS 180-2].
//!
//! Input is fed byte-wise into a single 64 byte block buffer, which is compressed as soon as it is
//! full. The engine doesn't allocate and only ever holds one block of pending input.
//!
//! [FIPS 180-2]: https://csrc.nist.gov/publications/detail/fips/180/2/archive/2002-08-01

use std::{
    fmt::{self, Display},
    io,
};

/// Size of a single block that is processed at once, in bytes.
pub const BLOCK_LEN: usize = 64;
/// Size of the final digest, in bytes.
pub const DIGEST_LEN: usize = 20;

const INITIAL_STATE: [u32; 5] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476, 0xc3d2_e1f0];

fn k(t: usize) -> u32 {
    if t < 20 {
        0x5a82_7999
    } else if t < 40 {
        0x6ed9_eba1
    } else if t < 60 {
        0x8f1b_bcdc
    } else {
        0xca62_c1d6
    }
}

fn f(t: usize, b: u32, c: u32, d: u32) -> u32 {
    if t < 20 {
        // Ch
        d ^ (b & (c ^ d))
    } else if t < 40 {
        b ^ c ^ d
    } else if t < 60 {
        // Maj
        (b & c) | (d & (b | c))
    } else {
        b ^ c ^ d
    }
}

/// Final output of a SHA-1 (or HMAC-SHA1) computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(raw: [u8; DIGEST_LEN]) -> Self {
        Self(raw)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

/// Running SHA-1 computation.
///
/// Create it with [`Sha1::new`], feed data with [`Sha1::update`] and get the digest with
/// [`Sha1::finalize`]. As finalizing consumes the engine, writing to an already finalized hash is
/// impossible. Use [`Sha1::finalize_reset`] to reuse the same value for another message.
#[derive(Clone)]
pub struct Sha1 {
    state: [u32; 5],
    buffer: [u8; BLOCK_LEN],
    /// Position of the next byte in `buffer`, always below [`BLOCK_LEN`].
    offset: usize,
    /// Total amount of message bytes since the last reset.
    len: u64,
}

impl Sha1 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            buffer: [0; BLOCK_LEN],
            offset: 0,
            len: 0,
        }
    }

    /// Hash the given data in one go.
    #[must_use]
    pub fn digest(data: impl AsRef<[u8]>) -> Digest {
        let mut sha1 = Self::new();
        sha1.update(data);
        sha1.finalize()
    }

    /// Start over with a new message, dropping anything written so far.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Append a single message byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.len = self.len.wrapping_add(1);
        self.push(byte);
    }

    /// Append message bytes. Empty input is a no-op.
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        for &byte in data.as_ref() {
            self.write_byte(byte);
        }
    }

    /// Pad the message and return the digest.
    #[must_use]
    pub fn finalize(mut self) -> Digest {
        self.pad();
        self.output()
    }

    /// Pad the message and return the digest, leaving the engine ready for a new message.
    pub fn finalize_reset(&mut self) -> Digest {
        self.pad();
        let digest = self.output();
        self.reset();
        digest
    }

    fn push(&mut self, byte: u8) {
        self.buffer[self.offset] = byte;
        self.offset += 1;

        if self.offset == BLOCK_LEN {
            compress(&mut self.state, &self.buffer);
            self.offset = 0;
        }
    }

    /// Padding according to FIPS 180-2 §5.1.1: a single `1` bit, zeroes up to the last 8 bytes of
    /// a block and the message length in bits, big-endian.
    fn pad(&mut self) {
        let bits = self.len.wrapping_mul(8);

        self.push(0x80);
        while self.offset != BLOCK_LEN - 8 {
            self.push(0);
        }
        for byte in bits.to_be_bytes() {
            self.push(byte);
        }
    }

    fn output(&self) -> Digest {
        let mut digest = [0; DIGEST_LEN];
        for (chunk, word) in digest.chunks_exact_mut(4).zip(self.state) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }

        Digest(digest)
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for Sha1 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Process a single block. The message schedule is kept in a rolling window of 16 words.
#[allow(clippy::many_single_char_names)]
fn compress(state: &mut [u32; 5], block: &[u8; BLOCK_LEN]) {
    let mut w = [0_u32; 16];
    for (word, chunk) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for t in 0..80 {
        if t >= 16 {
            let x = w[(t + 13) & 15] ^ w[(t + 8) & 15] ^ w[(t + 2) & 15] ^ w[t & 15];
            w[t & 15] = x.rotate_left(1);
        }

        let temp = a
            .rotate_left(5)
            .wrapping_add(f(t, b, c, d))
            .wrapping_add(e)
            .wrapping_add(w[t & 15])
            .wrapping_add(k(t));

        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = temp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}
