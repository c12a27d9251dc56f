//! # tinytotp Gen(erator)
//!
//! Generator component of **tinytotp**. It creates time based one-time codes ([RFC 6238]) on top
//! of the counter based HOTP algorithm ([RFC 4226]), with its own SHA-1 and HMAC implementation
//! that works on fixed buffers only.
//!
//! The main entry point is [`Totp`], which owns a decoded secret and turns timestamps into
//! [`Code`]s:
//!
//! ```
//! use tinytotp_gen::Totp;
//!
//! let mut totp = Totp::new();
//! assert!(!totp.gen_code(59).is_valid());
//!
//! totp.update_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
//! assert_eq!("287082", totp.gen_code(59).to_string());
//! ```
//!
//! [RFC 4226]: https://datatracker.ietf.org/doc/html/rfc4226
//! [RFC 6238]: https://datatracker.ietf.org/doc/html/rfc6238

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]

use std::num::NonZeroU64;

use log::{debug, warn};
use tinytotp_core::{
    base32::DecodeError,
    store::{self, SecretStore},
    SecretError, MODULUS,
};
pub use tinytotp_core::{CalendarTime, Code, Secret};

pub use self::{
    hmac::Hmac,
    sha1::{Digest, Sha1},
};

pub mod hmac;
pub mod sha1;

/// Most common length of a time step, in seconds.
pub const DEFAULT_STEP: NonZeroU64 = match NonZeroU64::new(30) {
    Some(step) => step,
    None => unreachable!(),
};

/// Errors that can occur when managing the secret or generating a code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No (valid) secret was set yet.
    #[error("no secret available")]
    NoSecret,
    /// The given Base32 secret couldn't be decoded.
    #[error("the secret is not valid Base32")]
    Decode(#[from] DecodeError),
    /// The given raw secret has an invalid length.
    #[error("the secret has an invalid length")]
    Secret(#[from] SecretError),
    /// Saving or loading the secret failed.
    #[error("failed accessing the secret store")]
    Store(#[from] store::Error),
    /// The timestamp lies before the Unix epoch, where no time steps exist.
    #[error("timestamp {0} lies before the Unix epoch")]
    BeforeEpoch(i64),
}

/// Time based code generator.
///
/// A generator starts out without a secret and can't produce codes until one is set. Setting a
/// secret either fully replaces the previous one, or (if the new one is invalid) leaves the
/// generator without any secret. It never silently keeps using an old secret.
///
/// The length of a time step is fixed on creation.
#[derive(Debug)]
pub struct Totp {
    step: NonZeroU64,
    secret: Option<Secret>,
}

impl Default for Totp {
    fn default() -> Self {
        Self::new()
    }
}

impl Totp {
    /// Create a generator without secret, using the [`DEFAULT_STEP`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_step(DEFAULT_STEP)
    }

    /// Create a generator without secret, using a custom time step in seconds.
    #[must_use]
    pub fn with_step(step: NonZeroU64) -> Self {
        Self { step, secret: None }
    }

    /// Create a generator with an already decoded secret.
    #[must_use]
    pub fn from_secret(secret: Secret, step: NonZeroU64) -> Self {
        Self {
            step,
            secret: Some(secret),
        }
    }

    /// Create a generator from a Base32 encoded secret.
    pub fn from_base32(secret: impl AsRef<[u8]>, step: NonZeroU64) -> Result<Self, Error> {
        let mut totp = Self::with_step(step);
        totp.update_secret(secret)?;
        Ok(totp)
    }

    /// Length of a single time step in seconds.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step.get()
    }

    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Replace the secret with the given Base32 encoded one.
    ///
    /// If decoding fails, the generator is left without secret.
    pub fn update_secret(&mut self, secret: impl AsRef<[u8]>) -> Result<(), Error> {
        self.replace_secret(Secret::from_base32(secret).map_err(Into::into))
    }

    /// Replace the secret with the given raw key bytes.
    ///
    /// If the key is empty or too long, the generator is left without secret.
    pub fn update_raw_secret(&mut self, raw: &[u8]) -> Result<(), Error> {
        self.replace_secret(Secret::from_bytes(raw).map_err(Into::into))
    }

    /// Replace the secret with an already decoded one.
    pub fn set_secret(&mut self, secret: Secret) {
        debug!("secret of {} bytes set", secret.len());
        self.secret = Some(secret);
    }

    /// Drop the current secret.
    pub fn clear_secret(&mut self) {
        debug!("secret cleared");
        self.secret = None;
    }

    fn replace_secret(&mut self, secret: Result<Secret, Error>) -> Result<(), Error> {
        match secret {
            Ok(secret) => {
                self.set_secret(secret);
                Ok(())
            }
            Err(e) => {
                warn!("secret rejected: {e}");
                self.clear_secret();
                Err(e)
            }
        }
    }

    /// The HOTP counter, the amount of full time steps since the Unix epoch.
    #[must_use]
    pub fn counter(&self, timestamp: u64) -> u64 {
        timestamp / self.step.get()
    }

    /// Seconds until the time step of the timestamp ends and the next code becomes current.
    #[must_use]
    pub fn remaining(&self, timestamp: u64) -> u64 {
        self.step.get() - timestamp % self.step.get()
    }

    /// Generate the code for the given Unix timestamp (in seconds).
    pub fn generate(&self, timestamp: u64) -> Result<Code, Error> {
        let secret = self.secret.as_ref().ok_or(Error::NoSecret)?;
        Ok(hotp(secret.expose_secret(), self.counter(timestamp)))
    }

    /// Generate the code for the given calendar time.
    pub fn generate_at(&self, time: &CalendarTime) -> Result<Code, Error> {
        let timestamp = time.to_timestamp();
        let timestamp = u64::try_from(timestamp).map_err(|_| Error::BeforeEpoch(timestamp))?;

        self.generate(timestamp)
    }

    /// Like [`Self::generate`], but returns [`Code::INVALID`] on failure.
    #[must_use]
    pub fn gen_code(&self, timestamp: u64) -> Code {
        self.generate(timestamp).unwrap_or(Code::INVALID)
    }

    /// Like [`Self::generate_at`], but returns [`Code::INVALID`] on failure.
    #[must_use]
    pub fn gen_code_at(&self, time: &CalendarTime) -> Code {
        self.generate_at(time).unwrap_or(Code::INVALID)
    }

    /// Replace the secret with the given Base32 one and generate a code with it. Returns
    /// [`Code::INVALID`] if the secret is invalid.
    pub fn gen_code_with(&mut self, secret: impl AsRef<[u8]>, timestamp: u64) -> Code {
        match self.update_secret(secret) {
            Ok(()) => self.gen_code(timestamp),
            Err(_) => Code::INVALID,
        }
    }

    /// Calendar based variant of [`Self::gen_code_with`].
    pub fn gen_code_with_at(&mut self, secret: impl AsRef<[u8]>, time: &CalendarTime) -> Code {
        match self.update_secret(secret) {
            Ok(()) => self.gen_code_at(time),
            Err(_) => Code::INVALID,
        }
    }

    /// Persist the current secret into the store, at the given offset.
    ///
    /// Nothing is written if there is no secret or the record wouldn't fit into the store.
    pub fn save_secret<S>(&self, store: &mut S, offset: usize) -> Result<(), Error>
    where
        S: SecretStore + ?Sized,
    {
        let secret = self.secret.as_ref().ok_or(Error::NoSecret)?;
        store::save_record(store, offset, secret).map_err(Into::into)
    }

    /// Replace the secret with the one stored at the given offset.
    ///
    /// If the record is missing, malformed or out of bounds, the generator is left without secret.
    pub fn load_secret<S>(&mut self, store: &mut S, offset: usize) -> Result<(), Error>
    where
        S: SecretStore + ?Sized,
    {
        self.replace_secret(store::load_record(store, offset).map_err(Into::into))
    }
}

/// Generate the HOTP code for a raw key and counter.
#[must_use]
pub fn hotp(key: &[u8], counter: u64) -> Code {
    let mut mac = Hmac::new(key);
    mac.update(counter.to_be_bytes());

    Code::new(truncate(&mac.finalize()) % MODULUS)
}

/// Dynamic truncation of RFC 4226, selecting 31 bits of the digest at an offset that is given by
/// the lowest 4 bits of its last byte.
#[must_use]
pub fn truncate(digest: &Digest) -> u32 {
    let bytes = &digest.0;
    let offset = (bytes[19] & 0xf) as usize;

    ((u32::from(bytes[offset]) & 0x7f) << 24)
        | (u32::from(bytes[offset + 1]) << 16)
        | (u32::from(bytes[offset + 2]) << 8)
        | u32::from(bytes[offset + 3])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tinytotp_core::{
        store::{check_range, RECORD_LEN},
        SECRET_CAPACITY,
    };

    use super::*;

    const RFC_SECRET: &[u8] = b"12345678901234567890";

    fn step(secs: u64) -> NonZeroU64 {
        NonZeroU64::new(secs).unwrap()
    }

    fn rfc_totp() -> Totp {
        Totp::from_secret(Secret::from_bytes(RFC_SECRET).unwrap(), DEFAULT_STEP)
    }

    #[test]
    fn truncate_rfc4226_example() {
        let digest = Digest([
            0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85, 0x50, 0xef, 0x7f, 0x19,
            0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
        ]);

        assert_eq!(0x50ef_7f19, truncate(&digest));
        assert_eq!(872_921, truncate(&digest) % MODULUS);
    }

    #[test]
    fn truncate_masks_sign_bit() {
        let mut raw = [0xff; 20];
        raw[19] = 0xf0;

        assert_eq!(0x7fff_ffff, truncate(&Digest(raw)));
    }

    #[test]
    fn hotp_rfc4226_vectors() {
        let expected = [
            755_224, 287_082, 359_152, 969_429, 338_314, 254_676, 287_922, 162_583, 399_871,
            520_489,
        ];

        for (counter, expected) in (0..).zip(expected) {
            assert_eq!(Code::new(expected), hotp(RFC_SECRET, counter));
        }
    }

    #[test]
    fn hotp_rfc4226_truncated_values() {
        let expected = [
            0x4c93_cf18,
            0x4139_7eea,
            0x082f_ef30,
            0x66ef_7655,
            0x61c5_938a,
            0x33c0_83d4,
            0x7256_c032,
            0x04e5_b397,
            0x2823_443f,
            0x2679_dc69,
        ];

        for (counter, expected) in (0_u64..).zip(expected) {
            let digest = Hmac::mac(RFC_SECRET, counter.to_be_bytes());
            assert_eq!(expected, truncate(&digest));
        }
    }

    #[test]
    fn totp_rfc6238_vectors() {
        let totp = rfc_totp();

        for (timestamp, expected) in [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ] {
            assert_eq!(expected, totp.gen_code(timestamp).to_string());
        }
    }

    #[test]
    fn base32_secret() {
        let totp = Totp::from_base32("base32secret3232", DEFAULT_STEP).unwrap();
        assert_eq!(Code::new(260_182), totp.gen_code(0));
        assert_eq!(Code::new(55_283), totp.gen_code(35));
        assert_eq!("055283", totp.gen_code(35).to_string());

        let totp = Totp::from_base32("base32secret3232", step(3600)).unwrap();
        assert_eq!(Code::new(260_182), totp.gen_code(7));

        let totp = Totp::from_base32("BASE-32SE CRET-3232", step(1)).unwrap();
        assert_eq!(Code::new(316_439), totp.gen_code(1401));
    }

    #[test]
    fn calendar_time() {
        let totp = rfc_totp();

        assert_eq!(
            "005924",
            totp.gen_code_at(&CalendarTime::utc(2009, 2, 13, 23, 31, 30))
                .to_string()
        );
        assert_eq!(
            "081804",
            totp.gen_code_at(&"2005-03-18T02:58:29+01:00".parse().unwrap())
                .to_string()
        );
        assert!(matches!(
            totp.generate_at(&CalendarTime::utc(1969, 12, 31, 23, 59, 59)),
            Err(Error::BeforeEpoch(-1))
        ));
        assert_eq!(
            Code::INVALID,
            totp.gen_code_at(&CalendarTime::utc(1960, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn no_secret() {
        let totp = Totp::new();

        assert!(!totp.has_secret());
        assert_eq!(Code::INVALID, totp.gen_code(59));
        assert_eq!("error", totp.gen_code(59).to_string());
        assert!(matches!(totp.generate(59), Err(Error::NoSecret)));
    }

    #[test]
    fn failed_update_clears_secret() {
        let mut totp = Totp::new();
        totp.update_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
        assert!(totp.has_secret());
        assert_eq!("287082", totp.gen_code(59).to_string());

        assert!(matches!(
            totp.update_secret("GEZDGNBVGY3TQOJQ!"),
            Err(Error::Decode(DecodeError::InvalidCharacter {
                character: '!',
                position: 16
            }))
        ));
        assert!(!totp.has_secret());
        assert_eq!(Code::INVALID, totp.gen_code(59));

        totp.update_raw_secret(RFC_SECRET).unwrap();
        assert_eq!("287082", totp.gen_code(59).to_string());

        assert!(matches!(
            totp.update_raw_secret(&[0; SECRET_CAPACITY + 1]),
            Err(Error::Secret(SecretError::TooLong { .. }))
        ));
        assert_eq!(Code::INVALID, totp.gen_code(59));
    }

    #[test]
    fn update_and_generate() {
        let mut totp = Totp::new();

        assert_eq!(
            "287082",
            totp.gen_code_with("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ", 59)
                .to_string()
        );
        assert_eq!(Code::INVALID, totp.gen_code_with("", 59));
        assert!(!totp.has_secret());
        assert_eq!(Code::INVALID, totp.gen_code_with("A".repeat(60), 59));

        assert_eq!(
            "005924",
            totp.gen_code_with_at(
                "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
                &CalendarTime::utc(2009, 2, 13, 23, 31, 30)
            )
            .to_string()
        );
    }

    #[test]
    fn step_boundaries() {
        let totp = rfc_totp();
        let start = 1_111_111_080;

        assert_eq!(0, start % totp.step());
        assert_eq!(totp.gen_code(start), totp.gen_code(start + 29));
        assert_eq!(totp.counter(start) + 1, totp.counter(start + 30));
        assert_eq!(30, totp.remaining(start));
        assert_eq!(1, totp.remaining(start + 29));
    }

    #[test]
    fn custom_step() {
        let totp = Totp::from_secret(Secret::from_bytes(RFC_SECRET).unwrap(), step(60));

        assert_eq!(60, totp.step());
        assert_eq!(hotp(RFC_SECRET, 1), totp.gen_code(119));
        assert_eq!(hotp(RFC_SECRET, 2), totp.gen_code(120));
    }

    /// Simple store on top of a vector, to exercise the persistence hooks.
    struct VecStore(Vec<u8>);

    impl SecretStore for VecStore {
        fn size(&self) -> usize {
            self.0.len()
        }

        fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), store::Error> {
            check_range(offset, buf.len(), self.size())?;
            buf.copy_from_slice(&self.0[offset..offset + buf.len()]);
            Ok(())
        }

        fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), store::Error> {
            check_range(offset, data.len(), self.size())?;
            self.0[offset..offset + data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    #[test]
    fn save_and_load() {
        let mut store = VecStore(vec![0xff; 2 * RECORD_LEN]);
        let totp = rfc_totp();

        totp.save_secret(&mut store, RECORD_LEN).unwrap();
        assert_eq!(20, store.0[RECORD_LEN]);

        let mut loaded = Totp::new();
        loaded.load_secret(&mut store, RECORD_LEN).unwrap();
        assert_eq!(totp.gen_code(59), loaded.gen_code(59));
    }

    #[test]
    fn save_without_secret() {
        let mut store = VecStore(vec![0xff; RECORD_LEN]);

        assert!(matches!(
            Totp::new().save_secret(&mut store, 0),
            Err(Error::NoSecret)
        ));
        assert_eq!(vec![0xff_u8; RECORD_LEN], store.0);
    }

    #[test]
    fn failed_load_clears_secret() {
        let mut store = VecStore(vec![0xff; RECORD_LEN]);
        let mut totp = rfc_totp();

        assert!(matches!(
            totp.load_secret(&mut store, 0),
            Err(Error::Store(store::Error::RecordTooLong { len: 255, .. }))
        ));
        assert!(!totp.has_secret());
        assert_eq!(Code::INVALID, totp.gen_code(59));
    }

    proptest! {
        #[test]
        fn codes_in_range(key in proptest::collection::vec(any::<u8>(), 1..=32), counter: u64) {
            let code = hotp(&key, counter);
            prop_assert!(code.value().map_or(false, |v| v < MODULUS));
            prop_assert_eq!(6, code.to_string().len());
        }

        #[test]
        fn same_code_within_step(timestamp in 0_u64..4_000_000_000, secs in 1_u64..600) {
            let totp = Totp::from_secret(Secret::from_bytes(RFC_SECRET).unwrap(), step(secs));
            let start = timestamp - timestamp % secs;

            prop_assert_eq!(totp.gen_code(start), totp.gen_code(timestamp));
            prop_assert_eq!(totp.gen_code(start), totp.gen_code(start + secs - 1));
            prop_assert_eq!(hotp(RFC_SECRET, timestamp / secs), totp.gen_code(timestamp));
        }
    }
}
