//! # tinytotp Core
//!
//! Core component of **tinytotp** that is shared between all other components and serves as
//! building block. It holds the decoded [`Secret`], the Base32 decoder that produces it, the
//! generated [`Code`] and the small helpers around them that don't need any cryptography.
//!
//! Decoding secrets and working with codes never allocates. Those buffers are fixed in size and
//! every capacity violation is reported as an error instead of growing storage. Only parsing a
//! [`CalendarTime`] from text allocates, for its error.

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::inline_always,
    clippy::missing_errors_doc
)]

use std::fmt::{self, Display};

pub use self::{
    secret::{Secret, SecretError, SECRET_CAPACITY},
    store::SecretStore,
    time::{to_timestamp, CalendarTime, ParseTimeError},
};

pub mod base32;
mod secret;
pub mod store;
mod time;

/// Amount of digits every generated code has.
pub const DIGITS: u32 = 6;

/// Upper bound (exclusive) of valid code values, `10^DIGITS`.
pub const MODULUS: u32 = 10_u32.pow(DIGITS);

/// A generated one-time code, or the distinguished invalid value that is produced when no secret
/// was available to generate it.
///
/// Valid codes are always in the range `0..=999_999`. Call `to_string()` to get the code in its
/// final six digit form, including leading zeroes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Code(i32);

impl Code {
    /// The sentinel returned when a code couldn't be generated.
    pub const INVALID: Self = Self(-1);

    /// Token that [`Display`] prints for [`Self::INVALID`].
    pub const INVALID_TOKEN: &'static str = "error";

    /// Create a code from an already reduced value. Values outside of the valid range are folded
    /// into it, so the result is always a valid code.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn new(value: u32) -> Self {
        Self((value % MODULUS) as i32)
    }

    #[inline(always)]
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// The numeric value of the code, or [`None`] for [`Self::INVALID`].
    #[must_use]
    pub fn value(self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }

    /// The raw representation, `-1` for [`Self::INVALID`].
    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl Default for Code {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<Option<u32>> for Code {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Self::INVALID, Self::new)
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{:0>1$}", value, DIGITS as usize),
            None => f.write_str(Self::INVALID_TOKEN),
        }
    }
}
