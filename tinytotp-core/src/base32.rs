//! Decoding of Base32 ([RFC 4648]) encoded secrets into raw bytes.
//!
//! Only the decoding direction is supported as secrets are always handed to us in text form. The
//! decoder is lenient about the way humans tend to write secrets down: letters are accepted in any
//! case and spaces, tabs, line breaks and dashes between characters are ignored. Padding (`=`) is
//! **not** accepted.
//!
//! [RFC 4648]: https://datatracker.ietf.org/doc/html/rfc4648

const BITS_PER_CHAR: usize = 5;
const BITS_PER_BYTE: usize = 8;

/// Errors that can occur while decoding Base32 text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The input was empty or didn't contain enough characters to form a single byte.
    #[error("the input doesn't contain any data")]
    Empty,
    /// A character outside the Base32 alphabet (and outside the ignored separators) was found.
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    /// The decoded data doesn't fit into the output buffer.
    #[error("the decoded data exceeds the capacity of {capacity} bytes")]
    Capacity { capacity: usize },
}

/// Upper bound of bytes that decoding `input_len` characters may produce. Separators count as
/// characters here, which makes this an estimate that is never too small.
#[must_use]
pub fn decoded_len_bound(input_len: usize) -> usize {
    (input_len + 7) / 8 * BITS_PER_CHAR
}

/// Decode the Base32 `input` into `output`, returning the amount of bytes written.
///
/// The length of `output` is the capacity. Inputs that could possibly decode into more bytes than
/// that are rejected before decoding even starts, so the actual content is only looked at if it
/// may fit. Trailing bits that don't form a full byte are dropped.
///
/// On error, nothing of the partially decoded data must be considered valid.
pub fn decode(input: &[u8], output: &mut [u8]) -> Result<usize, DecodeError> {
    if input.is_empty() {
        return Err(DecodeError::Empty);
    }

    if decoded_len_bound(input.len()) > output.len() {
        return Err(DecodeError::Capacity {
            capacity: output.len(),
        });
    }

    decode_unchecked(input, output)
}

/// The decoding loop without any up-front size check. Capacity is still enforced for every byte
/// that is emitted.
fn decode_unchecked(input: &[u8], output: &mut [u8]) -> Result<usize, DecodeError> {
    let mut buffer = 0_u32;
    let mut bits_left = 0;
    let mut count = 0;

    for (position, &ch) in input.iter().enumerate() {
        if is_separator(ch) {
            continue;
        }

        let value = value_of(ch).ok_or(DecodeError::InvalidCharacter {
            character: char::from(ch),
            position,
        })?;

        // Only the lowest 12 bits are ever relevant, older bits were already emitted.
        buffer = ((buffer << BITS_PER_CHAR) | u32::from(value)) & 0xfff;
        bits_left += BITS_PER_CHAR;

        if bits_left >= BITS_PER_BYTE {
            let slot = output.get_mut(count).ok_or(DecodeError::Capacity { capacity: count })?;

            bits_left -= BITS_PER_BYTE;
            *slot = (buffer >> bits_left) as u8;
            count += 1;
        }
    }

    if count == 0 {
        return Err(DecodeError::Empty);
    }

    Ok(count)
}

#[inline(always)]
fn is_separator(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\r' | b'\n' | b'-')
}

/// Look up the 5-bit value of a single Base32 character.
#[inline(always)]
fn value_of(ch: u8) -> Option<u8> {
    match ch {
        b'A'..=b'Z' | b'a'..=b'z' => Some((ch & 0x1f) - 1),
        b'2'..=b'7' => Some(ch - b'2' + 26),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn decode_vec(input: &str, capacity: usize) -> Result<Vec<u8>, DecodeError> {
        let mut out = vec![0; capacity];
        let len = decode(input.as_bytes(), &mut out)?;
        out.truncate(len);
        Ok(out)
    }

    #[test]
    fn rfc4648_vectors() {
        // Padding stripped, as it isn't supported.
        assert_eq!(b"f".to_vec(), decode_vec("MY", 32).unwrap());
        assert_eq!(b"fo".to_vec(), decode_vec("MZXQ", 32).unwrap());
        assert_eq!(b"foo".to_vec(), decode_vec("MZXW6", 32).unwrap());
        assert_eq!(b"foob".to_vec(), decode_vec("MZXW6YQ", 32).unwrap());
        assert_eq!(b"fooba".to_vec(), decode_vec("MZXW6YTB", 32).unwrap());
        assert_eq!(b"foobar".to_vec(), decode_vec("MZXW6YTBOI", 32).unwrap());
    }

    #[test]
    fn ignores_case_and_separators() {
        let expect = b"Hello!\xde\xad\xbe\xef".to_vec();

        assert_eq!(expect, decode_vec("JBSWY3DPEHPK3PXP", 32).unwrap());
        assert_eq!(expect, decode_vec("jbswy3dpehpk3pxp", 32).unwrap());
        assert_eq!(expect, decode_vec("jbsw y3dp-ehpk\t3pxp\r\n", 32).unwrap());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(
            Err(DecodeError::InvalidCharacter {
                character: '=',
                position: 2
            }),
            decode_vec("MY======", 32)
        );
        assert_eq!(
            Err(DecodeError::InvalidCharacter {
                character: '1',
                position: 0
            }),
            decode_vec("1BSWY3DP", 32)
        );
        assert_eq!(
            Err(DecodeError::InvalidCharacter {
                character: '8',
                position: 4
            }),
            decode_vec("JBSW8", 32)
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Err(DecodeError::Empty), decode_vec("", 32));
        assert_eq!(Err(DecodeError::Empty), decode_vec(" - \n", 32));
        // A single character carries only 5 bits, not enough for a byte.
        assert_eq!(Err(DecodeError::Empty), decode_vec("A", 32));
    }

    #[test]
    fn capacity_precheck() {
        assert_eq!(30, decoded_len_bound(48));
        assert_eq!(35, decoded_len_bound(49));

        let long = "A".repeat(49);
        assert_eq!(
            Err(DecodeError::Capacity { capacity: 32 }),
            decode_vec(&long, 32)
        );
        assert_eq!(vec![0_u8; 30], decode_vec(&"A".repeat(48), 32).unwrap());
    }

    #[test]
    fn capacity_during_decoding() {
        let mut out = [0; 2];
        assert_eq!(
            Err(DecodeError::Capacity { capacity: 2 }),
            decode_unchecked(b"MZXW6", &mut out)
        );

        let mut out = [0; 3];
        assert_eq!(Ok(3), decode_unchecked(b"MZXW6", &mut out));
        assert_eq!(b"foo", &out);
    }

    proptest! {
        #[test]
        fn matches_reference(data in proptest::collection::vec(any::<u8>(), 1..=30)) {
            let encoded = data_encoding::BASE32_NOPAD.encode(&data);
            let mut out = [0; 32];

            let len = decode(encoded.as_bytes(), &mut out).unwrap();
            prop_assert_eq!(&data[..], &out[..len]);

            let lower = encoded.to_lowercase();
            let len = decode(lower.as_bytes(), &mut out).unwrap();
            prop_assert_eq!(&data[..], &out[..len]);
        }

        #[test]
        fn deterministic(input in "[A-Za-z2-7 -]{0,40}") {
            let mut first = [0; 32];
            let mut second = [0; 32];

            let a = decode(input.as_bytes(), &mut first);
            let b = decode(input.as_bytes(), &mut second);

            prop_assert_eq!(a, b);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn rejects_outside_alphabet(
            prefix in "[A-Z2-7]{0,10}",
            bad in any::<char>().prop_filter("outside alphabet", |c| {
                !(c.is_ascii_alphabetic() || ('2'..='7').contains(c) || " \t\r\n-".contains(*c))
            }),
        ) {
            let input = format!("{prefix}{bad}");
            let mut out = [0; 32];

            let result = decode(input.as_bytes(), &mut out);
            prop_assert!(
                matches!(
                    result,
                    Err(DecodeError::InvalidCharacter { .. } | DecodeError::Capacity { .. })
                ),
                "unexpected result {:?}",
                result
            );
        }
    }
}
