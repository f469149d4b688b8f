//! Ascii85 codec for binary sections
//!
//! Plain ascii85 without the `<~ ~>` Adobe framing: every 4-byte group becomes
//! five characters in `!`..=`u`, an all-zero group becomes `z`, and a trailing
//! partial group is emitted with only as many characters as it needs (bytes + 1).
//! The alphabet contains neither `~` nor a newline, so encoded data can never
//! form a section marker.

use thiserror::Error;

const FIRST: u8 = b'!';
const LAST: u8 = b'u';
const ZERO_GROUP: u8 = b'z';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ascii85Error {
    #[error("invalid ascii85 character {0:?} at offset {1}")]
    InvalidCharacter(char, usize),
    #[error("'z' inside an ascii85 group at offset {0}")]
    MisplacedZero(usize),
    #[error("ascii85 group overflows 32 bits at offset {0}")]
    Overflow(usize),
    #[error("truncated ascii85 group at end of data")]
    Truncated,
}

/// Encode `data`, inserting a newline after every `wrap_column` characters.
/// A `wrap_column` of 0 disables wrapping. No trailing newline is added.
pub fn encode(data: &[u8], wrap_column: usize) -> String {
    let mut raw = Vec::with_capacity(data.len().div_ceil(4) * 5);
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut word = u32::from_be_bytes(group);
        if word == 0 && chunk.len() == 4 {
            raw.push(ZERO_GROUP);
            continue;
        }
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = FIRST + (word % 85) as u8;
            word /= 85;
        }
        raw.extend_from_slice(&digits[..chunk.len() + 1]);
    }

    if wrap_column == 0 || raw.len() <= wrap_column {
        return raw.into_iter().map(char::from).collect();
    }
    let mut out = String::with_capacity(raw.len() + raw.len() / wrap_column);
    for (i, line) in raw.chunks(wrap_column).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.extend(line.iter().copied().map(char::from));
    }
    out
}

/// Decode ascii85 text. ASCII whitespace is skipped.
pub fn decode(text: &str) -> Result<Vec<u8>, Ascii85Error> {
    let mut out = Vec::with_capacity(text.len() / 5 * 4);
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    for (offset, byte) in text.bytes().enumerate() {
        match byte {
            FIRST..=LAST => {
                group[filled] = byte - FIRST;
                filled += 1;
                if filled == 5 {
                    out.extend_from_slice(&decode_group(&group, offset)?);
                    filled = 0;
                }
            }
            ZERO_GROUP => {
                if filled != 0 {
                    return Err(Ascii85Error::MisplacedZero(offset));
                }
                out.extend_from_slice(&[0; 4]);
            }
            b' ' | b'\t' | b'\n' | b'\r' | 0x0B => continue,
            _ => {
                let ch = text[offset..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                return Err(Ascii85Error::InvalidCharacter(ch, offset));
            }
        }
    }

    match filled {
        0 => {}
        1 => return Err(Ascii85Error::Truncated),
        n => {
            // pad with the highest digit so the kept bytes round correctly
            for digit in group.iter_mut().skip(n) {
                *digit = LAST - FIRST;
            }
            let bytes = decode_group(&group, text.len())?;
            out.extend_from_slice(&bytes[..n - 1]);
        }
    }
    Ok(out)
}

fn decode_group(digits: &[u8; 5], offset: usize) -> Result<[u8; 4], Ascii85Error> {
    let mut acc: u64 = 0;
    for &digit in digits {
        acc = acc * 85 + u64::from(digit);
    }
    u32::try_from(acc)
        .map(u32::to_be_bytes)
        .map_err(|_| Ascii85Error::Overflow(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        // reference values as produced by the common ascii85 implementations
        assert_eq!(encode(b"", 80), "");
        assert_eq!(encode(b"Man ", 80), "9jqo^");
        assert_eq!(encode(b"sure", 80), "F*2M7");
        assert_eq!(encode(b".", 80), "/c");
        assert_eq!(encode(&[0, 0, 0, 0], 80), "z");
        assert_eq!(encode(&[0, 0, 0], 80), "!!!!");
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode("9jqo^").unwrap(), b"Man ");
        assert_eq!(decode("/c").unwrap(), b".");
        assert_eq!(decode("z!!!!").unwrap(), vec![0; 7]);
    }

    #[test]
    fn test_wrapping() {
        let data: Vec<u8> = (0..=255u8).collect();
        let encoded = encode(&data, 80);
        let lines: Vec<&str> = encoded.split('\n').collect();
        assert!(lines.len() > 1);
        assert!(lines[..lines.len() - 1].iter().all(|l| l.len() == 80));
        assert!(!encoded.ends_with('\n'));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_no_tilde_or_blank_lines() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();
        let encoded = encode(&data, 80);
        assert!(!encoded.contains('~'));
        assert!(!encoded.contains("\n\n"));
    }

    #[test]
    fn test_partial_groups_roundtrip() {
        for len in 0..12 {
            let data: Vec<u8> = (0..len).map(|i| 0xF0u8.wrapping_add(i)).collect();
            assert_eq!(decode(&encode(&data, 0)).unwrap(), data, "length {}", len);
        }
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode("9jqo~"), Err(Ascii85Error::InvalidCharacter('~', 4)));
        assert_eq!(decode("9jz"), Err(Ascii85Error::MisplacedZero(2)));
        assert_eq!(decode("uuuuu"), Err(Ascii85Error::Overflow(4)));
        assert_eq!(decode("9jqo^9"), Err(Ascii85Error::Truncated));
    }
}
