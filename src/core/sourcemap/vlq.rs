//! Base64 VLQ digits used by the `mappings` field.

use super::SourceMapError;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const CONTINUATION: i64 = 0b10_0000;
const DIGIT_MASK: i64 = 0b01_1111;

fn digit_value(byte: u8) -> Option<i64> {
    let value = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(i64::from(value))
}

pub fn encode(value: i64, out: &mut String) {
    let mut remaining = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = remaining & DIGIT_MASK;
        remaining >>= 5;
        if remaining > 0 {
            digit |= CONTINUATION;
        }
        out.push(char::from(ALPHABET[digit as usize]));
        if remaining == 0 {
            break;
        }
    }
}

/// Decode every value of one segment (the text between commas).
pub fn decode_segment(segment: &str) -> Result<Vec<i64>, SourceMapError> {
    let mut values = Vec::with_capacity(5);
    let mut accumulator: i64 = 0;
    let mut shift = 0u32;
    let mut pending = false;
    for byte in segment.bytes() {
        let digit = digit_value(byte).ok_or(SourceMapError::InvalidDigit(char::from(byte)))?;
        if shift > 60 {
            return Err(SourceMapError::Overflow);
        }
        accumulator += (digit & DIGIT_MASK) << shift;
        if digit & CONTINUATION != 0 {
            shift += 5;
            pending = true;
            continue;
        }
        let negative = accumulator & 1 == 1;
        let magnitude = accumulator >> 1;
        values.push(if negative { -magnitude } else { magnitude });
        accumulator = 0;
        shift = 0;
        pending = false;
    }
    if pending {
        return Err(SourceMapError::Truncated(segment.to_string()));
    }
    Ok(values)
}
