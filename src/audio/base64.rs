//! Self-contained base64 codec.
//!
//! The byte sequences are raw audio frames that must round-trip
//! exactly, so the codec is implemented here rather than pulled in as
//! a dependency: standard alphabet, three bytes in, four symbols out,
//! `=` padding on the final group.

use thiserror::Error;

const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Base64Error {
    #[error("invalid base64 symbol {0:?}")]
    InvalidSymbol(char),
    #[error("invalid base64 length {0}")]
    InvalidLength(usize),
}

/// Encode raw bytes to base64.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let a = chunk[0];
        let b = chunk.get(1).copied();
        let c = chunk.get(2).copied();

        out.push(ALPHABET[(a >> 2) as usize] as char);
        out.push(ALPHABET[(((a & 0x03) << 4) | (b.unwrap_or(0) >> 4)) as usize] as char);
        out.push(match b {
            Some(b) => ALPHABET[(((b & 0x0f) << 2) | (c.unwrap_or(0) >> 6)) as usize] as char,
            None => '=',
        });
        out.push(match c {
            Some(c) => ALPHABET[(c & 0x3f) as usize] as char,
            None => '=',
        });
    }
    out
}

/// Decode a base64 string back to raw bytes.
pub fn decode(input: &str) -> Result<Vec<u8>, Base64Error> {
    let trimmed = input.trim_end_matches('=');
    // One '=' trims to 4k+3 symbols, two trim to 4k+2; 4k+1 is never valid.
    if trimmed.len() % 4 == 1 {
        return Err(Base64Error::InvalidLength(input.len()));
    }

    let mut out = Vec::with_capacity(trimmed.len() * 3 / 4);
    let mut acc: u32 = 0;
    let mut bits = 0u8;
    for ch in trimmed.chars() {
        let value = symbol_value(ch).ok_or(Base64Error::InvalidSymbol(ch))?;
        acc = (acc << 6) | u32::from(value);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    Ok(out)
}

fn symbol_value(ch: char) -> Option<u8> {
    match ch {
        'A'..='Z' => Some(ch as u8 - b'A'),
        'a'..='z' => Some(ch as u8 - b'a' + 26),
        '0'..='9' => Some(ch as u8 - b'0' + 52),
        '+' => Some(62),
        '/' => Some(63),
        _ => None,
    }
}
