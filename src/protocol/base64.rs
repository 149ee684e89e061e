//! Base64 transcoding for page payloads and responses
//!
//! Standard alphabet (`A-Z a-z 0-9 + /`) with `=` padding. Decoding always
//! writes into a caller-owned buffer distinct from the input.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: u8 = b'=';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base64Error {
    /// Character outside the alphabet, or padding in the wrong place
    InvalidCharacter { position: usize },
    /// Input is not a whole number of 4-character groups
    Truncated { length: usize },
    /// Decoded data does not fit the output buffer
    Overflow,
}

pub type Result<T> = core::result::Result<T, Base64Error>;

/// Number of characters `len` bytes encode to, padding included.
pub const fn encoded_len(len: usize) -> usize {
    (len + 2) / 3 * 4
}

/// Upper bound of bytes `len` characters can decode to.
pub const fn decoded_capacity(len: usize) -> usize {
    len / 4 * 3
}

#[inline]
fn sextet_char(value: u8) -> u8 {
    ALPHABET[(value & 0x3f) as usize]
}

#[inline]
fn char_sextet(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'Z' => Some(c - b'A'),
        b'a'..=b'z' => Some(c - b'a' + 26),
        b'0'..=b'9' => Some(c - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Encode `bytes`, handing each output character to `emit`.
pub fn encode_with<I, F>(bytes: I, mut emit: F)
where
    I: IntoIterator<Item = u8>,
    F: FnMut(u8),
{
    let mut group = [0u8; 3];
    let mut filled = 0;

    for byte in bytes {
        group[filled] = byte;
        filled += 1;
        if filled == 3 {
            emit(sextet_char(group[0] >> 2));
            emit(sextet_char(group[0] << 4 | group[1] >> 4));
            emit(sextet_char(group[1] << 2 | group[2] >> 6));
            emit(sextet_char(group[2]));
            filled = 0;
        }
    }

    match filled {
        1 => {
            emit(sextet_char(group[0] >> 2));
            emit(sextet_char(group[0] << 4));
            emit(PAD);
            emit(PAD);
        }
        2 => {
            emit(sextet_char(group[0] >> 2));
            emit(sextet_char(group[0] << 4 | group[1] >> 4));
            emit(sextet_char(group[1] << 2));
            emit(PAD);
        }
        _ => {}
    }
}

/// Encode `bytes` into `output`, returning the number of characters written.
pub fn encode(bytes: &[u8], output: &mut [u8]) -> Result<usize> {
    let len = encoded_len(bytes.len());
    if len > output.len() {
        return Err(Base64Error::Overflow);
    }
    let mut written = 0;
    encode_with(bytes.iter().copied(), |c| {
        output[written] = c;
        written += 1;
    });
    Ok(written)
}

/// Decode `text` into `output`, returning the number of bytes produced.
///
/// Characters are checked group by group, so a bad character is reported
/// at its position even when the input also ends in a partial group.
pub fn decode(text: &[u8], output: &mut [u8]) -> Result<usize> {
    let groups = (text.len() + 3) / 4;
    let mut written = 0;

    for (index, chunk) in text.chunks(4).enumerate() {
        let base = index * 4;
        let last = index + 1 == groups;

        let mut sextets = [0u8; 4];
        let mut padding = 0;
        for (k, &c) in chunk.iter().enumerate() {
            if c == PAD && last && k >= 2 {
                padding += 1;
                continue;
            }
            // data after a pad character, e.g. "AA=A"
            if padding > 0 {
                return Err(Base64Error::InvalidCharacter { position: base + k });
            }
            sextets[k] = char_sextet(c).ok_or(Base64Error::InvalidCharacter { position: base + k })?;
        }
        if chunk.len() < 4 {
            return Err(Base64Error::Truncated { length: text.len() });
        }

        let produced = 3 - padding;
        if written + produced > output.len() {
            return Err(Base64Error::Overflow);
        }

        let bytes = [
            sextets[0] << 2 | sextets[1] >> 4,
            sextets[1] << 4 | sextets[2] >> 2,
            sextets[2] << 6 | sextets[3],
        ];
        output[written..written + produced].copy_from_slice(&bytes[..produced]);
        written += produced;
    }

    Ok(written)
}
