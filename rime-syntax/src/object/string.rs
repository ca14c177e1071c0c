//! Strings.
//!
//! A PDF string is stored either as hex digits (`<48656C6C6F>`) or as a literal
//! with escapes (`(Hello)`). Both forms keep an optional back-reference to the
//! indirect object that contains them, which is needed to derive the
//! per-object key when the document is encrypted.

use crate::crypto::SecurityManager;
use crate::error::Result;
use crate::object::ObjRef;
use crate::reader::Reader;
use log::warn;
use std::sync::Arc;

/// A string stored as hexadecimal digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HexString {
    digits: Arc<[u8]>,
    owner: Option<ObjRef>,
}

impl HexString {
    /// Create a hex string from the text between the angle brackets.
    ///
    /// Characters that are not hexadecimal digits are dropped.
    pub fn new(raw: &[u8]) -> Self {
        let digits = raw
            .iter()
            .copied()
            .filter(u8::is_ascii_hexdigit)
            .collect::<Vec<_>>();

        Self {
            digits: digits.into(),
            owner: None,
        }
    }

    /// Create a hex string holding the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            digits: encode_hex(bytes).into(),
            owner: None,
        }
    }

    /// The normalized hexadecimal digits.
    ///
    /// The digits are padded with a trailing `0` to an even length. Strings of
    /// more than one byte are further padded with `00` to a multiple of four
    /// digits so that UTF-16 code units stay intact.
    pub fn hex_string(&self) -> String {
        // All digits are ASCII.
        normalize_hex(&self.digits)
            .into_iter()
            .map(char::from)
            .collect()
    }

    /// The decoded payload, without the UTF-16 alignment padding.
    pub fn bytes(&self) -> Vec<u8> {
        let mut digits = self.digits.to_vec();

        if !digits.len().is_multiple_of(2) {
            digits.push(b'0');
        }

        decode_hex_pairs(&digits)
    }

    /// The decoded text.
    ///
    /// When the digits start with the byte order mark `FEFF`, they are read in
    /// groups of four as UTF-16 code units. Otherwise every pair of digits is one
    /// character.
    pub fn literal_string(&self) -> String {
        let normalized = normalize_hex(&self.digits);

        if normalized.len() >= 4 && normalized[..4].eq_ignore_ascii_case(b"FEFF") {
            let units = normalized[4..]
                .chunks_exact(4)
                .map(|c| (hex_digit(c[0]) << 12 | hex_digit(c[1]) << 8 | hex_digit(c[2]) << 4 | hex_digit(c[3])) as u16);

            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        } else {
            decode_hex_pairs(&normalized)
                .into_iter()
                .map(char::from)
                .collect()
        }
    }

    /// Parse `len` hex digits starting at digit `start` as an unsigned integer.
    ///
    /// Returns 0 if the range is out of bounds.
    pub fn unsigned_int(&self, start: usize, len: usize) -> u32 {
        let normalized = normalize_hex(&self.digits);

        let Some(digits) = start
            .checked_add(len)
            .and_then(|end| normalized.get(start..end))
        else {
            return 0;
        };

        if len > 8 {
            warn!("hex substring of {len} digits overflows an unsigned 32-bit integer");

            return 0;
        }

        digits
            .iter()
            .fold(0_u32, |acc, d| acc << 4 | hex_digit(*d))
    }
}

/// A string stored as a literal, with escape sequences already resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LiteralString {
    data: Arc<[u8]>,
    owner: Option<ObjRef>,
}

impl LiteralString {
    /// Create a literal string from already unescaped bytes.
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: data.into(),
            owner: None,
        }
    }

    /// Create a literal string from the raw text between the parentheses,
    /// resolving escape sequences and line continuations.
    pub fn from_escaped(raw: &[u8]) -> Self {
        Self::new(&unescape(raw))
    }

    /// The bytes of the string as uppercase hexadecimal digits.
    pub fn hex_string(&self) -> String {
        encode_hex(&self.data).into_iter().map(char::from).collect()
    }

    /// The bytes of the string.
    pub fn bytes(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// The decoded text.
    pub fn literal_string(&self) -> String {
        decode_text(&self.data)
    }

    /// Read `len` bytes starting at `start` as a big-endian unsigned integer.
    ///
    /// Returns 0 if the range is out of bounds.
    pub fn unsigned_int(&self, start: usize, len: usize) -> u32 {
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .map(|b| b.iter().fold(0_u32, |acc, b| acc << 8 | *b as u32))
            .unwrap_or(0)
    }
}

/// A PDF string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PdfString {
    /// A string written as hexadecimal digits.
    Hex(HexString),
    /// A string written as a literal.
    Literal(LiteralString),
}

impl PdfString {
    /// The string as normalized hexadecimal digits.
    pub fn hex_string(&self) -> String {
        match self {
            Self::Hex(h) => h.hex_string(),
            Self::Literal(l) => l.hex_string(),
        }
    }

    /// The decoded text of the string, without decryption.
    pub fn literal_string(&self) -> String {
        match self {
            Self::Hex(h) => h.literal_string(),
            Self::Literal(l) => l.literal_string(),
        }
    }

    /// The raw payload bytes of the string, without decryption.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Self::Hex(h) => h.bytes(),
            Self::Literal(l) => l.bytes(),
        }
    }

    /// Read a sub-range of the string as an unsigned integer.
    ///
    /// For hex strings `start` and `len` count hex digits, for literal strings
    /// they count bytes.
    pub fn unsigned_int(&self, start: usize, len: usize) -> u32 {
        match self {
            Self::Hex(h) => h.unsigned_int(start, len),
            Self::Literal(l) => l.unsigned_int(start, len),
        }
    }

    /// The indirect object this string is contained in, if known.
    pub fn owner(&self) -> Option<ObjRef> {
        match self {
            Self::Hex(h) => h.owner,
            Self::Literal(l) => l.owner,
        }
    }

    /// Returns the same string, attributed to the given indirect object.
    pub fn with_owner(mut self, owner: ObjRef) -> Self {
        match &mut self {
            Self::Hex(h) => h.owner = Some(owner),
            Self::Literal(l) => l.owner = Some(owner),
        }

        self
    }

    /// The payload, decrypted with the per-object key of the owning object.
    ///
    /// Without a security manager or without an owner, the payload is returned
    /// as is.
    pub fn decrypted_bytes(&self, security: Option<&SecurityManager>) -> Result<Vec<u8>> {
        match (security, self.owner()) {
            (Some(security), Some(owner)) => {
                let key = security.decryption_key()?;
                security.decrypt(owner, key, &self.bytes())
            }
            _ => Ok(self.bytes()),
        }
    }

    /// The decoded text of the string, decrypted with the per-object key.
    ///
    /// Both a security manager and the owning object reference are needed for
    /// decryption. If either is missing, this is the same as
    /// [`PdfString::literal_string`].
    pub fn decrypted_literal_string(&self, security: Option<&SecurityManager>) -> Result<String> {
        match (security, self.owner()) {
            (Some(_), Some(_)) => Ok(decode_text(&self.decrypted_bytes(security)?)),
            _ => Ok(self.literal_string()),
        }
    }
}

impl From<HexString> for PdfString {
    fn from(value: HexString) -> Self {
        Self::Hex(value)
    }
}

impl From<LiteralString> for PdfString {
    fn from(value: LiteralString) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for PdfString {
    fn from(value: &str) -> Self {
        Self::Literal(LiteralString::new(value.as_bytes()))
    }
}

/// Decode text bytes, either as UTF-16BE (with a byte order mark) or byte by byte.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]));

        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        bytes.iter().copied().map(char::from).collect()
    }
}

fn normalize_hex(digits: &[u8]) -> Vec<u8> {
    let mut normalized = digits.to_vec();

    if !normalized.len().is_multiple_of(2) {
        normalized.push(b'0');
    }

    if normalized.len() > 2 && !normalized.len().is_multiple_of(4) {
        normalized.extend_from_slice(b"00");
    }

    normalized
}

#[inline]
fn hex_digit(c: u8) -> u32 {
    match c {
        b'0'..=b'9' => (c - b'0') as u32,
        b'a'..=b'f' => (c - b'a' + 10) as u32,
        b'A'..=b'F' => (c - b'A' + 10) as u32,
        _ => 0,
    }
}

fn decode_hex_pairs(digits: &[u8]) -> Vec<u8> {
    digits
        .chunks_exact(2)
        .map(|c| (hex_digit(c[0]) << 4 | hex_digit(c[1])) as u8)
        .collect()
}

fn encode_hex(bytes: &[u8]) -> Vec<u8> {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

    bytes
        .iter()
        .flat_map(|b| [DIGITS[(b >> 4) as usize], DIGITS[(b & 0xF) as usize]])
        .collect()
}

fn is_octal_digit(byte: u8) -> bool {
    matches!(byte, b'0'..=b'7')
}

fn unescape(raw: &[u8]) -> Vec<u8> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut r = Reader::new(raw);

    while let Some(byte) = r.read_byte() {
        match byte {
            b'\\' => {
                let Some(next) = r.read_byte() else {
                    break;
                };

                if is_octal_digit(next) {
                    let mut value = (next - b'0') as u16;

                    for _ in 0..2 {
                        match r.peek_byte() {
                            Some(d) if is_octal_digit(d) => {
                                value = value * 8 + (d - b'0') as u16;
                                r.forward();
                            }
                            _ => break,
                        }
                    }

                    if value > 0xFF {
                        warn!("overflow occurred while parsing octal literal string");
                    }

                    cleaned.push(value as u8);
                } else {
                    match next {
                        b'n' => cleaned.push(0xA),
                        b'r' => cleaned.push(0xD),
                        b't' => cleaned.push(0x9),
                        b'b' => cleaned.push(0x8),
                        b'f' => cleaned.push(0xC),
                        // Line continuation.
                        b'\r' => {
                            let _ = r.forward_tag(b"\n");
                        }
                        b'\n' => {}
                        _ => cleaned.push(next),
                    }
                }
            }
            // An unescaped end-of-line marker is always a single line feed.
            b'\r' => {
                let _ = r.forward_tag(b"\n");
                cleaned.push(b'\n');
            }
            other => cleaned.push(other),
        }
    }

    cleaned
}
