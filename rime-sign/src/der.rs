//! Reading DER encoded elements.
//!
//! Only the subset needed for CMS signatures is supported. Indefinite lengths,
//! which some signers emit for the outer structures, are accepted for
//! constructed elements.

use crate::error::DerError;
use crate::oid::ObjectIdentifier;
use crate::time::DateTime;

pub(crate) const INTEGER: u8 = 0x02;
pub(crate) const OCTET_STRING: u8 = 0x04;
pub(crate) const OBJECT_IDENTIFIER: u8 = 0x06;
pub(crate) const UTF8_STRING: u8 = 0x0C;
pub(crate) const PRINTABLE_STRING: u8 = 0x13;
pub(crate) const T61_STRING: u8 = 0x14;
pub(crate) const IA5_STRING: u8 = 0x16;
pub(crate) const UTC_TIME: u8 = 0x17;
pub(crate) const GENERALIZED_TIME: u8 = 0x18;
pub(crate) const BMP_STRING: u8 = 0x1E;
pub(crate) const SEQUENCE: u8 = 0x30;
pub(crate) const SET: u8 = 0x31;

const CONSTRUCTED: u8 = 0x20;
const MAX_DEPTH: usize = 64;

/// The tag of a constructed, context-specific element like `[0]`.
pub(crate) const fn context(number: u8) -> u8 {
    0xA0 | number
}

type Result<T> = core::result::Result<T, DerError>;

/// A single encoded element.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    tag: u8,
    raw: &'a [u8],
    contents: &'a [u8],
}

impl<'a> Element<'a> {
    /// Parse the element at the start of `data`. Trailing bytes are ignored,
    /// since signatures are stored in zero-padded placeholders.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        read(data, 0).map(|(element, _)| element)
    }

    /// The identifier octet.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The whole encoding, including the header.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// The contents octets.
    pub fn contents(&self) -> &'a [u8] {
        self.contents
    }

    /// Whether the element consists of other elements.
    pub fn is_constructed(&self) -> bool {
        self.tag & CONSTRUCTED != 0
    }

    /// Return the element if it has the given tag.
    pub fn expect(self, tag: u8) -> Result<Self> {
        if self.tag == tag {
            Ok(self)
        } else {
            Err(DerError::UnexpectedTag {
                expected: tag,
                found: self.tag,
            })
        }
    }

    /// The elements contained in this one.
    pub fn children(&self) -> Children<'a> {
        Children {
            data: self.contents,
        }
    }

    /// The contained elements, collected.
    pub fn child_vec(&self) -> Result<Vec<Self>> {
        self.children().collect()
    }

    /// The element wrapped by an explicit tag `[number]`.
    pub fn explicit(&self, number: u8) -> Result<Self> {
        Self::parse(self.expect(context(number))?.contents)
    }

    /// The value of an integer that fits into 32 unsigned bits.
    pub fn small_integer(&self) -> Result<u32> {
        let contents = self.expect(INTEGER)?.contents;

        if contents.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(DerError::InvalidInteger);
        }

        let bytes = self.integer()?;

        if bytes.len() > 4 {
            return Err(DerError::InvalidInteger);
        }

        Ok(bytes.iter().fold(0, |acc, b| (acc << 8) | u32::from(*b)))
    }

    /// The minimal big-endian bytes of an integer.
    pub fn integer(&self) -> Result<&'a [u8]> {
        let contents = self.expect(INTEGER)?.contents;

        if contents.is_empty() {
            return Err(DerError::InvalidInteger);
        }

        Ok(strip_leading_zeros(contents))
    }

    /// The value of an object identifier.
    pub fn object_identifier(&self) -> Result<ObjectIdentifier> {
        ObjectIdentifier::from_der(self.expect(OBJECT_IDENTIFIER)?.contents)
    }

    /// The bytes of an octet string. Constructed octet strings are joined.
    pub fn octets(&self) -> Result<Vec<u8>> {
        match self.tag {
            OCTET_STRING => Ok(self.contents.to_vec()),
            t if t == OCTET_STRING | CONSTRUCTED => {
                let mut out = Vec::new();

                for child in self.children() {
                    out.extend(child?.octets()?);
                }

                Ok(out)
            }
            found => Err(DerError::UnexpectedTag {
                expected: OCTET_STRING,
                found,
            }),
        }
    }

    /// The value of a `UTCTime` or `GeneralizedTime`.
    pub fn time(&self) -> Result<DateTime> {
        match self.tag {
            UTC_TIME => DateTime::parse_utc_time(self.contents),
            GENERALIZED_TIME => DateTime::parse_generalized_time(self.contents),
            found => Err(DerError::UnexpectedTag {
                expected: UTC_TIME,
                found,
            }),
        }
    }

    /// The value of one of the usual string types.
    pub fn text(&self) -> Option<String> {
        match self.tag {
            UTF8_STRING => String::from_utf8(self.contents.to_vec()).ok(),
            PRINTABLE_STRING | IA5_STRING | T61_STRING => {
                Some(self.contents.iter().copied().map(char::from).collect())
            }
            BMP_STRING => {
                let units = self
                    .contents
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]));

                char::decode_utf16(units)
                    .collect::<core::result::Result<String, _>>()
                    .ok()
            }
            _ => None,
        }
    }
}

impl core::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &format_args!("{:#04x}", self.tag))
            .field("len", &self.contents.len())
            .finish()
    }
}

/// An iterator over the elements contained in a constructed element.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        match read(self.data, 0) {
            Ok((element, len)) => {
                self.data = &self.data[len..];

                Some(Ok(element))
            }
            Err(e) => {
                self.data = &[];

                Some(Err(e))
            }
        }
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => &bytes[bytes.len() - 1..],
    }
}

/// Read one element, returning it together with the number of bytes it
/// occupies.
fn read(data: &[u8], depth: usize) -> Result<(Element<'_>, usize)> {
    if depth > MAX_DEPTH {
        return Err(DerError::TooDeep);
    }

    let tag = *data.first().ok_or(DerError::UnexpectedEof)?;
    let mut offset = 1;

    // High tag numbers continue in the following bytes.
    if tag & 0x1F == 0x1F {
        loop {
            let b = *data.get(offset).ok_or(DerError::UnexpectedEof)?;
            offset += 1;

            if b & 0x80 == 0 {
                break;
            }
        }
    }

    let first = *data.get(offset).ok_or(DerError::UnexpectedEof)?;
    offset += 1;

    let len = match first {
        0x00..=0x7F => Some(first as usize),
        0x80 => None,
        0x81..=0x84 => {
            let count = (first & 0x7F) as usize;
            let bytes = data
                .get(offset..offset + count)
                .ok_or(DerError::UnexpectedEof)?;
            offset += count;

            Some(bytes.iter().fold(0_usize, |acc, b| (acc << 8) | *b as usize))
        }
        _ => return Err(DerError::InvalidLength),
    };

    match len {
        Some(len) => {
            let end = offset.checked_add(len).ok_or(DerError::InvalidLength)?;
            let contents = data.get(offset..end).ok_or(DerError::UnexpectedEof)?;

            Ok((
                Element {
                    tag,
                    raw: &data[..end],
                    contents,
                },
                end,
            ))
        }
        None => {
            if tag & CONSTRUCTED == 0 {
                return Err(DerError::InvalidLength);
            }

            let start = offset;

            // The contents end with two zero bytes.
            loop {
                match data.get(offset..offset + 2) {
                    Some([0, 0]) => break,
                    Some(_) => {
                        let (_, len) = read(&data[offset..], depth + 1)?;
                        offset += len;
                    }
                    None => return Err(DerError::UnexpectedEof),
                }
            }

            Ok((
                Element {
                    tag,
                    raw: &data[..offset + 2],
                    contents: &data[start..offset],
                },
                offset + 2,
            ))
        }
    }
}
