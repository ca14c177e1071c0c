/*!
A decoder for CCITT Group 3 and Group 4 fax data, as found in PDF images with
the `CCITTFaxDecode` filter.

All three schemes that PDF can express through the `K` parameter are
supported:

- `K < 0`: pure two-dimensional Group 4 (ITU-T T.6).
- `K = 0`: one-dimensional Group 3 (ITU-T T.4, modified Huffman).
- `K > 0`: mixed one- and two-dimensional Group 3.

The decoded image is packed with one bit per pixel, MSB first, and each row
starts on a byte boundary. A set bit is a **black** pixel.

# Example
```
use rime_ccitt::{Params, Scheme, decode};

// A single all-white row of 8 pixels, coded as the white run `10011`.
let params = Params {
    scheme: Scheme::Group3OneDimensional,
    columns: 8,
    rows: 1,
    ..Params::default()
};
let image = decode(&[0b1001_1000], &params).unwrap();

assert_eq!(image.data, [0x00]);
```
*/

#![forbid(unsafe_code)]

use core::fmt;

mod bit_reader;
mod codes;
mod decoder;

pub use decoder::decode;

/// The largest supported number of columns.
pub const MAX_COLUMNS: u32 = 1 << 20;

/// The coding scheme of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// One-dimensional modified Huffman coding.
    Group3OneDimensional,
    /// Mixed coding where a tag bit after each end-of-line code selects the
    /// scheme of the following row.
    Group3TwoDimensional,
    /// Two-dimensional coding without end-of-line codes.
    Group4,
}

impl Scheme {
    /// The scheme for the value of the `K` entry in the decode parameters.
    pub fn from_k(k: i32) -> Self {
        match k {
            ..0 => Self::Group4,
            0 => Self::Group3OneDimensional,
            _ => Self::Group3TwoDimensional,
        }
    }
}

/// Parameters for decoding.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// The coding scheme.
    pub scheme: Scheme,
    /// The width of the image.
    pub columns: u32,
    /// The height of the image, or 0 if it is unknown. Decoding then stops at
    /// the end of the data or at an end-of-block marker.
    pub rows: u32,
    /// Whether each row starts at a byte boundary.
    pub encoded_byte_align: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            scheme: Scheme::Group3OneDimensional,
            columns: 1728,
            rows: 0,
            encoded_byte_align: false,
        }
    }
}

/// A decoded bilevel image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// The width of the image.
    pub columns: u32,
    /// The number of rows.
    pub rows: u32,
    /// The packed rows, a set bit is black.
    pub data: Vec<u8>,
}

impl Image {
    /// The number of bytes per row.
    pub fn stride(&self) -> usize {
        (self.columns as usize).div_ceil(8)
    }

    /// Whether the pixel at the given position is black.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        let index = y as usize * self.stride() + (x as usize >> 3);

        self.data
            .get(index)
            .is_some_and(|byte| byte & (0x80 >> (x & 7)) != 0)
    }
}

/// An error that occurred while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The data ended in the middle of a row.
    UnexpectedEof,
    /// The data contains a bit pattern that is not a valid code.
    InvalidCode,
    /// A row does not line up with the reference row.
    InvalidRow,
    /// The number of columns is 0 or too large.
    InvalidColumns,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of data"),
            Self::InvalidCode => write!(f, "invalid code"),
            Self::InvalidRow => write!(f, "row does not match its reference row"),
            Self::InvalidColumns => write!(f, "invalid number of columns"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// Result type for CCITT decoding.
pub type Result<T> = core::result::Result<T, DecodeError>;
