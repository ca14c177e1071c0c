//! Generic regions, coded either with MMR or with context-based arithmetic
//! coding.

use crate::bitmap::Bitmap;
use crate::error::{DecodeError, Result, bail};
use crate::mq::{Context, MqDecoder};
use crate::page::RegionInfo;
use crate::reader::Reader;
use log::warn;
use rime_ccitt::{Params, Scheme};

/// A pixel of a context template, relative to the pixel being decoded.
#[derive(Debug, Clone, Copy)]
enum Pixel {
    Fixed(i8, i8),
    /// The adaptive template pixel with the given index.
    Adaptive(usize),
}

use Pixel::{Adaptive as A, Fixed as F};

// Ordered from the most significant context bit to the least significant one.
#[rustfmt::skip]
const TEMPLATE_0: &[Pixel] = &[
    A(3), F(-1, -2), F(0, -2), F(1, -2), A(2),
    A(1), F(-2, -1), F(-1, -1), F(0, -1), F(1, -1), F(2, -1), A(0),
    F(-4, 0), F(-3, 0), F(-2, 0), F(-1, 0),
];
#[rustfmt::skip]
const TEMPLATE_1: &[Pixel] = &[
    F(-1, -2), F(0, -2), F(1, -2), F(2, -2),
    F(-2, -1), F(-1, -1), F(0, -1), F(1, -1), F(2, -1), A(0),
    F(-3, 0), F(-2, 0), F(-1, 0),
];
#[rustfmt::skip]
const TEMPLATE_2: &[Pixel] = &[
    F(-1, -2), F(0, -2), F(1, -2),
    F(-2, -1), F(-1, -1), F(0, -1), F(1, -1), A(0),
    F(-2, 0), F(-1, 0),
];
#[rustfmt::skip]
const TEMPLATE_3: &[Pixel] = &[
    F(-3, -1), F(-2, -1), F(-1, -1), F(0, -1), F(1, -1), A(0),
    F(-4, 0), F(-3, 0), F(-2, 0), F(-1, 0),
];

/// The context used to decode whether a row repeats the previous one, with
/// the adaptive pixels at their nominal positions.
const TYPICAL_CONTEXTS: [usize; 4] = [
    0b1001_1011_0010_0101,
    0b1_1110_0101_0101,
    0b11_1001_0101,
    0b01_1001_0101,
];

/// The nominal adaptive pixel positions of template 0.
#[cfg(test)]
pub(crate) const NOMINAL_PIXELS: [(i8, i8); 4] = [(3, -1), (-3, -1), (2, -2), (-2, -2)];

#[derive(Debug, Clone)]
pub(crate) struct GenericRegion<'a> {
    pub(crate) info: RegionInfo,
    mmr: bool,
    template: u8,
    typical_prediction: bool,
    adaptive_pixels: [(i8, i8); 4],
    data: &'a [u8],
}

impl<'a> GenericRegion<'a> {
    /// Parse the segment data of a generic region. `unknown_length` is set if
    /// the data ends with a row count.
    pub(crate) fn parse(data: &'a [u8], unknown_length: bool) -> Result<Self> {
        let mut r = Reader::new(data);
        let mut info = RegionInfo::parse(&mut r)?;
        let flags = r.read_u8()?;

        let mmr = flags & 0x01 != 0;
        let template = (flags >> 1) & 0x03;
        let typical_prediction = flags & 0x08 != 0;

        if flags & 0x10 != 0 {
            warn!("extended generic region templates are not supported");

            bail!(DecodeError::Unsupported);
        }

        let mut adaptive_pixels = [(0, 0); 4];

        if !mmr {
            let count = if template == 0 { 4 } else { 1 };

            for pixel in adaptive_pixels.iter_mut().take(count) {
                let x = r.read_i8()?;
                let y = r.read_i8()?;

                // The pixel must have been decoded already.
                if y > 0 || (y == 0 && x >= 0) {
                    bail!(DecodeError::InvalidTemplatePixel);
                }

                *pixel = (x, y);
            }
        }

        let mut data = r.tail();

        if unknown_length {
            let (rest, rows) = data
                .split_last_chunk::<4>()
                .ok_or(DecodeError::UnexpectedEof)?;
            let rows = u32::from_be_bytes(*rows);

            if rows > info.height {
                bail!(DecodeError::InvalidRegion);
            }

            info.height = rows;
            data = rest;
        }

        Ok(Self {
            info,
            mmr,
            template,
            typical_prediction,
            adaptive_pixels,
            data,
        })
    }

    pub(crate) fn decode(&self) -> Result<Bitmap> {
        if self.info.width == 0 || self.info.height == 0 {
            return Ok(Bitmap::new(self.info.width, self.info.height, false));
        }

        if self.mmr {
            self.decode_mmr()
        } else {
            Ok(self.decode_arithmetic())
        }
    }

    fn decode_mmr(&self) -> Result<Bitmap> {
        let params = Params {
            scheme: Scheme::Group4,
            columns: self.info.width,
            rows: self.info.height,
            encoded_byte_align: false,
        };

        // Black pixels are ones in both formats.
        let image = rime_ccitt::decode(self.data, &params)?;

        Ok(Bitmap::from_packed(self.info.width, self.info.height, image.data))
    }

    fn decode_arithmetic(&self) -> Bitmap {
        let template = match self.template {
            0 => TEMPLATE_0,
            1 => TEMPLATE_1,
            2 => TEMPLATE_2,
            _ => TEMPLATE_3,
        };
        let offsets = template
            .iter()
            .map(|pixel| match *pixel {
                Pixel::Fixed(x, y) => (x as i64, y as i64),
                Pixel::Adaptive(i) => {
                    let (x, y) = self.adaptive_pixels[i];
                    (x as i64, y as i64)
                }
            })
            .collect::<Vec<_>>();

        let mut bitmap = Bitmap::new(self.info.width, self.info.height, false);
        let mut decoder = MqDecoder::new(self.data);
        let mut contexts = vec![Context::default(); 1 << offsets.len()];
        let mut typical = false;

        for y in 0..self.info.height {
            if self.typical_prediction {
                let bit = decoder.decode(&mut contexts[TYPICAL_CONTEXTS[self.template as usize]]);
                typical ^= bit == 1;

                if typical {
                    if y > 0 {
                        bitmap.copy_row(y - 1, y);
                    }

                    continue;
                }
            }

            for x in 0..self.info.width {
                let cx = context(&bitmap, x, y, &offsets);

                if decoder.decode(&mut contexts[cx]) == 1 {
                    bitmap.set(x, y, true);
                }
            }
        }

        bitmap
    }
}

fn context(bitmap: &Bitmap, x: u32, y: u32, offsets: &[(i64, i64)]) -> usize {
    offsets.iter().fold(0, |cx, (dx, dy)| {
        (cx << 1) | bitmap.get(x as i64 + dx, y as i64 + dy) as usize
    })
}
