//! `JBIG2Decode` images.
//!
//! The output is packed with one bit per pixel and rows padded to a byte
//! boundary. Like the default decode array of image masks, a set bit is white.

use crate::config::{DecodeConfig, Jbig2Backend};
use crate::image::{ImageDescriptor, fit};
use log::{debug, warn};
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::JBIG2_GLOBALS;
use rime_syntax::object::{Dict, Stream};

pub(crate) fn decode(
    data: &[u8],
    params: Option<&Dict>,
    image: &ImageDescriptor,
    xref: &XRef,
    config: &DecodeConfig,
) -> Option<Vec<u8>> {
    let globals = params
        .and_then(|p| xref.get::<Stream>(p, JBIG2_GLOBALS))
        .and_then(|g| {
            g.decoded(xref)
                .inspect_err(|e| warn!("failed to decode JBIG2 globals: {e}"))
                .ok()
        });

    let stride = (image.width as usize).div_ceil(8);
    let len = stride * image.height as usize;

    #[cfg(feature = "jbig2")]
    if config.jbig2_backend == Jbig2Backend::Preferred {
        match external::decode(data, globals.as_deref()) {
            Some(packed) => return Some(fit(packed, len, 0xFF)),
            None => debug!("hayro-jbig2 failed, trying the internal decoder"),
        }
    }

    #[cfg(not(feature = "jbig2"))]
    if config.jbig2_backend == Jbig2Backend::Preferred {
        debug!("the `jbig2` feature is disabled, using the internal decoder");
    }

    let bitmap = rime_jbig2::decode_embedded(data, globals.as_deref())
        .inspect_err(|e| warn!("failed to decode JBIG2 image: {e}"))
        .ok()?;

    let packed = if bitmap.width() == image.width {
        bitmap.into_data().into_iter().map(|b| !b).collect()
    } else {
        // The page has a different width than the image, copy pixel by pixel.
        let mut packed = vec![0xFF; len];

        for y in 0..image.height.min(bitmap.height()) {
            for x in 0..image.width.min(bitmap.width()) {
                if bitmap.get(x as i64, y as i64) {
                    packed[y as usize * stride + (x as usize >> 3)] &= !(0x80 >> (x & 7));
                }
            }
        }

        packed
    };

    Some(fit(packed, len, 0xFF))
}

#[cfg(feature = "jbig2")]
mod external {
    struct Packer {
        data: Vec<u8>,
        row_start: usize,
        bit: usize,
    }

    impl Packer {
        fn push(&mut self, white: bool) {
            let index = self.row_start + (self.bit >> 3);

            if index >= self.data.len() {
                self.data.push(0);
            }

            if white {
                self.data[index] |= 0x80 >> (self.bit & 7);
            }

            self.bit += 1;
        }
    }

    // JBIG2 uses 1 for black, the packed output uses 1 for white.
    impl hayro_jbig2::Decoder for Packer {
        fn push_pixel(&mut self, black: bool) {
            self.push(!black);
        }

        fn push_pixel_chunk(&mut self, black: bool, chunk_count: u32) {
            for _ in 0..chunk_count * 8 {
                self.push(!black);
            }
        }

        fn next_line(&mut self) {
            self.row_start += self.bit.div_ceil(8);
            self.bit = 0;
        }
    }

    pub(super) fn decode(data: &[u8], globals: Option<&[u8]>) -> Option<Vec<u8>> {
        let image = hayro_jbig2::decode_embedded(data, globals).ok()?;
        let stride = (image.width as usize).div_ceil(8);

        let mut packer = Packer {
            data: Vec::with_capacity(stride * image.height as usize),
            row_start: 0,
            bit: 0,
        };
        image.decode(&mut packer);

        Some(packer.data)
    }
}
