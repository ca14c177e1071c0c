/*!
A decoder for JBIG2 images restricted to generic regions.

JBIG2 (ITU-T T.88) is a bi-level image format mostly found in scanned PDF
documents. This crate decodes pages built from generic regions, coded either
with the MQ arithmetic coder or with MMR. Images that need symbol
dictionaries, text regions, halftone regions or refinement fail with
[`DecodeError::Unsupported`].

# Example
```rust,no_run
let data = std::fs::read("image.jb2").unwrap();
let bitmap = rime_jbig2::decode(&data).unwrap();

println!("{}x{} image", bitmap.width(), bitmap.height());
```
*/

#![forbid(unsafe_code)]

mod bitmap;
mod error;
mod generic;
mod mq;
mod page;
mod reader;
mod segment;

use crate::generic::GenericRegion;
use crate::page::{Page, PageInfo};
use crate::reader::Reader;
use crate::segment::{Segment, SegmentKind};
use log::{debug, warn};

pub use bitmap::Bitmap;
pub use error::{DecodeError, Result};

/// Decode the first page of a standalone JBIG2 file.
pub fn decode(data: &[u8]) -> Result<Bitmap> {
    decode_segments(&segment::parse_file(data)?)
}

/// Decode a JBIG2 stream embedded in PDF, together with the segments of its
/// `JBIG2Globals` stream.
pub fn decode_embedded(data: &[u8], globals: Option<&[u8]>) -> Result<Bitmap> {
    let mut segments = match globals {
        Some(globals) => segment::parse_embedded(globals)?,
        None => Vec::new(),
    };
    segments.extend(segment::parse_embedded(data)?);

    decode_segments(&segments)
}

fn decode_segments(segments: &[Segment<'_>]) -> Result<Bitmap> {
    let mut page: Option<Page> = None;

    for segment in segments {
        match segment.header.kind {
            SegmentKind::PageInformation => {
                if page.is_some() {
                    debug!("stopping at the second page");

                    break;
                }

                page = Some(Page::new(PageInfo::parse(segment.data)?)?);
            }
            SegmentKind::GenericRegion { immediate } => {
                if !immediate {
                    debug!("skipping intermediate generic region");

                    continue;
                }

                let page = page.as_mut().ok_or(DecodeError::MissingPageInfo)?;
                let region = GenericRegion::parse(segment.data, segment.header.data_length.is_none())?;
                page.paint(&region.decode()?, &region.info)?;
            }
            SegmentKind::EndOfStripe => {
                let page = page.as_mut().ok_or(DecodeError::MissingPageInfo)?;
                page.end_stripe(Reader::new(segment.data).read_u32()?)?;
            }
            SegmentKind::EndOfPage | SegmentKind::EndOfFile => break,
            SegmentKind::Unsupported { paints } => {
                if paints {
                    warn!(
                        "JBIG2 segment {} needs an unsupported region type",
                        segment.header.number
                    );

                    return Err(DecodeError::Unsupported);
                }

                debug!("skipping segment {}", segment.header.number);
            }
            SegmentKind::Ignored => {}
        }
    }

    page.ok_or(DecodeError::MissingPageInfo)?.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generic::tests::{region_data, sample};

    fn segment(number: u8, kind: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![0, 0, 0, number, kind, 0, 1];
        out.extend((data.len() as u32).to_be_bytes());
        out.extend(data);

        out
    }

    fn page_info(width: u32, height: u32, flags: u8) -> Vec<u8> {
        let mut data = Vec::new();
        for v in [width, height, 0, 0] {
            data.extend(v.to_be_bytes());
        }
        data.push(flags);
        data.extend([0, 0]);

        data
    }

    #[test]
    fn embedded_generic_region() {
        let bitmap = sample();
        let mut data = segment(0, 48, &page_info(37, 12, 0));
        data.extend(segment(1, 38, &region_data(&bitmap, true)));
        data.extend(segment(2, 49, &[]));

        assert_eq!(decode_embedded(&data, None).unwrap(), bitmap);
    }

    #[test]
    fn region_is_placed_on_page() {
        let bitmap = sample();
        let mut region = region_data(&bitmap, false);
        // x = 3, y = 1.
        region[8..12].copy_from_slice(&3_u32.to_be_bytes());
        region[12..16].copy_from_slice(&1_u32.to_be_bytes());

        let mut data = segment(0, 48, &page_info(48, 16, 0));
        data.extend(segment(1, 38, &region));

        let page = decode_embedded(&data, None).unwrap();

        for y in 0..16 {
            for x in 0..48 {
                assert_eq!(page.get(x, y), bitmap.get(x - 3, y - 1), "pixel {x} {y}");
            }
        }
    }

    #[test]
    fn globals_come_first() {
        // A symbol dictionary in the globals is skipped, it is only needed by
        // text regions.
        let globals = segment(0, 0, &[0; 4]);
        let mut data = segment(1, 48, &page_info(37, 12, 0));
        data.extend(segment(2, 38, &region_data(&sample(), false)));

        assert_eq!(decode_embedded(&data, Some(&globals)).unwrap(), sample());
    }

    #[test]
    fn text_region_is_unsupported() {
        let mut data = segment(0, 48, &page_info(8, 8, 0));
        data.extend(segment(1, 6, &[0; 20]));

        assert_eq!(decode_embedded(&data, None), Err(DecodeError::Unsupported));
    }

    #[test]
    fn region_without_page() {
        let data = segment(0, 38, &region_data(&sample(), false));

        assert_eq!(
            decode_embedded(&data, None),
            Err(DecodeError::MissingPageInfo)
        );
    }

    #[test]
    fn standalone_file() {
        let mut data = vec![0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A, 0x01, 0, 0, 0, 1];
        data.extend(segment(0, 48, &page_info(37, 12, 0)));
        data.extend(segment(1, 38, &region_data(&sample(), true)));
        data.extend(segment(2, 49, &[]));
        data.extend(segment(3, 51, &[]));

        assert_eq!(decode(&data).unwrap(), sample());
        assert_eq!(decode(&data[1..]), Err(DecodeError::InvalidHeader));
    }

    #[test]
    fn default_pixel_fills_page() {
        let data = segment(0, 48, &page_info(9, 1, 0x04));
        let page = decode_embedded(&data, None).unwrap();

        assert_eq!(page.data(), [0xFF, 0xFF]);
    }
}
