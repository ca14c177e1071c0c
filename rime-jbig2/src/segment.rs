//! Segment headers and the layout of JBIG2 data.

use crate::error::{DecodeError, Result, bail};
use crate::reader::Reader;

/// What a segment contributes to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    PageInformation,
    EndOfPage,
    EndOfStripe,
    EndOfFile,
    /// A generic region, either painted directly onto the page or kept
    /// around as an intermediate result.
    GenericRegion { immediate: bool },
    /// Symbol dictionaries, text regions, halftone regions and refinement
    /// regions. `paints` is set for those that are drawn onto the page.
    Unsupported { paints: bool },
    /// Profiles, tables, colour palettes and extensions, none of which
    /// affect the bitmap.
    Ignored,
}

impl SegmentKind {
    fn from_type(value: u8) -> Option<Self> {
        let kind = match value {
            48 => Self::PageInformation,
            49 => Self::EndOfPage,
            50 => Self::EndOfStripe,
            51 => Self::EndOfFile,
            36 => Self::GenericRegion { immediate: false },
            38 | 39 => Self::GenericRegion { immediate: true },
            0 | 4 | 16 | 20 | 40 => Self::Unsupported { paints: false },
            6 | 7 | 22 | 23 | 42 | 43 => Self::Unsupported { paints: true },
            52 | 53 | 54 | 62 => Self::Ignored,
            _ => return None,
        };

        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SegmentHeader {
    pub(crate) number: u32,
    pub(crate) kind: SegmentKind,
    pub(crate) referred_to: Vec<u32>,
    pub(crate) page: u32,
    /// `None` for an immediate generic region whose length is only known
    /// after scanning for its end marker.
    pub(crate) data_length: Option<u32>,
}

#[derive(Debug, Clone)]
pub(crate) struct Segment<'a> {
    pub(crate) header: SegmentHeader,
    pub(crate) data: &'a [u8],
}

pub(crate) fn parse_header(r: &mut Reader<'_>) -> Result<SegmentHeader> {
    let number = r.read_u32()?;
    let flags = r.read_u8()?;
    let kind = SegmentKind::from_type(flags & 0x3F).ok_or(DecodeError::InvalidSegment)?;
    let long_page_association = flags & 0x40 != 0;

    let first = r.read_u8()?;
    let referred_count = match first >> 5 {
        count @ 0..=4 => count as u32,
        7 => {
            let rest = r.read_bytes(3)?;
            let count = u32::from_be_bytes([first & 0x1F, rest[0], rest[1], rest[2]]);
            // One retention bit for this segment and each referred-to segment.
            r.read_bytes((count as usize + 1).div_ceil(8))?;

            count
        }
        _ => bail!(DecodeError::InvalidSegment),
    };

    let mut referred_to = Vec::new();

    for _ in 0..referred_count {
        let referred = match number {
            ..=256 => r.read_u8()? as u32,
            ..=65536 => r.read_u16()? as u32,
            _ => r.read_u32()?,
        };

        if referred >= number {
            bail!(DecodeError::InvalidReference);
        }

        referred_to.push(referred);
    }

    let page = if long_page_association {
        r.read_u32()?
    } else {
        r.read_u8()? as u32
    };

    let data_length = match r.read_u32()? {
        u32::MAX if kind == (SegmentKind::GenericRegion { immediate: true }) => None,
        u32::MAX => bail!(DecodeError::InvalidSegment),
        length => Some(length),
    };

    Ok(SegmentHeader {
        number,
        kind,
        referred_to,
        page,
        data_length,
    })
}

pub(crate) fn read_data<'a>(r: &mut Reader<'a>, header: SegmentHeader) -> Result<Segment<'a>> {
    let length = match header.data_length {
        Some(length) => length as usize,
        None => unknown_length(r.tail())?,
    };

    Ok(Segment {
        header,
        data: r.read_bytes(length)?,
    })
}

/// Find the end of a generic region of unknown length.
///
/// Its data ends with a marker followed by a four-byte row count. The marker
/// is `0x00 0x00` for MMR coded data and `0xFF 0xAC` otherwise. The coding is
/// given by the flags after the 17 bytes of region information.
fn unknown_length(data: &[u8]) -> Result<usize> {
    let flags = *data.get(17).ok_or(DecodeError::UnexpectedEof)?;
    let marker: [u8; 2] = if flags & 1 != 0 {
        [0x00, 0x00]
    } else {
        [0xFF, 0xAC]
    };

    data.windows(6)
        .skip(18)
        .position(|w| w[..2] == marker)
        .map(|position| position + 18 + 6)
        .ok_or(DecodeError::MissingEndMarker)
}

const FILE_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// Parse the segments of a stream without a file header, as embedded in PDF.
pub(crate) fn parse_embedded(data: &[u8]) -> Result<Vec<Segment<'_>>> {
    let mut r = Reader::new(data);
    let mut segments = Vec::new();

    while !r.at_end() {
        let header = parse_header(&mut r)?;
        let segment = read_data(&mut r, header)?;
        let end = segment.header.kind == SegmentKind::EndOfFile;
        segments.push(segment);

        if end {
            break;
        }
    }

    Ok(segments)
}

/// Parse the segments of a standalone JBIG2 file.
pub(crate) fn parse_file(data: &[u8]) -> Result<Vec<Segment<'_>>> {
    let mut r = Reader::new(data);

    if r.read_bytes(8)? != FILE_ID {
        bail!(DecodeError::InvalidHeader);
    }

    let flags = r.read_u8()?;
    let sequential = flags & 0x01 != 0;

    if flags & 0x02 == 0 {
        // Number of pages.
        r.read_u32()?;
    }

    if sequential {
        return parse_embedded(r.tail());
    }

    // In random-access organisation, all headers come first and the data
    // parts follow in the same order.
    let mut headers = Vec::new();

    loop {
        let header = parse_header(&mut r)?;
        let end = header.kind == SegmentKind::EndOfFile;

        if header.data_length.is_none() {
            bail!(DecodeError::InvalidSegment);
        }

        headers.push(header);

        if end || r.at_end() {
            break;
        }
    }

    headers
        .into_iter()
        .map(|header| read_data(&mut r, header))
        .collect()
}
