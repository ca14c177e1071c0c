//! `CCITTFaxDecode` images.
//!
//! The output is packed with one bit per pixel. Unless `BlackIs1` is set, a
//! set bit is white.

use crate::config::DecodeConfig;
use crate::image::{ImageDescriptor, fit};
use log::{debug, warn};
use rime_ccitt::{Params, Scheme};
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::{BLACK_IS_1, COLUMNS, ENCODED_BYTE_ALIGN, K, ROWS};
use rime_syntax::object::{Dict, Object};

/// The decode parameters, with defaults taken from the image.
#[derive(Debug, Clone, Copy)]
struct Options {
    k: i32,
    black_is_1: bool,
    encoded_byte_align: bool,
    columns: u32,
    rows: u32,
}

impl Options {
    fn new(params: Option<&Dict>, image: &ImageDescriptor, xref: &XRef) -> Self {
        let get_bool = |key: &[u8]| {
            params
                .and_then(|p| p.get_raw(key))
                .and_then(|o| xref.resolve(o))
                .and_then(|o| parse_bool(&o))
        };

        Self {
            k: params.and_then(|p| xref.get::<i32>(p, K)).unwrap_or(0),
            // Some producers put `BlackIs1` into the image dictionary.
            black_is_1: get_bool(BLACK_IS_1)
                .or_else(|| {
                    image
                        .stream
                        .dict()
                        .get_raw(BLACK_IS_1)
                        .and_then(|o| xref.resolve(o))
                        .and_then(|o| parse_bool(&o))
                })
                .unwrap_or(false),
            encoded_byte_align: get_bool(ENCODED_BYTE_ALIGN).unwrap_or(false),
            columns: params
                .and_then(|p| xref.get::<u32>(p, COLUMNS))
                .filter(|c| *c > 0)
                .unwrap_or(image.width),
            rows: params
                .and_then(|p| xref.get::<u32>(p, ROWS))
                .filter(|r| *r > 0)
                .unwrap_or(image.height),
        }
    }

    fn params(&self, scheme: Scheme) -> Params {
        Params {
            scheme,
            columns: self.columns,
            rows: self.rows,
            encoded_byte_align: self.encoded_byte_align,
        }
    }
}

/// Booleans are sometimes written as strings or names.
fn parse_bool(object: &Object) -> Option<bool> {
    let text = match object {
        Object::Boolean(b) => return Some(*b),
        Object::Number(n) => return Some(n.as_f64() != 0.0),
        Object::Name(n) => n.to_vec(),
        Object::String(s) => s.bytes(),
        _ => return None,
    };

    match text.to_ascii_lowercase().as_slice() {
        b"true" | b"t" | b"1" => Some(true),
        b"false" | b"f" | b"0" => Some(false),
        _ => None,
    }
}

pub(crate) fn decode(
    data: &[u8],
    params: Option<&Dict>,
    image: &ImageDescriptor,
    xref: &XRef,
    config: &DecodeConfig,
) -> Option<Vec<u8>> {
    let options = Options::new(params, image, xref);
    let stride = (options.columns as usize).div_ceil(8);
    let len = stride * options.rows as usize;

    // The decoders produce a set bit for black.
    let black_rows = alternate(data, &options, config).or_else(|| {
        let scheme = Scheme::from_k(options.k);

        match rime_ccitt::decode(data, &options.params(scheme)) {
            Ok(decoded) => Some(decoded.data),
            Err(e) if scheme != Scheme::Group4 => {
                debug!("failed to decode CCITT data with K = {} ({e}), retrying as Group 4", options.k);

                rime_ccitt::decode(data, &options.params(Scheme::Group4))
                    .inspect_err(|e| warn!("failed to decode CCITT data: {e}"))
                    .ok()
                    .map(|d| d.data)
            }
            Err(e) => {
                warn!("failed to decode CCITT data: {e}");

                None
            }
        }
    })?;

    let packed = if options.black_is_1 {
        fit(black_rows, len, 0x00)
    } else {
        fit(black_rows.into_iter().map(|b| !b).collect(), len, 0xFF)
    };

    Some(packed)
}

/// Decode with the `fax` crate, if that is requested.
#[cfg(feature = "fax")]
fn alternate(data: &[u8], options: &Options, config: &DecodeConfig) -> Option<Vec<u8>> {
    if !config.force_alternate_ccitt {
        return None;
    }

    let columns = u16::try_from(options.columns).ok()?;
    let rows = u16::try_from(options.rows).ok()?;
    let stride = (columns as usize).div_ceil(8);
    let mut out = Vec::with_capacity(stride * rows as usize);

    let mut push_row = |transitions: &[u16]| {
        let mut row = vec![0_u8; stride];

        for (x, color) in fax::decoder::pels(transitions, columns).enumerate() {
            if matches!(color, fax::Color::Black) {
                row[x >> 3] |= 0x80 >> (x & 7);
            }
        }

        out.extend(row);
    };

    let decoded = match Scheme::from_k(options.k) {
        Scheme::Group4 => {
            fax::decoder::decode_g4(data.iter().copied(), columns, Some(rows), &mut push_row)
        }
        Scheme::Group3OneDimensional => {
            fax::decoder::decode_g3(data.iter().copied(), &mut push_row)
        }
        Scheme::Group3TwoDimensional => {
            debug!("the fax decoder has no mixed Group 3 coding, using the internal decoder");

            return None;
        }
    };

    if decoded.is_none() {
        debug!("the fax decoder failed, using the internal decoder");

        return None;
    }

    Some(out)
}

#[cfg(not(feature = "fax"))]
fn alternate(_: &[u8], _: &Options, config: &DecodeConfig) -> Option<Vec<u8>> {
    if config.force_alternate_ccitt {
        debug!("the `fax` feature is disabled, using the internal decoder");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resources;
    use rime_syntax::object::Stream;
    use rime_syntax::parse_object;
    use std::sync::Arc;

    fn descriptor(dict: &str) -> ImageDescriptor {
        let dict = parse_object(dict.as_bytes()).unwrap().cast::<Dict>().unwrap();
        let resources = Resources::new(&Dict::new(), Arc::new(XRef::new()));

        ImageDescriptor::new(
            &Stream::new(dict, Vec::new()),
            None,
            &resources,
            &DecodeConfig::default(),
        )
        .unwrap()
    }

    fn params(dict: &str) -> Dict {
        parse_object(dict.as_bytes()).unwrap().cast::<Dict>().unwrap()
    }

    // One all-white row of 8 pixels in one-dimensional coding.
    const WHITE_ROW: [u8; 1] = [0b1001_1000];

    #[test]
    fn white_row() {
        let image = descriptor("<< /Width 8 /Height 1 /ImageMask true >>");
        let params = params("<< /K 0 /Columns 8 >>");
        let out = decode(&WHITE_ROW, Some(&params), &image, &XRef::new(), &DecodeConfig::default());

        assert_eq!(out, Some(vec![0xFF]));
    }

    #[test]
    fn black_is_1() {
        let image = descriptor("<< /Width 8 /Height 1 /ImageMask true >>");
        let params = params("<< /K 0 /Columns 8 /BlackIs1 true >>");
        let out = decode(&WHITE_ROW, Some(&params), &image, &XRef::new(), &DecodeConfig::default());

        assert_eq!(out, Some(vec![0x00]));
    }

    #[test]
    fn black_is_1_in_image_dictionary() {
        let image = descriptor("<< /Width 8 /Height 1 /ImageMask true /BlackIs1 (true) >>");
        let out = decode(&WHITE_ROW, None, &image, &XRef::new(), &DecodeConfig::default());

        assert_eq!(out, Some(vec![0x00]));
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool(&Object::Boolean(true)), Some(true));
        assert_eq!(parse_bool(&parse_object(b"/T").unwrap()), Some(true));
        assert_eq!(parse_bool(&parse_object(b"(0)").unwrap()), Some(false));
        assert_eq!(parse_bool(&parse_object(b"(False)").unwrap()), Some(false));
        assert_eq!(parse_bool(&parse_object(b"/Maybe").unwrap()), None);
    }

    #[test]
    fn defaults_come_from_image() {
        let image = descriptor("<< /Width 20 /Height 3 /ImageMask true >>");
        let options = Options::new(None, &image, &XRef::new());

        assert_eq!(options.k, 0);
        assert_eq!(options.columns, 20);
        assert_eq!(options.rows, 3);
        assert!(!options.black_is_1);
        assert!(!options.encoded_byte_align);
    }

    #[test]
    fn group_4_data_with_wrong_k() {
        // A single vertical mode code, which is not a valid run in
        // one-dimensional coding.
        let image = descriptor("<< /Width 8 /Height 1 /ImageMask true >>");
        let params = params("<< /K 0 /Columns 8 >>");
        let out = decode(&[0b1000_0000], Some(&params), &image, &XRef::new(), &DecodeConfig::default());

        assert_eq!(out, Some(vec![0xFF]));
    }

    #[test]
    fn forced_alternate_decoder() {
        let image = descriptor("<< /Width 8 /Height 1 /ImageMask true >>");
        let mut config = DecodeConfig::default();
        config.force_alternate_ccitt = true;

        // A white row in one-dimensional coding and a vertical mode code
        // repeating the white reference row in Group 4.
        for (k, data) in [(0, WHITE_ROW), (-1, [0b1000_0000])] {
            let params = params(&format!("<< /K {k} /Columns 8 >>"));
            let out = decode(&data, Some(&params), &image, &XRef::new(), &config);

            assert_eq!(out, Some(vec![0xFF]), "K = {k}");
        }
    }

    #[test]
    fn too_many_columns() {
        let image = descriptor("<< /Width 2097152 /Height 1 /ImageMask true >>");
        let out = decode(&WHITE_ROW, None, &image, &XRef::new(), &DecodeConfig::default());

        assert!(out.is_none());
    }
}
