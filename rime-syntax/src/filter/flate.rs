use crate::object::Dict;
use crate::object::dict::keys::{BITS_PER_COMPONENT, COLORS, COLUMNS, PREDICTOR};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use log::warn;
use std::io::Read;

pub(crate) fn decode(data: &[u8], params: Option<&Dict>) -> Option<Vec<u8>> {
    let decoded = inflate(data)?;
    let params = params.map(PredictorParams::from_params).unwrap_or_default();

    apply_predictor(decoded, &params)
}

fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = vec![];

    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => return Some(out),
        // Truncated streams are common, keep what we have.
        Err(_) if !out.is_empty() => {
            warn!("flate stream is corrupt, using {} decoded bytes", out.len());

            return Some(out);
        }
        Err(_) => {}
    }

    out.clear();

    // Some writers omit the zlib header.
    match DeflateDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Some(out),
        Err(_) if !out.is_empty() => Some(out),
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PredictorParams {
    predictor: u8,
    colors: u8,
    bits_per_component: u8,
    columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub(crate) fn from_params(dict: &Dict) -> Self {
        Self {
            predictor: dict.get(PREDICTOR).unwrap_or(1),
            colors: dict.get(COLORS).unwrap_or(1),
            bits_per_component: dict.get(BITS_PER_COMPONENT).unwrap_or(8),
            columns: dict.get(COLUMNS).unwrap_or(1),
        }
    }

    fn bits_per_pixel(&self) -> usize {
        self.bits_per_component as usize * self.colors as usize
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel().div_ceil(8).max(1)
    }

    fn row_length_in_bytes(&self) -> usize {
        (self.columns * self.bits_per_pixel()).div_ceil(8)
    }
}

pub(crate) fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    match params.predictor {
        0 | 1 => Some(data),
        2 => Some(tiff(data, params)),
        10..=15 => png(&data, params),
        other => {
            warn!("unknown predictor {other}");

            None
        }
    }
}

fn tiff(mut data: Vec<u8>, params: &PredictorParams) -> Vec<u8> {
    if params.bits_per_component != 8 {
        warn!(
            "TIFF predictor with {} bits per component is not supported",
            params.bits_per_component
        );

        return data;
    }

    let row_length = params.row_length_in_bytes();
    let colors = params.colors as usize;

    if row_length == 0 {
        return data;
    }

    for row in data.chunks_mut(row_length) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }

    data
}

fn png(data: &[u8], params: &PredictorParams) -> Option<Vec<u8>> {
    let row_length = params.row_length_in_bytes();
    let bpp = params.bytes_per_pixel();

    if row_length == 0 {
        return Some(vec![]);
    }

    let num_rows = data.len() / (row_length + 1);

    let mut out = vec![0; num_rows * row_length];
    let mut prev_row = vec![0; row_length];

    for (row, (input, output)) in data
        .chunks_exact(row_length + 1)
        .zip(out.chunks_exact_mut(row_length))
        .enumerate()
    {
        let (filter, input) = (input[0], &input[1..]);

        for i in 0..row_length {
            let left = if i >= bpp { output[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            output[i] = match filter {
                0 => input[i],
                1 => input[i].wrapping_add(left),
                2 => input[i].wrapping_add(up),
                3 => input[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => input[i].wrapping_add(paeth(left, up, up_left)),
                _ => {
                    warn!("invalid PNG filter type {filter} in row {row}");

                    return None;
                }
            };
        }

        prev_row.copy_from_slice(output);
    }

    Some(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
