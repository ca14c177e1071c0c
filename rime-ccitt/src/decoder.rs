//! Decoding of rows.
//!
//! Rows are stored as their changing elements: the positions of the pixels
//! whose color differs from the pixel to their left. The pixel left of the
//! first column is an imaginary white pixel, so even indices are changes to
//! black and odd indices are changes to white.

use crate::bit_reader::BitReader;
use crate::codes::Mode;
use crate::{DecodeError, Image, MAX_COLUMNS, Params, Result, Scheme};
use log::{debug, warn};

/// Decode CCITT fax data.
///
/// Fails if the data is invalid before the requested number of rows could be
/// decoded. Data that simply ends early is padded with white rows.
pub fn decode(data: &[u8], params: &Params) -> Result<Image> {
    if params.columns == 0 || params.columns > MAX_COLUMNS {
        return Err(DecodeError::InvalidColumns);
    }

    let columns = params.columns as usize;
    let stride = columns.div_ceil(8);
    let mut reader = BitReader::new(data);
    let mut rows = Rows::new(columns);
    let mut output = Vec::with_capacity(stride * params.rows as usize);
    let mut decoded = 0;

    while params.rows == 0 || decoded < params.rows {
        if params.encoded_byte_align {
            reader.align();
        }

        let eols = reader.skip_eols(params.scheme == Scheme::Group3TwoDimensional);

        let end_marker = match params.scheme {
            // End of facsimile block.
            Scheme::Group4 => eols > 0,
            // Return to control.
            _ => eols > 1,
        };

        if end_marker || (decoded > 0 && reader.only_fill_left()) {
            break;
        }

        let two_dimensional = match params.scheme {
            Scheme::Group4 => true,
            Scheme::Group3OneDimensional => false,
            Scheme::Group3TwoDimensional => reader.read_bit()? == 0,
        };

        let result = if two_dimensional {
            rows.decode_2d(&mut reader)
        } else {
            rows.decode_1d(&mut reader)
        };

        match result {
            Ok(()) => {}
            Err(DecodeError::UnexpectedEof) if decoded > 0 => {
                warn!("ccitt data ended after {decoded} rows");

                break;
            }
            Err(e) if decoded > 0 && params.rows == 0 => {
                warn!("stopping ccitt decoding after {decoded} rows: {e}");

                break;
            }
            Err(e) => return Err(e),
        }

        rows.render(&mut output, stride);
        rows.next_row();
        decoded += 1;
    }

    if decoded == 0 {
        return Err(DecodeError::UnexpectedEof);
    }

    if params.rows > decoded {
        debug!("padding {} missing ccitt rows", params.rows - decoded);

        decoded = params.rows;
        output.resize(stride * decoded as usize, 0);
    }

    Ok(Image {
        columns: params.columns,
        rows: decoded,
        data: output,
    })
}

struct Rows {
    columns: usize,
    /// The changing elements of the previous row, followed by two `columns`
    /// sentinels. For the first row, this is an imaginary white row.
    reference: Vec<usize>,
    /// The changing elements of the current row.
    coding: Vec<usize>,
    /// Where the search for `b1` resumes.
    cursor: usize,
}

impl Rows {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            reference: vec![columns, columns],
            coding: vec![],
            cursor: 0,
        }
    }

    fn push_change(&mut self, position: usize) {
        let position = position.min(self.columns);

        // Two changes at the same position cancel out.
        if self.coding.last() == Some(&position) {
            self.coding.pop();
        } else {
            self.coding.push(position);
        }
    }

    fn decode_1d(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        self.coding.clear();

        let mut a0 = 0;
        let mut white = true;

        while a0 < self.columns {
            a0 += reader.read_run(white)?;
            self.push_change(a0);
            white = !white;
        }

        Ok(())
    }

    fn decode_2d(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        self.coding.clear();
        self.cursor = 0;

        // `None` is the imaginary position left of the first column.
        let mut a0 = None;
        let mut white = true;

        while a0.is_none_or(|a0| a0 < self.columns) {
            let (b1, b2) = self.find_b1_b2(a0, white);
            let start = a0.unwrap_or(0);

            match reader.read_mode()? {
                Mode::Pass => a0 = Some(b2),
                Mode::Horizontal => {
                    let a1 = start + reader.read_run(white)?;
                    let a2 = a1 + reader.read_run(!white)?;

                    self.push_change(a1);
                    self.push_change(a2);
                    a0 = Some(a2.min(self.columns));
                }
                Mode::Vertical(offset) => {
                    let a1 = b1
                        .checked_add_signed(offset as isize)
                        .filter(|a1| a0.is_none_or(|a0| *a1 >= a0))
                        .ok_or(DecodeError::InvalidRow)?;

                    self.push_change(a1);
                    a0 = Some(a1.min(self.columns));
                    white = !white;
                }
            }
        }

        Ok(())
    }

    /// Find the first changing element on the reference row right of `a0`
    /// with the opposite color of `a0`, and the changing element after it.
    fn find_b1_b2(&mut self, a0: Option<usize>, white: bool) -> (usize, usize) {
        let left_of_b1 = |position: usize| a0.is_some_and(|a0| position <= a0);
        // Changes to black have even indices.
        let parity = if white { 0 } else { 1 };

        let mut i = self.cursor;

        while i > 0 && !left_of_b1(self.reference[i - 1]) {
            i -= 1;
        }

        while i < self.reference.len() - 1 && (left_of_b1(self.reference[i]) || i % 2 != parity)
        {
            i += 1;
        }

        self.cursor = i;

        let b1 = self.reference[i];
        let b2 = self.reference.get(i + 1).copied().unwrap_or(self.columns);

        (b1, b2)
    }

    fn next_row(&mut self) {
        let columns = self.columns;
        self.coding.retain(|c| *c < columns);

        std::mem::swap(&mut self.reference, &mut self.coding);
        self.reference.extend([columns, columns]);
        self.coding.clear();
    }

    /// Append the current row to `output`, with set bits for black pixels.
    fn render(&self, output: &mut Vec<u8>, stride: usize) {
        let start = output.len();
        output.resize(start + stride, 0);
        let row = &mut output[start..];

        for span in self.coding.chunks(2) {
            let from = span[0].min(self.columns);
            let to = span.get(1).copied().unwrap_or(self.columns).min(self.columns);

            for x in from..to {
                row[x >> 3] |= 0x80 >> (x & 7);
            }
        }
    }
}
