use crate::{DecodeError, Result};

/// Reads an MSB-first bit stream.
#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    #[inline]
    pub(crate) fn read_bit(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.position >> 3)
            .ok_or(DecodeError::UnexpectedEof)?;
        let bit = (byte >> (7 - (self.position & 7))) & 1;
        self.position += 1;

        Ok(bit)
    }

    pub(crate) fn peek_bits(&self, count: u32) -> Result<u32> {
        let mut cloned = self.clone();
        let mut value = 0;

        for _ in 0..count {
            value = (value << 1) | cloned.read_bit()? as u32;
        }

        Ok(value)
    }

    /// Skip to the next byte boundary.
    pub(crate) fn align(&mut self) {
        self.position = self.position.next_multiple_of(8);
    }

    #[cfg(test)]
    fn at_end(&self) -> bool {
        self.position >= self.data.len() * 8
    }

    /// Whether only zero bits remain.
    pub(crate) fn only_fill_left(&self) -> bool {
        let mut cloned = self.clone();

        while let Ok(bit) = cloned.read_bit() {
            if bit == 1 {
                return false;
            }
        }

        true
    }

    /// Consume one end-of-line code, including any fill bits before it.
    pub(crate) fn skip_eol(&mut self) -> bool {
        let mut cloned = self.clone();
        let mut zeros = 0;

        loop {
            match cloned.read_bit() {
                Ok(0) => zeros += 1,
                Ok(_) if zeros >= 11 => {
                    *self = cloned;
                    return true;
                }
                _ => return false,
            }
        }
    }

    /// Consume consecutive end-of-line codes and return how many there were.
    ///
    /// In two-dimensional Group 3 data every end-of-line code is followed by a
    /// tag bit. The tag bits between consecutive codes are consumed as well.
    pub(crate) fn skip_eols(&mut self, tagged: bool) -> usize {
        let mut count = 0;

        while self.skip_eol() {
            count += 1;

            if tagged && self.peek_bits(13) == Ok(0b1_0000_0000_0001) {
                self.position += 1;
            }
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_and_alignment() {
        let mut reader = BitReader::new(&[0b1010_0000, 0xFF]);
        assert_eq!(reader.read_bit(), Ok(1));
        assert_eq!(reader.read_bit(), Ok(0));
        assert_eq!(reader.peek_bits(2), Ok(0b10));
        reader.align();
        assert_eq!(reader.peek_bits(8), Ok(0xFF));
        reader.align();
        assert_eq!(reader.read_bit(), Ok(1));
    }

    #[test]
    fn eol_with_fill_bits() {
        // Four fill bits, then the end-of-line code, then a single bit.
        let mut reader = BitReader::new(&[0x00, 0x01, 0x80]);
        assert!(reader.skip_eol());
        assert_eq!(reader.read_bit(), Ok(1));
        assert!(!reader.skip_eol());
    }

    #[test]
    fn tagged_eols() {
        // EOL 1 EOL 1, bits: 000000000001 1 000000000001 1
        let mut reader = BitReader::new(&[0x00, 0x18, 0x00, 0xC0]);
        assert_eq!(reader.skip_eols(true), 2);
        assert_eq!(reader.read_bit(), Ok(1));
        assert!(reader.only_fill_left());
    }

    #[test]
    fn end_of_data() {
        let mut reader = BitReader::new(&[0x80]);
        assert!(!reader.only_fill_left());
        reader.read_bit().unwrap();
        assert!(reader.only_fill_left());
        reader.align();
        assert!(reader.at_end());
        assert_eq!(reader.read_bit(), Err(DecodeError::UnexpectedEof));
    }
}
