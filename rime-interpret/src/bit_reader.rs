//! Reading samples that are not byte aligned.

/// A big-endian bit reader.
#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    cur_pos: usize,
}

impl<'a> BitReader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, cur_pos: 0 }
    }

    /// Align the reader to the next byte boundary.
    #[inline]
    pub(crate) fn align(&mut self) {
        let bit_pos = self.cur_pos % 8;

        if bit_pos != 0 {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Read the given number of bits.
    ///
    /// Returns `None` if `bit_size` > 32 or if there is not enough data left.
    #[inline(always)]
    pub(crate) fn read(&mut self, bit_size: u8) -> Option<u32> {
        let byte_pos = self.cur_pos / 8;

        match bit_size {
            0 => Some(0),
            8 if self.cur_pos.is_multiple_of(8) => {
                let item = *self.data.get(byte_pos)? as u32;
                self.cur_pos += 8;

                Some(item)
            }
            1..=32 => {
                let bit_pos = self.cur_pos % 8;
                let end_byte_pos = (bit_pos + bit_size as usize - 1) / 8;
                let mut read = [0_u8; 8];

                for (i, r) in read.iter_mut().enumerate().take(end_byte_pos + 1) {
                    *r = *self.data.get(byte_pos + i)?;
                }

                let item = (u64::from_be_bytes(read) >> (64 - bit_pos - bit_size as usize))
                    as u32
                    & bit_mask(bit_size);
                self.cur_pos += bit_size as usize;

                Some(item)
            }
            _ => None,
        }
    }

    #[cfg(test)]
    fn at_end(&self) -> bool {
        self.cur_pos / 8 >= self.data.len()
    }
}

#[inline]
pub(crate) fn bit_mask(bit_size: u8) -> u32 {
    ((1_u64 << bit_size as u64) - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned() {
        let mut reader = BitReader::new(&[0b1011_0011, 0b0101_1111]);

        assert_eq!(reader.read(1), Some(1));
        assert_eq!(reader.read(3), Some(0b011));
        assert_eq!(reader.read(6), Some(0b0011_01));
        assert_eq!(reader.read(8), None);
        assert_eq!(reader.read(6), Some(0b01_1111));
        assert!(reader.at_end());
    }

    #[test]
    fn unaligned_bytes() {
        let mut reader = BitReader::new(&[0x0F, 0xF0, 0xAA]);

        assert_eq!(reader.read(4), Some(0x0));
        assert_eq!(reader.read(8), Some(0xFF));
        assert_eq!(reader.read(4), Some(0x0));
        assert_eq!(reader.read(8), Some(0xAA));
        assert_eq!(reader.read(8), None);
    }

    #[test]
    fn align_and_wide_reads() {
        let mut reader = BitReader::new(&[0xAB, 0xCD, 0xEF, 0x12, 0x34]);

        assert_eq!(reader.read(4), Some(0xA));
        reader.align();
        assert_eq!(reader.read(16), Some(0xCDEF));
        assert_eq!(reader.read(0), Some(0));
        assert_eq!(reader.read(33), None);
        assert_eq!(reader.read(12), Some(0x123));
    }
}
