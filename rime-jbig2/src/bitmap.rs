/// How a region is combined with the bitmap it is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combination {
    Or,
    And,
    Xor,
    Xnor,
    Replace,
}

impl Combination {
    pub(crate) fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Or),
            1 => Some(Self::And),
            2 => Some(Self::Xor),
            3 => Some(Self::Xnor),
            4 => Some(Self::Replace),
            _ => None,
        }
    }

    fn apply(self, dst: bool, src: bool) -> bool {
        match self {
            Self::Or => dst | src,
            Self::And => dst & src,
            Self::Xor => dst ^ src,
            Self::Xnor => !(dst ^ src),
            Self::Replace => src,
        }
    }
}

/// A decoded bi-level image.
///
/// Rows are packed with the most significant bit first and padded to a full
/// byte. A set bit is a black pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    pub(crate) fn new(width: u32, height: u32, black: bool) -> Self {
        let stride = width.div_ceil(8) as usize;
        let fill = if black { 0xFF } else { 0x00 };

        Self {
            width,
            height,
            data: vec![fill; stride * height as usize],
        }
    }

    pub(crate) fn from_packed(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width.div_ceil(8) as usize * height as usize);

        Self {
            width,
            height,
            data,
        }
    }

    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of bytes per row.
    pub fn stride(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// The packed pixel rows.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the bitmap, returning the packed pixel rows.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Whether the pixel at the given position is black. Pixels outside of
    /// the bitmap are white.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }

        let byte = self.data[y as usize * self.stride() + x as usize / 8];
        (byte >> (7 - (x % 8))) & 1 == 1
    }

    pub(crate) fn set(&mut self, x: u32, y: u32, black: bool) {
        if x >= self.width || y >= self.height {
            return;
        }

        let index = y as usize * self.stride() + x as usize / 8;
        let mask = 0x80 >> (x % 8);

        if black {
            self.data[index] |= mask;
        } else {
            self.data[index] &= !mask;
        }
    }

    #[cfg(test)]
    pub(crate) fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        &self.data[y as usize * stride..][..stride]
    }

    pub(crate) fn copy_row(&mut self, from: u32, to: u32) {
        let stride = self.stride();
        self.data.copy_within(
            from as usize * stride..(from as usize + 1) * stride,
            to as usize * stride,
        );
    }

    /// Extend the bitmap to the given height, filling new rows with the
    /// given color.
    pub(crate) fn grow(&mut self, height: u32, black: bool) {
        if height > self.height {
            let fill = if black { 0xFF } else { 0x00 };
            self.data.resize(self.stride() * height as usize, fill);
            self.height = height;
        }
    }

    /// Place `region` with its top left corner at the given position.
    pub(crate) fn combine(&mut self, region: &Self, x: i64, y: i64, combination: Combination) {
        for ry in 0..region.height {
            let Ok(dy) = u32::try_from(y + ry as i64) else {
                continue;
            };

            if dy >= self.height {
                break;
            }

            for rx in 0..region.width {
                let Ok(dx) = u32::try_from(x + rx as i64) else {
                    continue;
                };

                if dx >= self.width {
                    break;
                }

                let dst = self.get(dx as i64, dy as i64);
                let src = region.get(rx as i64, ry as i64);
                self.set(dx, dy, combination.apply(dst, src));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels() {
        let mut bitmap = Bitmap::new(10, 2, false);
        bitmap.set(0, 0, true);
        bitmap.set(9, 1, true);

        assert_eq!(bitmap.stride(), 2);
        assert_eq!(bitmap.data(), [0x80, 0x00, 0x00, 0x40]);
        assert!(bitmap.get(9, 1));
        assert!(!bitmap.get(10, 1));
        assert!(!bitmap.get(-1, 0));
    }

    #[test]
    fn combination_operators() {
        let mut page = Bitmap::new(4, 1, false);
        page.set(0, 0, true);
        page.set(1, 0, true);

        let mut region = Bitmap::new(2, 1, false);
        region.set(0, 0, true);

        let mut or = page.clone();
        or.combine(&region, 1, 0, Combination::Or);
        assert_eq!(or.data(), [0b1100_0000]);

        let mut xor = page.clone();
        xor.combine(&region, 1, 0, Combination::Xor);
        assert_eq!(xor.data(), [0b1000_0000]);

        let mut xnor = page.clone();
        xnor.combine(&region, 1, 0, Combination::Xnor);
        assert_eq!(xnor.data(), [0b1110_0000]);

        let mut replace = page.clone();
        replace.combine(&region, 0, 0, Combination::Replace);
        assert_eq!(replace.data(), [0b1000_0000]);

        let mut clipped = page;
        clipped.combine(&region, -1, 0, Combination::And);
        assert_eq!(clipped.data(), [0b0100_0000]);
    }
}
