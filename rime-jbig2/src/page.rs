//! Page and region information, and the page bitmap regions are painted on.

use crate::bitmap::{Bitmap, Combination};
use crate::error::{DecodeError, Result, bail};
use crate::reader::Reader;
use log::warn;

/// The largest number of pixels a page or region may have.
pub(crate) const MAX_PIXELS: u64 = 1 << 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageInfo {
    pub(crate) width: u32,
    /// `None` if the height is only known once the last stripe ended.
    pub(crate) height: Option<u32>,
    pub(crate) default_pixel: bool,
    pub(crate) combination: Combination,
}

impl PageInfo {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let width = r.read_u32()?;
        let height = r.read_u32()?;
        // Resolution.
        r.read_bytes(8)?;
        let flags = r.read_u8()?;
        // Striping information.
        r.read_u16()?;

        let combination = match (flags >> 3) & 0x03 {
            0 => Combination::Or,
            1 => Combination::And,
            2 => Combination::Xor,
            _ => Combination::Xnor,
        };

        Ok(Self {
            width,
            height: (height != u32::MAX).then_some(height),
            default_pixel: flags & 0x04 != 0,
            combination,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegionInfo {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) combination: Combination,
}

impl RegionInfo {
    pub(crate) fn parse(r: &mut Reader<'_>) -> Result<Self> {
        let width = r.read_u32()?;
        let height = r.read_u32()?;
        let x = r.read_u32()?;
        let y = r.read_u32()?;
        let flags = r.read_u8()?;

        let combination = Combination::from_bits(flags & 0x07).ok_or(DecodeError::InvalidRegion)?;
        check_size(width, height)?;

        Ok(Self {
            width,
            height,
            x,
            y,
            combination,
        })
    }
}

pub(crate) fn check_size(width: u32, height: u32) -> Result<()> {
    if width as u64 * height as u64 > MAX_PIXELS {
        bail!(DecodeError::Overflow);
    }

    Ok(())
}

/// The page being decoded.
#[derive(Debug)]
pub(crate) struct Page {
    info: PageInfo,
    bitmap: Bitmap,
}

impl Page {
    pub(crate) fn new(info: PageInfo) -> Result<Self> {
        let height = info.height.unwrap_or(0);
        check_size(info.width, height)?;
        let bitmap = Bitmap::new(info.width, height, info.default_pixel);

        Ok(Self { info, bitmap })
    }

    /// Paint a region bitmap onto the page.
    pub(crate) fn paint(&mut self, region: &Bitmap, info: &RegionInfo) -> Result<()> {
        if self.info.height.is_none() {
            let bottom = info.y.saturating_add(region.height());
            self.grow(bottom)?;
        }

        // Regions always use their own operator, regardless of the page's
        // override flag.
        self.bitmap
            .combine(region, info.x as i64, info.y as i64, info.combination);

        Ok(())
    }

    /// Handle the end of a stripe ending at the given row.
    pub(crate) fn end_stripe(&mut self, end_row: u32) -> Result<()> {
        if self.info.height.is_none() {
            self.grow(end_row.saturating_add(1))?;
        }

        Ok(())
    }

    fn grow(&mut self, height: u32) -> Result<()> {
        check_size(self.info.width, height)?;
        self.bitmap.grow(height, self.info.default_pixel);

        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Bitmap> {
        if self.bitmap.height() == 0 || self.bitmap.width() == 0 {
            warn!("JBIG2 page is empty");

            bail!(DecodeError::InvalidRegion);
        }

        Ok(self.bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_info() {
        let data = [
            0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x38, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x0C, 0x00, 0x00,
        ];
        let info = PageInfo::parse(&data).unwrap();

        assert_eq!(info.width, 64);
        assert_eq!(info.height, Some(56));
        assert!(info.default_pixel);
        assert_eq!(info.combination, Combination::And);
    }

    #[test]
    fn unknown_height_grows_with_stripes() {
        let mut page = Page::new(PageInfo {
            width: 8,
            height: None,
            default_pixel: false,
            combination: Combination::Or,
        })
        .unwrap();

        let mut region = Bitmap::new(8, 2, false);
        region.set(0, 1, true);
        let info = RegionInfo {
            width: 8,
            height: 2,
            x: 0,
            y: 3,
            combination: Combination::Or,
        };

        page.paint(&region, &info).unwrap();
        page.end_stripe(9).unwrap();

        let bitmap = page.finish().unwrap();
        assert_eq!(bitmap.height(), 10);
        assert!(bitmap.get(0, 4));
        assert!(!bitmap.get(0, 3));
    }

    #[test]
    fn oversized_region() {
        let mut data = Vec::new();
        for v in [0x10000_u32, 0x10000, 0, 0] {
            data.extend(v.to_be_bytes());
        }
        data.push(0);

        assert_eq!(
            RegionInfo::parse(&mut Reader::new(&data)),
            Err(DecodeError::Overflow)
        );
    }
}
