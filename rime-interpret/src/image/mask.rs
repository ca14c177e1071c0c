use crate::color::Rgb;
use crate::image::ImageDescriptor;
use log::warn;
use rime_syntax::object::Array;
use smallvec::SmallVec;

/// A color key mask, resolved to a range of RGB colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorKey {
    min: Rgb,
    max: Rgb,
}

impl ColorKey {
    /// Resolve a `/Mask` array with a minimum and maximum sample per
    /// component.
    pub(crate) fn new(array: &Array, image: &ImageDescriptor, black_ratio: f32) -> Option<Self> {
        let n = image.color_space.num_components();
        let values = array
            .iter_as::<f32>()
            .map(|v| v.max(0.0) as u32)
            .collect::<SmallVec<[u32; 8]>>();

        if values.len() < 2 * n || image.decode.len() < n {
            warn!("invalid color key mask");

            return None;
        }

        let decoded = |offset: usize| -> SmallVec<[f32; 4]> {
            (0..n)
                .map(|i| image.decode[i].apply(values[2 * i + offset]))
                .collect()
        };

        // For indexed images this is a lookup of the palette entries.
        let a = image.color_space.to_rgb_with(&decoded(0), black_ratio);
        let b = image.color_space.to_rgb_with(&decoded(1), black_ratio);

        Some(Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        })
    }

    /// Whether a color is masked out.
    pub fn contains(&self, color: &[u8]) -> bool {
        color
            .iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .all(|(c, (min, max))| (*min..=*max).contains(c))
    }

    /// The alpha channel for interleaved RGB pixels.
    pub(crate) fn alpha(&self, rgb: &[u8]) -> Vec<u8> {
        rgb.chunks_exact(3)
            .map(|c| if self.contains(c) { 0 } else { 255 })
            .collect()
    }
}

/// Scale a single channel to a different size, using the nearest pixel.
pub(crate) fn resample(
    data: &[u8],
    src_width: u32,
    src_height: u32,
    width: u32,
    height: u32,
) -> Vec<u8> {
    if src_width == width && src_height == height {
        return data.to_vec();
    }

    let x_factor = src_width as f32 / width as f32;
    let y_factor = src_height as f32 / height as f32;
    let mut output = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        let src_y = ((y as f32 * y_factor) as u32).min(src_height - 1);

        for x in 0..width {
            let src_x = ((x as f32 * x_factor) as u32).min(src_width - 1);
            let index = src_y as usize * src_width as usize + src_x as usize;

            output.push(data.get(index).copied().unwrap_or(0));
        }
    }

    output
}

/// The luminance of an RGB color.
#[inline]
pub(crate) fn luminance(rgb: &[u8]) -> u8 {
    let [r, g, b] = [rgb[0], rgb[1], rgb[2]].map(f32::from);

    (0.3 * r + 0.59 * g + 0.11 * b + 0.5).min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_neighbour() {
        let data = [0, 255, 10, 20];

        assert_eq!(resample(&data, 2, 2, 2, 2), data);
        assert_eq!(
            resample(&data, 2, 2, 4, 2),
            [0, 0, 255, 255, 10, 10, 20, 20]
        );
        assert_eq!(resample(&data, 2, 2, 1, 1), [0]);
    }

    #[test]
    fn luminance_of_gray_is_gray() {
        for v in [0, 1, 77, 128, 254, 255] {
            assert_eq!(luminance(&[v, v, v]), v);
        }

        assert_eq!(luminance(&[255, 0, 0]), 77);
    }

    #[test]
    fn color_key_range() {
        let key = ColorKey {
            min: [10, 0, 0],
            max: [20, 5, 0],
        };

        assert!(key.contains(&[15, 5, 0]));
        assert!(!key.contains(&[21, 0, 0]));
        assert_eq!(key.alpha(&[10, 0, 0, 0, 0, 1]), [0, 255]);
    }
}
