use log::warn;

pub(crate) trait OptionLog {
    fn warn_none(self, f: &str) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn warn_none(self, f: &str) -> Self {
        self.or_else(|| {
            warn!("{}", f);

            None
        })
    }
}

const SCALAR_NEARLY_ZERO: f32 = 1.0 / (1 << 12) as f32;

pub(crate) trait FloatExt: Sized + Copy {
    /// Whether the number is approximately equal to another one.
    fn is_nearly_equal(&self, other: f32) -> bool;
}

impl FloatExt for f32 {
    fn is_nearly_equal(&self, other: f32) -> bool {
        (*self - other).abs() <= SCALAR_NEARLY_ZERO
    }
}

/// Linearly map `x` from `[x_min, x_max]` to `[y_min, y_max]`.
#[inline]
pub(crate) fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    if x_max == x_min {
        return y_min;
    }

    y_min + (x - x_min) * (y_max - y_min) / (x_max - x_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal() {
        assert!(0.1_f32.is_nearly_equal(0.1 + 1e-6));
        assert!(!0.1_f32.is_nearly_equal(0.2));
    }

    #[test]
    fn interpolation() {
        assert_eq!(interpolate(0.5, 0.0, 1.0, 0.0, 255.0), 127.5);
        assert_eq!(interpolate(3.0, 2.0, 2.0, 1.0, 5.0), 1.0);
    }

    #[test]
    fn warn_none_passes_through() {
        assert_eq!(Some(3).warn_none("unused"), Some(3));
        assert_eq!(None::<u8>.warn_none("missing value"), None);
    }
}
