//! PDF color spaces and their conversion to RGB.

mod cie;
mod cmyk;
mod icc;

pub use cie::{CalGray, CalRgb, Lab};
pub use cmyk::{DEFAULT_BLACK_RATIO, cmyk_to_rgb, cmyk8_to_rgb};
pub use icc::IccProfile;

use crate::function::Function;
use log::warn;
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::{
    ALL, ALTERNATE, CAL_GRAY, CAL_RGB, DEVICE_CMYK, DEVICE_GRAY, DEVICE_N, DEVICE_RGB, G,
    ICC_BASED, INDEXED, LAB, N, NONE, PATTERN, SEPARATION,
};
use rime_syntax::object::{Array, Dict, Name, Object, PdfString, Stream};
use smallvec::{SmallVec, smallvec};
use std::ops::Deref;
use std::sync::Arc;

/// The components of a color.
pub type ColorComponents = SmallVec<[f32; 4]>;

/// An RGB8 color.
pub type Rgb = [u8; 3];

const MAX_NESTING: u8 = 8;

/// A PDF color space.
#[derive(Debug, Clone)]
pub enum ColorSpace {
    /// DeviceGray.
    DeviceGray,
    /// DeviceRGB.
    DeviceRgb,
    /// DeviceCMYK.
    DeviceCmyk,
    /// CalGray.
    CalGray(CalGray),
    /// CalRGB.
    CalRgb(CalRgb),
    /// Lab.
    Lab(Lab),
    /// Indexed.
    Indexed(Arc<Indexed>),
    /// ICCBased.
    IccBased(Arc<IccBased>),
    /// Separation.
    Separation(Arc<Separation>),
    /// DeviceN.
    DeviceN(Arc<DeviceN>),
    /// Pattern, with the color space of uncolored patterns.
    Pattern(Option<Box<ColorSpace>>),
}

impl ColorSpace {
    /// Create a color space from a name or an array.
    ///
    /// Names other than the device color spaces and `Pattern` need to be
    /// looked up in the resources first.
    pub fn new(object: &Object, xref: &XRef) -> Option<Self> {
        Self::new_inner(object, xref, 0)
    }

    fn new_inner(object: &Object, xref: &XRef, depth: u8) -> Option<Self> {
        if depth > MAX_NESTING {
            warn!("color space nesting is too deep");

            return None;
        }

        match xref.resolve(object)? {
            Object::Name(name) => Self::from_name(&name),
            Object::Array(array) => Self::from_array(&array, xref, depth),
            _ => None,
        }
    }

    /// Create one of the color spaces that can be given by name alone.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            DEVICE_GRAY | G => Some(Self::DeviceGray),
            DEVICE_RGB | b"RGB" => Some(Self::DeviceRgb),
            DEVICE_CMYK | b"CMYK" | b"CalCMYK" => Some(Self::DeviceCmyk),
            PATTERN => Some(Self::Pattern(None)),
            _ => None,
        }
    }

    fn from_array(array: &Array, xref: &XRef, depth: u8) -> Option<Self> {
        let name = xref.get_item::<Name>(array, 0)?;
        let dict_at = |i| xref.get_item::<Dict>(array, i);

        match name.deref() {
            DEVICE_GRAY | G => Some(Self::DeviceGray),
            DEVICE_RGB | b"RGB" => Some(Self::DeviceRgb),
            DEVICE_CMYK | b"CMYK" | b"CalCMYK" => Some(Self::DeviceCmyk),
            CAL_GRAY => Some(Self::CalGray(CalGray::new(&dict_at(1).unwrap_or_default()))),
            CAL_RGB => Some(Self::CalRgb(CalRgb::new(&dict_at(1).unwrap_or_default()))),
            LAB => Some(Self::Lab(Lab::new(&dict_at(1).unwrap_or_default()))),
            ICC_BASED => {
                let stream = xref.get_item::<Stream>(array, 1)?;

                Self::icc_based(&stream, xref, depth)
            }
            INDEXED | b"I" => Some(Self::Indexed(Arc::new(Indexed::new(array, xref, depth)?))),
            SEPARATION => Some(Self::Separation(Arc::new(Separation::new(
                array, xref, depth,
            )?))),
            DEVICE_N => Some(Self::DeviceN(Arc::new(DeviceN::new(array, xref, depth)?))),
            PATTERN => {
                let underlying = array
                    .get_raw(1)
                    .and_then(|o| Self::new_inner(o, xref, depth + 1))
                    .map(Box::new);

                Some(Self::Pattern(underlying))
            }
            _ => {
                warn!("unsupported color space {}", name.as_str());

                None
            }
        }
    }

    fn icc_based(stream: &Stream, xref: &XRef, depth: u8) -> Option<Self> {
        let dict = stream.dict();
        let num_components = xref.get::<usize>(dict, N);
        let alternate = dict
            .get_raw(ALTERNATE)
            .and_then(|a| Self::new_inner(a, xref, depth + 1));

        let profile = num_components.and_then(|n| {
            let data = stream.decoded(xref).ok()?;

            IccProfile::new(&data, n)
        });

        if let Some(profile) = profile {
            let n = profile.num_components();
            let alternate = alternate
                .filter(|a| a.num_components() == n)
                .or_else(|| Self::device(n))?;

            return Some(Self::IccBased(Arc::new(IccBased { profile, alternate })));
        }

        warn!("unusable ICC profile, falling back to alternate color space");

        alternate.or_else(|| num_components.and_then(Self::device))
    }

    /// The device color space with the given number of components.
    fn device(num_components: usize) -> Option<Self> {
        match num_components {
            1 => Some(Self::DeviceGray),
            3 => Some(Self::DeviceRgb),
            4 => Some(Self::DeviceCmyk),
            _ => None,
        }
    }

    /// The number of components of the color space.
    pub fn num_components(&self) -> usize {
        match self {
            Self::DeviceGray | Self::CalGray(_) => 1,
            Self::DeviceRgb | Self::CalRgb(_) | Self::Lab(_) => 3,
            Self::DeviceCmyk => 4,
            Self::Indexed(_) | Self::Separation(_) => 1,
            Self::IccBased(icc) => icc.profile.num_components(),
            Self::DeviceN(d) => d.names.len(),
            Self::Pattern(p) => p.as_ref().map_or(1, |p| p.num_components()),
        }
    }

    /// The decode array used for images with this color space and the given
    /// number of bits per component, if the image does not specify one.
    pub fn default_decode_array(&self, bits_per_component: u8) -> SmallVec<[(f32, f32); 4]> {
        match self {
            Self::Lab(lab) => {
                let r = lab.range();

                smallvec![(0.0, 100.0), (r[0], r[1]), (r[2], r[3])]
            }
            Self::IccBased(icc) if icc.profile.is_lab() => {
                smallvec![(0.0, 100.0), (-128.0, 127.0), (-128.0, 127.0)]
            }
            Self::Indexed(_) => {
                let max = ((1_u32 << bits_per_component.min(16)) - 1) as f32;

                smallvec![(0.0, max)]
            }
            _ => smallvec![(0.0, 1.0); self.num_components()],
        }
    }

    /// The initial color of the color space, used after it is selected with
    /// `cs` or `CS`.
    pub fn initial_color(&self) -> ColorComponents {
        match self {
            Self::DeviceCmyk => smallvec![0.0, 0.0, 0.0, 1.0],
            Self::IccBased(icc) if icc.profile.num_components() == 4 => {
                smallvec![0.0, 0.0, 0.0, 1.0]
            }
            Self::Separation(_) | Self::DeviceN(_) => smallvec![1.0; self.num_components()],
            Self::Pattern(Some(p)) => p.initial_color(),
            _ => smallvec![0.0; self.num_components()],
        }
    }

    /// Whether this is a Separation color space with an actual colorant, that
    /// is neither `All` nor `None`.
    pub fn is_named_color(&self) -> bool {
        match self {
            Self::Separation(s) => s.is_named_color(),
            _ => false,
        }
    }

    /// Whether painting with this color space has no visible effect.
    pub fn is_none(&self) -> bool {
        match self {
            Self::Separation(s) => &*s.colorant == NONE,
            Self::DeviceN(d) => d.names.iter().all(|n| &**n == NONE),
            _ => false,
        }
    }

    /// Whether this is an Indexed color space.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed(_))
    }

    /// Convert a color to RGB, using the default black ratio for CMYK.
    pub fn to_rgb(&self, components: &[f32]) -> Rgb {
        self.to_rgb_with(components, DEFAULT_BLACK_RATIO)
    }

    /// Convert a color to RGB, using the given black ratio for CMYK.
    ///
    /// Colors that cannot be converted are black.
    pub fn to_rgb_with(&self, components: &[f32], black_ratio: f32) -> Rgb {
        let mut input = ColorComponents::from_slice(components);
        input.resize(self.num_components(), 0.0);

        let mut output = [0; 3];

        match self.convert(&input, &mut output, black_ratio) {
            Some(()) => output,
            None => [0, 0, 0],
        }
    }

    /// Convert interleaved colors to interleaved RGB.
    ///
    /// `input` holds `num_components()` values per color, `output` three bytes
    /// per color.
    pub(crate) fn convert(&self, input: &[f32], output: &mut [u8], black_ratio: f32) -> Option<()> {
        match self {
            Self::DeviceGray => {
                for (v, out) in input.iter().zip(output.chunks_exact_mut(3)) {
                    out.fill(f32_to_u8(*v));
                }
            }
            Self::DeviceRgb => {
                for (v, out) in input.iter().zip(output.iter_mut()) {
                    *out = f32_to_u8(*v);
                }
            }
            Self::DeviceCmyk => {
                for (cmyk, out) in input.chunks_exact(4).zip(output.chunks_exact_mut(3)) {
                    out.copy_from_slice(&cmyk_to_rgb(
                        [cmyk[0], cmyk[1], cmyk[2], cmyk[3]],
                        black_ratio,
                    ));
                }
            }
            Self::CalGray(c) => c.convert(input, output),
            Self::CalRgb(c) => c.convert(input, output),
            Self::Lab(l) => l.convert(input, output),
            Self::IccBased(icc) => icc.convert(input, output, black_ratio)?,
            Self::Indexed(i) => i.convert(input, output, black_ratio)?,
            Self::Separation(s) => s.convert(input, output, black_ratio)?,
            Self::DeviceN(d) => d.convert(input, output, black_ratio)?,
            Self::Pattern(Some(p)) => p.convert(input, output, black_ratio)?,
            Self::Pattern(None) => {
                warn!("pattern color space without underlying color space");

                return None;
            }
        }

        Some(())
    }

    /// Convert interleaved 8-bit samples with an identity decode array to
    /// interleaved RGB.
    pub(crate) fn convert_u8(&self, input: &[u8], output: &mut [u8], black_ratio: f32) -> Option<()> {
        match self {
            Self::DeviceGray => {
                for (v, out) in input.iter().zip(output.chunks_exact_mut(3)) {
                    out.fill(*v);
                }
            }
            Self::DeviceRgb => {
                let len = output.len().min(input.len());
                output[..len].copy_from_slice(&input[..len]);
            }
            Self::DeviceCmyk => {
                for (cmyk, out) in input.chunks_exact(4).zip(output.chunks_exact_mut(3)) {
                    out.copy_from_slice(&cmyk8_to_rgb(
                        [cmyk[0], cmyk[1], cmyk[2], cmyk[3]],
                        black_ratio,
                    ));
                }
            }
            Self::IccBased(icc) if !icc.profile.is_lab() => {
                icc.convert_u8(input, output, black_ratio)?;
            }
            _ => {
                let input = input.iter().map(|v| *v as f32 / 255.0).collect::<Vec<_>>();

                self.convert(&input, output, black_ratio)?;
            }
        }

        Some(())
    }
}

#[inline(always)]
pub(crate) fn f32_to_u8(val: f32) -> u8 {
    (val.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// An ICCBased color space.
#[derive(Debug)]
pub struct IccBased {
    profile: IccProfile,
    alternate: ColorSpace,
}

impl IccBased {
    /// The embedded profile.
    pub fn profile(&self) -> &IccProfile {
        &self.profile
    }

    /// The color space used for colors the profile fails to convert. It is
    /// the declared `/Alternate`, or the device color space with the same
    /// number of components.
    pub fn alternate(&self) -> &ColorSpace {
        &self.alternate
    }

    fn convert(&self, input: &[f32], output: &mut [u8], black_ratio: f32) -> Option<()> {
        self.profile.convert_f32(input, output).or_else(|| {
            warn!("ICC conversion failed, using the alternate color space");

            self.alternate.convert(input, output, black_ratio)
        })
    }

    fn convert_u8(&self, input: &[u8], output: &mut [u8], black_ratio: f32) -> Option<()> {
        self.profile.convert_u8(input, output).or_else(|| {
            warn!("ICC conversion failed, using the alternate color space");

            self.alternate.convert_u8(input, output, black_ratio)
        })
    }
}

/// An Indexed color space.
#[derive(Debug)]
pub struct Indexed {
    base: ColorSpace,
    hival: u8,
    palette: Vec<u8>,
}

impl Indexed {
    fn new(array: &Array, xref: &XRef, depth: u8) -> Option<Self> {
        let base = ColorSpace::new_inner(array.get_raw(1)?, xref, depth + 1)?;
        let hival = xref
            .get_item::<i64>(array, 2)
            .map(|h| h.clamp(0, 255) as u8)?;

        let palette = match xref.resolve(array.get_raw(3)?)? {
            Object::Stream(stream) => stream.decoded(xref).ok()?,
            Object::String(string) => decrypted(&string, xref),
            _ => {
                warn!("invalid lookup table of indexed color space");

                return None;
            }
        };

        let expected = (hival as usize + 1) * base.num_components();

        if palette.len() < expected {
            warn!(
                "lookup table of indexed color space is too short ({} < {expected})",
                palette.len()
            );
        }

        Some(Self {
            base,
            hival,
            palette,
        })
    }

    /// The base color space.
    pub fn base(&self) -> &ColorSpace {
        &self.base
    }

    /// The raw palette entry of an index, clamped to `hival`.
    pub(crate) fn entry(&self, index: f32) -> Option<&[u8]> {
        let n = self.base.num_components();
        let idx = (index.clamp(0.0, self.hival as f32) + 0.5) as usize;

        self.palette.get(idx * n..(idx + 1) * n)
    }

    fn convert(&self, input: &[f32], output: &mut [u8], black_ratio: f32) -> Option<()> {
        for (index, out) in input.iter().zip(output.chunks_exact_mut(3)) {
            match self.entry(*index) {
                Some(entry) => self.base.convert_u8(entry, out, black_ratio)?,
                // Entries past the end of a short lookup table are black.
                None => out.fill(0),
            }
        }

        Some(())
    }
}

fn decrypted(string: &PdfString, xref: &XRef) -> Vec<u8> {
    string
        .decrypted_bytes(xref.security())
        .unwrap_or_else(|e| {
            warn!("failed to decrypt lookup table: {e}");

            string.bytes()
        })
}

/// A Separation color space.
#[derive(Debug)]
pub struct Separation {
    colorant: Name,
    alternate: ColorSpace,
    tint_transform: Option<Function>,
}

impl Separation {
    fn new(array: &Array, xref: &XRef, depth: u8) -> Option<Self> {
        let colorant = xref.get_item::<Name>(array, 1)?;
        let alternate = ColorSpace::new_inner(array.get_raw(2)?, xref, depth + 1)?;
        let tint_transform = array.get_raw(3).and_then(|f| Function::new(f, xref));

        if tint_transform.is_none() {
            warn!(
                "unusable tint transform for separation {}, using gray",
                colorant.as_str()
            );
        }

        Some(Self {
            colorant,
            alternate,
            tint_transform,
        })
    }

    /// The name of the colorant.
    pub fn colorant(&self) -> &Name {
        &self.colorant
    }

    fn is_named_color(&self) -> bool {
        &*self.colorant != ALL && &*self.colorant != NONE
    }

    fn convert(&self, input: &[f32], output: &mut [u8], black_ratio: f32) -> Option<()> {
        for (tint, out) in input.iter().zip(output.chunks_exact_mut(3)) {
            let evaluated = match &self.tint_transform {
                Some(f) if &*self.colorant != ALL => f.eval(&[*tint]),
                _ => None,
            };

            match evaluated {
                Some(values) => {
                    let mut values = values;
                    values.resize(self.alternate.num_components(), 0.0);
                    self.alternate.convert(&values, out, black_ratio)?;
                }
                None => out.fill(f32_to_u8(1.0 - tint)),
            }
        }

        Some(())
    }
}

/// A DeviceN color space.
#[derive(Debug)]
pub struct DeviceN {
    names: Vec<Name>,
    alternate: ColorSpace,
    tint_transform: Option<Function>,
}

impl DeviceN {
    fn new(array: &Array, xref: &XRef, depth: u8) -> Option<Self> {
        let names = xref
            .get_item::<Array>(array, 1)?
            .iter()
            .filter_map(|n| xref.resolve_as::<Name>(n))
            .collect::<Vec<_>>();

        if names.is_empty() {
            warn!("DeviceN color space without colorants");

            return None;
        }

        let alternate = ColorSpace::new_inner(array.get_raw(2)?, xref, depth + 1)?;
        let tint_transform = array.get_raw(3).and_then(|f| Function::new(f, xref));

        Some(Self {
            names,
            alternate,
            tint_transform,
        })
    }

    fn convert(&self, input: &[f32], output: &mut [u8], black_ratio: f32) -> Option<()> {
        let n = self.names.len();

        for (tints, out) in input.chunks_exact(n).zip(output.chunks_exact_mut(3)) {
            match self.tint_transform.as_ref().and_then(|f| f.eval(tints)) {
                Some(mut values) => {
                    values.resize(self.alternate.num_components(), 0.0);
                    self.alternate.convert(&values, out, black_ratio)?;
                }
                None => {
                    let average = tints.iter().sum::<f32>() / n as f32;
                    out.fill(f32_to_u8(1.0 - average));
                }
            }
        }

        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::object::ObjRef;
    use rime_syntax::parse_object;

    fn color_space(source: &[u8]) -> ColorSpace {
        ColorSpace::new(&parse_object(source).unwrap(), &XRef::new()).unwrap()
    }

    #[test]
    fn device_spaces() {
        assert_eq!(ColorSpace::DeviceGray.to_rgb(&[0.5]), [128, 128, 128]);
        assert_eq!(ColorSpace::DeviceRgb.to_rgb(&[1.0, 0.0, 0.2]), [255, 0, 51]);
        assert_eq!(
            ColorSpace::DeviceCmyk.to_rgb(&[0.0, 0.0, 0.0, 0.0]),
            [255, 255, 255]
        );
        assert_eq!(ColorSpace::DeviceCmyk.to_rgb(&[0.0, 0.0, 0.0, 1.0]), [0, 0, 0]);
    }

    #[test]
    fn names_and_abbreviations() {
        assert!(matches!(color_space(b"/G"), ColorSpace::DeviceGray));
        assert!(matches!(color_space(b"/DeviceCMYK"), ColorSpace::DeviceCmyk));
        assert!(matches!(color_space(b"[/RGB]"), ColorSpace::DeviceRgb));
        assert!(ColorSpace::new(&parse_object(b"/Unknown").unwrap(), &XRef::new()).is_none());
    }

    #[test]
    fn indexed() {
        let cs = color_space(b"[/Indexed /DeviceRGB 1 <FF000000FF00>]");

        assert_eq!(cs.num_components(), 1);
        assert_eq!(cs.to_rgb(&[0.0]), [255, 0, 0]);
        assert_eq!(cs.to_rgb(&[1.0]), [0, 255, 0]);
        // Out of range indices are clamped.
        assert_eq!(cs.to_rgb(&[7.0]), [0, 255, 0]);
        assert_eq!(cs.default_decode_array(4).as_slice(), &[(0.0, 15.0)]);
    }

    #[test]
    fn short_lookup_table_is_black() {
        let cs = color_space(b"[/I /DeviceGray 3 <FF80>]");

        assert_eq!(cs.to_rgb(&[1.0]), [128, 128, 128]);
        assert_eq!(cs.to_rgb(&[2.0]), [0, 0, 0]);
    }

    #[test]
    fn separation() {
        let cs = color_space(
            b"[/Separation /Spot /DeviceCMYK
               << /FunctionType 2 /Domain [0 1] /C0 [0 0 0 0] /C1 [0 0 0 1] /N 1 >>]",
        );

        assert!(cs.is_named_color());
        assert!(!cs.is_none());
        assert_eq!(cs.initial_color().as_slice(), &[1.0]);
        assert_eq!(cs.to_rgb(&[0.0]), [255, 255, 255]);
        assert_eq!(cs.to_rgb(&[1.0]), [0, 0, 0]);
    }

    #[test]
    fn separation_all_and_none() {
        let all = color_space(
            b"[/Separation /All /DeviceRGB
               << /FunctionType 2 /Domain [0 1] /C0 [1 0 0] /C1 [0 1 0] /N 1 >>]",
        );
        let none = color_space(b"[/Separation /None /DeviceGray << /FunctionType 4 >>]");

        assert!(!all.is_named_color());
        assert_eq!(all.to_rgb(&[1.0]), [0, 0, 0]);
        assert_eq!(all.to_rgb(&[0.0]), [255, 255, 255]);
        assert!(none.is_none());
        assert!(!none.is_named_color());
    }

    #[test]
    fn device_n() {
        let cs = color_space(
            b"[/DeviceN [/Cyan /Magenta] /DeviceCMYK
               << /FunctionType 0 /Domain [0 1 0 1] /Range [0 1 0 1 0 1 0 1] /Size [2 2]
                  /BitsPerSample 8 >>]",
        );

        // The sampled function is a direct dictionary, so it has no samples
        // and the tint transform is unusable.
        assert_eq!(cs.num_components(), 2);
        assert_eq!(cs.to_rgb(&[0.0, 0.0]), [255, 255, 255]);
        assert_eq!(cs.to_rgb(&[1.0, 1.0]), [0, 0, 0]);
        assert_eq!(cs.initial_color().as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn icc_falls_back_to_alternate() {
        let mut xref = XRef::new();
        let dict = parse_object(b"<< /N 3 /Alternate /DeviceCMYK >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();
        xref.insert(ObjRef::new(5, 0), Stream::new(dict, b"garbage".to_vec()));

        let cs = ColorSpace::new(&parse_object(b"[/ICCBased 5 0 R]").unwrap(), &xref).unwrap();
        assert!(matches!(cs, ColorSpace::DeviceCmyk));

        let dict = parse_object(b"<< /N 1 >>").unwrap().cast::<Dict>().unwrap();
        xref.insert(ObjRef::new(6, 0), Stream::new(dict, b"garbage".to_vec()));

        let cs = ColorSpace::new(&parse_object(b"[/ICCBased 6 0 R]").unwrap(), &xref).unwrap();
        assert!(matches!(cs, ColorSpace::DeviceGray));
    }

    #[test]
    fn icc_keeps_alternate() {
        let profile = moxcms::ColorProfile::new_gray_with_gamma(2.2)
            .encode()
            .unwrap();
        let mut xref = XRef::new();

        for (id, dict) in [
            (7, &b"<< /N 1 /Alternate [/CalGray << /WhitePoint [0.9505 1 1.089] >>] >>"[..]),
            (8, &b"<< /N 1 /Alternate /DeviceRGB >>"[..]),
        ] {
            let dict = parse_object(dict).unwrap().cast::<Dict>().unwrap();
            xref.insert(ObjRef::new(id, 0), Stream::new(dict, profile.clone()));
        }

        let cs = ColorSpace::new(&parse_object(b"[/ICCBased 7 0 R]").unwrap(), &xref).unwrap();
        let ColorSpace::IccBased(icc) = &cs else {
            panic!("expected an ICC color space, got {cs:?}");
        };
        assert!(matches!(icc.alternate(), ColorSpace::CalGray(_)));
        assert_eq!(cs.num_components(), 1);

        // An alternate with the wrong number of components is replaced.
        let cs = ColorSpace::new(&parse_object(b"[/ICCBased 8 0 R]").unwrap(), &xref).unwrap();
        let ColorSpace::IccBased(icc) = &cs else {
            panic!("expected an ICC color space, got {cs:?}");
        };
        assert!(matches!(icc.alternate(), ColorSpace::DeviceGray));

        // Two samples for three pixels are rejected by the profile transform.
        let mut out = [7; 9];
        assert_eq!(cs.convert_u8(&[0, 255], &mut out, DEFAULT_BLACK_RATIO), Some(()));
        assert_eq!(out, [0, 0, 0, 255, 255, 255, 7, 7, 7]);
    }

    #[test]
    fn decode_arrays_and_initial_colors() {
        assert_eq!(
            ColorSpace::DeviceCmyk.default_decode_array(8).as_slice(),
            &[(0.0, 1.0); 4]
        );
        assert_eq!(
            color_space(b"[/Lab << /WhitePoint [0.95 1 1.09] >>]")
                .default_decode_array(8)
                .as_slice(),
            &[(0.0, 100.0), (-100.0, 100.0), (-100.0, 100.0)]
        );
        assert_eq!(
            ColorSpace::DeviceCmyk.initial_color().as_slice(),
            &[0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(ColorSpace::DeviceRgb.initial_color().as_slice(), &[0.0; 3]);
    }

    #[test]
    fn pattern() {
        let cs = color_space(b"[/Pattern /DeviceRGB]");

        assert_eq!(cs.num_components(), 3);
        assert_eq!(ColorSpace::Pattern(None).num_components(), 1);
        assert_eq!(ColorSpace::Pattern(None).to_rgb(&[1.0]), [0, 0, 0]);
    }
}
