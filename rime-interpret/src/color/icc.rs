use log::warn;
use moxcms::{
    ColorProfile, DataColorSpace, Layout, Transform8BitExecutor, TransformF32Executor,
    TransformOptions,
};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

struct IccRepr {
    transform_u8: Arc<Transform8BitExecutor>,
    transform_f32: Arc<TransformF32Executor>,
    num_components: usize,
    is_srgb: bool,
    is_lab: bool,
}

/// An ICC profile, converting to sRGB.
#[derive(Clone)]
pub struct IccProfile(Arc<IccRepr>);

impl Debug for IccProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IccProfile({} components)", self.0.num_components)
    }
}

impl IccProfile {
    /// Parse a profile with 1, 3 or 4 components.
    pub(crate) fn new(profile: &[u8], num_components: usize) -> Option<Self> {
        let src_profile = ColorProfile::new_from_slice(profile)
            .inspect_err(|e| warn!("failed to parse ICC profile: {e:?}"))
            .ok()?;

        const SRGB_MARKER: &[u8] = b"sRGB";

        let is_srgb = num_components == 3
            && profile
                .get(52..56)
                .is_some_and(|device_model| device_model == SRGB_MARKER);
        let is_lab = src_profile.color_space == DataColorSpace::Lab;

        let src_layout = match num_components {
            1 => Layout::Gray,
            3 => Layout::Rgb,
            4 => Layout::Rgba,
            _ => {
                warn!("unsupported number of components {num_components} for ICC profile");

                return None;
            }
        };

        let dest_profile = ColorProfile::new_srgb();

        let transform_u8 = src_profile
            .create_transform_8bit(
                src_layout,
                &dest_profile,
                Layout::Rgb,
                TransformOptions::default(),
            )
            .ok()?;

        let transform_f32 = src_profile
            .create_transform_f32(
                src_layout,
                &dest_profile,
                Layout::Rgb,
                TransformOptions::default(),
            )
            .ok()?;

        Some(Self(Arc::new(IccRepr {
            transform_u8,
            transform_f32,
            num_components,
            is_srgb,
            is_lab,
        })))
    }

    /// The number of components of the profile.
    pub fn num_components(&self) -> usize {
        self.0.num_components
    }

    /// Whether the profile is a Lab profile, whose components are not in
    /// `[0, 1]`.
    pub(crate) fn is_lab(&self) -> bool {
        self.0.is_lab
    }

    pub(crate) fn convert_f32(&self, input: &[f32], output: &mut [u8]) -> Option<()> {
        let mut temp = vec![0.0_f32; output.len()];

        if self.is_lab() {
            // moxcms expects normalized values.
            let scaled = input
                .chunks_exact(3)
                .flat_map(|i| {
                    [
                        i[0] * (1.0 / 100.0),
                        (i[1] + 128.0) * (1.0 / 255.0),
                        (i[2] + 128.0) * (1.0 / 255.0),
                    ]
                })
                .collect::<Vec<_>>();
            self.0.transform_f32.transform(&scaled, &mut temp).ok()?;
        } else {
            self.0.transform_f32.transform(input, &mut temp).ok()?;
        }

        for (input, output) in temp.iter().zip(output.iter_mut()) {
            *output = (input.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        }

        Some(())
    }

    pub(crate) fn convert_u8(&self, input: &[u8], output: &mut [u8]) -> Option<()> {
        if self.0.is_srgb && input.len() == output.len() {
            output.copy_from_slice(input);
        } else {
            self.0.transform_u8.transform(input, output).ok()?;
        }

        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_rejected() {
        assert!(IccProfile::new(b"not a profile", 3).is_none());
        assert!(IccProfile::new(&[0; 200], 1).is_none());
    }
}
