/*!
Colors, images and draw commands for rime.

This crate builds on the object model of `rime-syntax`:

- [`ColorSpace`] converts colors of any PDF color space to sRGB.
- [`ImageStream`] decodes image XObjects and inline images into RGBA
  [`Raster`]s, including all kinds of masks.
- [`interpret`] turns a content stream into a [`DrawList`], which can be
  replayed against a [`GraphicsContext`] with [`replay`]. Painting inside
  hidden optional content is skipped according to an [`OcgConfig`].

# Example
```
use kurbo::{Affine, BezPath};
use rime_interpret::{
    DecodeConfig, FillRule, GraphicsContext, OcgConfig, Raster, Resources, Rgb, StrokeProps,
    interpret, replay,
};
use rime_syntax::XRef;
use rime_syntax::object::Dict;
use std::sync::Arc;

#[derive(Default)]
struct Counter {
    fills: usize,
}

impl GraphicsContext for Counter {
    fn set_transform(&mut self, _: Affine) {}
    fn set_fill_color(&mut self, _: Rgb) {}
    fn set_stroke_color(&mut self, _: Rgb) {}
    fn set_alpha(&mut self, _: f32, _: bool) {}
    fn set_stroke_properties(&mut self, _: &StrokeProps) {}
    fn push_state(&mut self) {}
    fn pop_state(&mut self) {}
    fn clip(&mut self, _: &BezPath, _: FillRule) {}
    fn fill_path(&mut self, _: &BezPath, _: FillRule) {
        self.fills += 1;
    }
    fn stroke_path(&mut self, _: &BezPath) {}
    fn draw_image(&mut self, _: &Raster) {}
}

let resources = Arc::new(Resources::new(&Dict::new(), Arc::new(XRef::new())));
let list = interpret(
    b"0 0 0 1 k 0 0 100 100 re f",
    &resources,
    Affine::IDENTITY,
    Arc::new(DecodeConfig::default()),
);

let mut counter = Counter::default();
replay(&list, &mut counter, &OcgConfig::all_visible());

assert_eq!(counter.fills, 1);
```

# Cargo features
- `jpx`: decode JPX images with `hayro-jpeg2000`.
- `jbig2`: prefer `hayro-jbig2` over the internal JBIG2 decoder.
- `fax`: allow routing Group 4 data through the `fax` crate.
*/

#![forbid(unsafe_code)]

mod bit_reader;
pub mod color;
pub mod config;
pub mod draw;
mod function;
pub mod image;
pub mod interpret;
pub mod ocg;
pub mod resources;
mod util;

pub use color::{ColorComponents, ColorSpace, Rgb, cmyk_to_rgb};
pub use config::{DecodeConfig, Jbig2Backend, RasterReader, RawRaster};
pub use draw::{DrawCommand, DrawList, FillRule, GraphicsContext, StrokeProps, replay};
pub use image::{ImageDescriptor, ImageStream, Raster};
pub use interpret::{Interpreter, interpret};
pub use ocg::{OcMembership, OcgConfig, OptionalContentState, VisibilityPolicy};
pub use resources::Resources;
