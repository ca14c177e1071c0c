//! Draw commands.
//!
//! A content stream is interpreted once into a [`DrawList`], which can then be
//! replayed any number of times against a [`GraphicsContext`], for example at
//! different zoom levels or from different threads.

use crate::color::Rgb;
use crate::image::{ImageStream, Raster};
use crate::ocg::{OcMembership, OcgConfig, OptionalContentState};
use crate::resources::Resources;
use kurbo::{Affine, BezPath, Cap, Join};
use log::warn;
use smallvec::SmallVec;
use std::sync::Arc;

/// The rule that decides which areas are inside a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// The nonzero winding number rule.
    #[default]
    NonZero,
    /// The even-odd rule.
    EvenOdd,
}

/// The properties used for stroking.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeProps {
    /// The line width.
    pub line_width: f32,
    /// The line cap.
    pub line_cap: Cap,
    /// The line join.
    pub line_join: Join,
    /// The miter limit.
    pub miter_limit: f32,
    /// The dash array.
    pub dash_array: SmallVec<[f32; 4]>,
    /// The dash offset.
    pub dash_offset: f32,
}

impl Default for StrokeProps {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_cap: Cap::Butt,
            line_join: Join::Miter,
            miter_limit: 10.0,
            dash_array: SmallVec::new(),
            dash_offset: 0.0,
        }
    }
}

/// A single drawing operation.
#[derive(Clone, Debug)]
pub enum DrawCommand {
    /// Set the constant alpha for filling or stroking.
    SetAlpha {
        /// The alpha value.
        alpha: f32,
        /// Whether this is the stroking alpha.
        stroke: bool,
        /// Whether the alpha applies to painting. It doesn't if it is meant
        /// as a shape (`/AIS true`).
        paint_alpha: bool,
    },
    /// Set the fill color.
    SetFillColor(Rgb),
    /// Set the stroke color.
    SetStrokeColor(Rgb),
    /// Set the stroke properties.
    SetStroke(StrokeProps),
    /// Set the transform from user space to device space.
    SetTransform(Affine),
    /// Save the graphics state.
    PushState,
    /// Restore the last saved graphics state.
    PopState,
    /// Intersect the clip with a path, until the next `PopState`.
    Clip {
        /// The path.
        path: BezPath,
        /// The fill rule.
        rule: FillRule,
    },
    /// Fill a path with the fill color.
    FillPath {
        /// The path.
        path: BezPath,
        /// The fill rule.
        rule: FillRule,
    },
    /// Stroke a path with the stroke color.
    StrokePath(BezPath),
    /// Draw an image into the unit square of the current transform.
    DrawImage {
        /// The image.
        image: Arc<ImageStream>,
        /// The resources the image is resolved with.
        resources: Arc<Resources>,
        /// The color image masks are painted with.
        fill: Rgb,
    },
    /// Enter optional content.
    PushOcg(OcMembership),
    /// Leave the innermost optional content.
    PopOcg,
}

/// An immutable list of draw commands.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Create a new list.
    pub fn new(commands: Vec<DrawCommand>) -> Self {
        Self { commands }
    }

    /// The commands.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// The number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl FromIterator<DrawCommand> for DrawList {
    fn from_iter<T: IntoIterator<Item = DrawCommand>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A target that draw commands are replayed against.
///
/// Colors, alpha values, stroke properties, transforms and clips are part of
/// the graphics state that `push_state` and `pop_state` save and restore.
pub trait GraphicsContext {
    /// Set the transform from user space to device space.
    fn set_transform(&mut self, affine: Affine);
    /// Set the fill color.
    fn set_fill_color(&mut self, color: Rgb);
    /// Set the stroke color.
    fn set_stroke_color(&mut self, color: Rgb);
    /// Set the constant alpha for filling or stroking.
    fn set_alpha(&mut self, alpha: f32, stroke: bool);
    /// Set the properties for future stroking operations.
    fn set_stroke_properties(&mut self, props: &StrokeProps);
    /// Save the graphics state.
    fn push_state(&mut self);
    /// Restore the last saved graphics state.
    fn pop_state(&mut self);
    /// Intersect the clip with a path.
    fn clip(&mut self, path: &BezPath, rule: FillRule);
    /// Fill a path.
    fn fill_path(&mut self, path: &BezPath, rule: FillRule);
    /// Stroke a path.
    fn stroke_path(&mut self, path: &BezPath);
    /// Draw an image into the unit square of the current transform.
    fn draw_image(&mut self, raster: &Raster);
}

/// Replay a list against a context.
///
/// Painting commands inside hidden optional content are skipped, all other
/// commands always apply so that the state stays balanced.
pub fn replay(list: &DrawList, context: &mut impl GraphicsContext, config: &OcgConfig) {
    let mut ocg = OptionalContentState::new();

    for command in list.commands() {
        match command {
            DrawCommand::SetAlpha {
                alpha,
                stroke,
                paint_alpha,
            } => {
                if *paint_alpha {
                    context.set_alpha(*alpha, *stroke);
                }
            }
            DrawCommand::SetFillColor(color) => context.set_fill_color(*color),
            DrawCommand::SetStrokeColor(color) => context.set_stroke_color(*color),
            DrawCommand::SetStroke(props) => context.set_stroke_properties(props),
            DrawCommand::SetTransform(affine) => context.set_transform(*affine),
            DrawCommand::PushState => context.push_state(),
            DrawCommand::PopState => context.pop_state(),
            DrawCommand::Clip { path, rule } => context.clip(path, *rule),
            DrawCommand::FillPath { path, rule } => {
                if ocg.is_visible() {
                    context.fill_path(path, *rule);
                }
            }
            DrawCommand::StrokePath(path) => {
                if ocg.is_visible() {
                    context.stroke_path(path);
                }
            }
            DrawCommand::DrawImage {
                image,
                resources,
                fill,
            } => {
                if !ocg.is_visible() {
                    continue;
                }

                match image.image(*fill, resources) {
                    Some(raster) => context.draw_image(&raster),
                    None => warn!("skipping image that failed to decode"),
                }
            }
            DrawCommand::PushOcg(membership) => ocg.push(membership, config),
            DrawCommand::PopOcg => ocg.pop(),
        }
    }
}
