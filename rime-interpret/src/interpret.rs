//! Interpreting content streams into draw lists.

use crate::color::{ColorComponents, ColorSpace, Rgb};
use crate::config::DecodeConfig;
use crate::draw::{DrawCommand, DrawList, FillRule, StrokeProps};
use crate::image::ImageStream;
use crate::ocg::OcMembership;
use crate::resources::Resources;
use crate::util::OptionLog;
use kurbo::{Affine, BezPath, Cap, Join, Point, Rect, Shape};
use log::{debug, warn};
use rime_syntax::content::{Instruction, Tokenizer};
use rime_syntax::object::dict::keys::{
    AIS, BBOX, CA, CA_NS, D, FORM, IMAGE, LC, LJ, LW, MATRIX, ML, OC, RESOURCES, SUBTYPE,
};
use rime_syntax::object::{Array, Dict, Name, ObjRef, Object, Stream};
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// The maximum nesting of form XObjects.
const MAX_FORM_DEPTH: usize = 16;

#[derive(Clone, Debug)]
struct State {
    ctm: Affine,
    fill_cs: ColorSpace,
    fill_color: ColorComponents,
    fill_rgb: Rgb,
    stroke_cs: ColorSpace,
    stroke_color: ColorComponents,
    stroke: StrokeProps,
    alpha_is_shape: bool,
}

impl State {
    fn new(ctm: Affine) -> Self {
        Self {
            ctm,
            fill_cs: ColorSpace::DeviceGray,
            fill_color: smallvec![0.0],
            fill_rgb: [0, 0, 0],
            stroke_cs: ColorSpace::DeviceGray,
            stroke_color: smallvec![0.0],
            stroke: StrokeProps::default(),
            alpha_is_shape: false,
        }
    }
}

/// Builds draw lists from content streams.
///
/// Image XObjects are shared between all content streams interpreted by the
/// same interpreter, so their decoded rasters are cached across pages.
pub struct Interpreter {
    config: Arc<DecodeConfig>,
    images: FxHashMap<ObjRef, Arc<ImageStream>>,
    commands: Vec<DrawCommand>,
    states: Vec<State>,
    path: BezPath,
    last_point: Point,
    sub_path_start: Point,
    pending_clip: Option<FillRule>,
    forms: SmallVec<[ObjRef; 4]>,
    form_depth: usize,
}

impl Interpreter {
    /// Create a new interpreter.
    pub fn new(config: Arc<DecodeConfig>) -> Self {
        Self {
            config,
            images: FxHashMap::default(),
            commands: Vec::new(),
            states: Vec::new(),
            path: BezPath::new(),
            last_point: Point::ZERO,
            sub_path_start: Point::ZERO,
            pending_clip: None,
            forms: SmallVec::new(),
            form_depth: 0,
        }
    }

    /// Interpret a content stream. `initial_transform` maps user space to
    /// device space.
    pub fn interpret(
        &mut self,
        content: &[u8],
        resources: &Arc<Resources>,
        initial_transform: Affine,
    ) -> DrawList {
        self.commands.clear();
        self.states.clear();
        self.states.push(State::new(initial_transform));
        self.path = BezPath::new();
        self.pending_clip = None;

        self.commands.push(DrawCommand::SetTransform(initial_transform));
        self.run(content, resources);

        DrawList::new(std::mem::take(&mut self.commands))
    }

    /// The number of cached image XObjects.
    pub fn num_cached_images(&self) -> usize {
        self.images.len()
    }

    fn state(&self) -> &State {
        // There is always at least one state while running.
        &self.states[self.states.len() - 1]
    }

    fn state_mut(&mut self) -> &mut State {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    fn run(&mut self, content: &[u8], resources: &Arc<Resources>) {
        let base_states = self.states.len();
        // Whether each open marked content sequence entered optional content.
        let mut marked_content: Vec<bool> = Vec::new();

        for instruction in Tokenizer::new(content) {
            match &*instruction.operator {
                b"q" => self.save_state(),
                b"Q" => {
                    if self.states.len() > base_states {
                        self.restore_state();
                    } else {
                        debug!("ignoring unbalanced Q");
                    }
                }
                b"cm" => {
                    if let Some([a, b, c, d, e, f]) = numbers(&instruction) {
                        let state = self.state_mut();
                        state.ctm *= Affine::new([a, b, c, d, e, f]);
                        let ctm = state.ctm;

                        self.push(DrawCommand::SetTransform(ctm));
                    }
                }
                b"w" => {
                    if let Some([w]) = numbers(&instruction) {
                        self.state_mut().stroke.line_width = w as f32;
                        self.stroke_changed();
                    }
                }
                b"J" => {
                    if let Some(cap) = instruction.operand::<i32>(0).and_then(line_cap) {
                        self.state_mut().stroke.line_cap = cap;
                        self.stroke_changed();
                    }
                }
                b"j" => {
                    if let Some(join) = instruction.operand::<i32>(0).and_then(line_join) {
                        self.state_mut().stroke.line_join = join;
                        self.stroke_changed();
                    }
                }
                b"M" => {
                    if let Some([limit]) = numbers(&instruction) {
                        self.state_mut().stroke.miter_limit = limit as f32;
                        self.stroke_changed();
                    }
                }
                b"d" => {
                    if let (Some(array), Some(phase)) = (
                        instruction.operand::<Array>(0),
                        instruction.operand::<f32>(1),
                    ) {
                        self.set_dash(&array, phase);
                    }
                }
                b"g" | b"G" | b"rg" | b"RG" | b"k" | b"K" => {
                    let stroke = instruction.operator[0].is_ascii_uppercase();
                    let cs = match instruction.operator.len() {
                        1 if instruction.operator[0].eq_ignore_ascii_case(&b'g') => {
                            ColorSpace::DeviceGray
                        }
                        1 => ColorSpace::DeviceCmyk,
                        _ => ColorSpace::DeviceRgb,
                    };

                    if let Some(components) = instruction.numbers() {
                        self.set_color(stroke, Some(cs), components.into_iter().collect());
                    }
                }
                b"cs" | b"CS" => {
                    let stroke = instruction.operator[0] == b'C';

                    if let Some(cs) = instruction
                        .operand::<Object>(0)
                        .and_then(|o| resources.resolve_color_space(&o))
                        .warn_none("failed to resolve color space")
                    {
                        let initial = cs.initial_color();
                        self.set_color(stroke, Some(cs), initial);
                    }
                }
                b"sc" | b"scn" | b"SC" | b"SCN" => {
                    let stroke = instruction.operator[0] == b'S';
                    // A trailing pattern name is ignored.
                    let components = instruction
                        .operands
                        .iter()
                        .filter_map(|o| o.cast::<f32>())
                        .collect();

                    self.set_color(stroke, None, components);
                }
                b"m" => {
                    if let Some([x, y]) = numbers(&instruction) {
                        let p = Point::new(x, y);
                        self.path.move_to(p);
                        self.last_point = p;
                        self.sub_path_start = p;
                    }
                }
                b"l" => {
                    if let Some([x, y]) = numbers(&instruction) {
                        self.ensure_sub_path();

                        let p = Point::new(x, y);
                        self.path.line_to(p);
                        self.last_point = p;
                    }
                }
                b"c" => {
                    if let Some([x1, y1, x2, y2, x3, y3]) = numbers(&instruction) {
                        self.curve_to(Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3));
                    }
                }
                b"v" => {
                    if let Some([x2, y2, x3, y3]) = numbers(&instruction) {
                        self.curve_to(self.last_point, Point::new(x2, y2), Point::new(x3, y3));
                    }
                }
                b"y" => {
                    if let Some([x1, y1, x3, y3]) = numbers(&instruction) {
                        let p3 = Point::new(x3, y3);
                        self.curve_to(Point::new(x1, y1), p3, p3);
                    }
                }
                b"h" => self.close_path(),
                b"re" => {
                    if let Some([x, y, w, h]) = numbers(&instruction) {
                        self.path
                            .extend(Rect::new(x, y, x + w, y + h).path_elements(0.1));
                        self.last_point = Point::new(x, y);
                        self.sub_path_start = self.last_point;
                    }
                }
                b"f" | b"F" => self.paint(Some(FillRule::NonZero), false),
                b"f*" => self.paint(Some(FillRule::EvenOdd), false),
                b"S" => self.paint(None, false),
                b"s" => {
                    self.close_path();
                    self.paint(None, true);
                }
                b"B" => self.paint(Some(FillRule::NonZero), true),
                b"B*" => self.paint(Some(FillRule::EvenOdd), true),
                b"b" => {
                    self.close_path();
                    self.paint(Some(FillRule::NonZero), true);
                }
                b"b*" => {
                    self.close_path();
                    self.paint(Some(FillRule::EvenOdd), true);
                }
                b"n" => self.end_path(),
                b"W" => self.pending_clip = Some(FillRule::NonZero),
                b"W*" => self.pending_clip = Some(FillRule::EvenOdd),
                b"gs" => {
                    if let Some(gs) = instruction
                        .operand::<Name>(0)
                        .and_then(|n| resources.get_ext_g_state(&n))
                        .warn_none("failed to get extgstate")
                    {
                        self.set_graphics_state(&gs, resources);
                    }
                }
                b"Do" => {
                    if let Some(name) = instruction.operand::<Name>(0) {
                        match resources.get_x_object(&name) {
                            Some(x_object) => self.draw_x_object(x_object, resources),
                            None => warn!("failed to get XObject {}", name.as_str()),
                        }
                    }
                }
                b"BI" => {
                    if let Some(stream) = instruction.operand::<Stream>(0) {
                        let image = Arc::new(ImageStream::new(stream, self.config.clone()));
                        self.draw_image(image, resources);
                    }
                }
                b"BMC" => marked_content.push(false),
                b"BDC" => {
                    let membership = (instruction.operand::<Name>(0).as_deref() == Some(OC))
                        .then(|| marked_content_membership(&instruction, resources))
                        .flatten();

                    let entered = match membership {
                        Some(membership) => {
                            self.push(DrawCommand::PushOcg(membership));
                            true
                        }
                        None => false,
                    };

                    marked_content.push(entered);
                }
                b"EMC" => match marked_content.pop() {
                    Some(true) => self.push(DrawCommand::PopOcg),
                    Some(false) => {}
                    None => debug!("ignoring unbalanced EMC"),
                },
                // Text, shadings, Type 3 glyph metrics and compatibility
                // sections don't produce draw commands.
                b"BT" | b"ET" | b"Tc" | b"Tw" | b"Tz" | b"TL" | b"Tf" | b"Tr" | b"Ts" | b"Td"
                | b"TD" | b"Tm" | b"T*" | b"Tj" | b"TJ" | b"'" | b"\"" | b"sh" | b"d0" | b"d1"
                | b"BX" | b"EX" | b"MP" | b"DP" | b"ri" | b"i" => {}
                other => debug!("skipping unknown operator {}", String::from_utf8_lossy(other)),
            }
        }

        for entered in marked_content.into_iter().rev() {
            if entered {
                self.push(DrawCommand::PopOcg);
            }
        }

        while self.states.len() > base_states {
            self.restore_state();
        }
    }

    fn save_state(&mut self) {
        let state = self.state().clone();
        self.states.push(state);
        self.push(DrawCommand::PushState);
    }

    fn restore_state(&mut self) {
        self.states.pop();
        self.push(DrawCommand::PopState);
    }

    fn stroke_changed(&mut self) {
        let props = self.state().stroke.clone();
        self.push(DrawCommand::SetStroke(props));
    }

    fn set_dash(&mut self, array: &Array, phase: f32) {
        let dash_array = array.iter_as::<f32>().collect::<SmallVec<_>>();

        // A dash array of zeros would never advance.
        let stroke = &mut self.state_mut().stroke;
        if dash_array.iter().all(|d| *d == 0.0) {
            stroke.dash_array = SmallVec::new();
            stroke.dash_offset = 0.0;
        } else {
            stroke.dash_array = dash_array;
            stroke.dash_offset = phase;
        }

        self.stroke_changed();
    }

    fn set_color(&mut self, stroke: bool, cs: Option<ColorSpace>, components: ColorComponents) {
        let black_ratio = self.config.black_ratio;
        let state = self.state_mut();

        let cs = match cs {
            Some(cs) => cs,
            None if stroke => state.stroke_cs.clone(),
            None => state.fill_cs.clone(),
        };

        if matches!(cs, ColorSpace::Pattern(_)) {
            debug!("pattern colors are not supported");
        }

        let rgb = cs.to_rgb_with(&components, black_ratio);

        if stroke {
            state.stroke_cs = cs;
            state.stroke_color = components;
            self.push(DrawCommand::SetStrokeColor(rgb));
        } else {
            state.fill_cs = cs;
            state.fill_color = components;
            state.fill_rgb = rgb;
            self.push(DrawCommand::SetFillColor(rgb));
        }
    }

    fn ensure_sub_path(&mut self) {
        if self.path.elements().is_empty() {
            self.path.move_to(self.last_point);
        }
    }

    fn curve_to(&mut self, p1: Point, p2: Point, p3: Point) {
        self.ensure_sub_path();
        self.path.curve_to(p1, p2, p3);
        self.last_point = p3;
    }

    fn close_path(&mut self) {
        if !self.path.elements().is_empty() {
            self.path.close_path();
        }

        self.last_point = self.sub_path_start;
    }

    fn paint(&mut self, fill: Option<FillRule>, stroke: bool) {
        if !self.path.elements().is_empty() {
            if let Some(rule) = fill {
                let path = self.path.clone();
                self.push(DrawCommand::FillPath { path, rule });
            }

            if stroke || fill.is_none() {
                let path = self.path.clone();
                self.push(DrawCommand::StrokePath(path));
            }
        }

        self.end_path();
    }

    /// End the current path, which becomes the clip path if `W` or `W*` was
    /// used.
    fn end_path(&mut self) {
        let path = std::mem::take(&mut self.path);

        if let Some(rule) = self.pending_clip.take() {
            self.push(DrawCommand::Clip { path, rule });
        }
    }

    fn set_graphics_state(&mut self, gs: &Dict, resources: &Resources) {
        let xref = resources.xref();

        if let Some(ais) = xref.get::<bool>(gs, AIS) {
            self.state_mut().alpha_is_shape = ais;
        }

        let paint_alpha = !self.state().alpha_is_shape;

        for (key, stroke) in [(CA, true), (CA_NS, false)] {
            if let Some(alpha) = xref.get::<f32>(gs, key) {
                self.push(DrawCommand::SetAlpha {
                    alpha: alpha.clamp(0.0, 1.0),
                    stroke,
                    paint_alpha,
                });
            }
        }

        let mut stroke_changed = false;
        let stroke = &mut self.state_mut().stroke;

        if let Some(width) = xref.get::<f32>(gs, LW) {
            stroke.line_width = width;
            stroke_changed = true;
        }

        if let Some(cap) = xref.get::<i32>(gs, LC).and_then(line_cap) {
            stroke.line_cap = cap;
            stroke_changed = true;
        }

        if let Some(join) = xref.get::<i32>(gs, LJ).and_then(line_join) {
            stroke.line_join = join;
            stroke_changed = true;
        }

        if let Some(limit) = xref.get::<f32>(gs, ML) {
            stroke.miter_limit = limit;
            stroke_changed = true;
        }

        if let Some(dash) = xref.get::<Array>(gs, D) {
            // `[dash_array dash_phase]`
            if let (Some(array), Some(phase)) =
                (xref.get_item::<Array>(&dash, 0), xref.get_item::<f32>(&dash, 1))
            {
                self.set_dash(&array, phase);
            }
        } else if stroke_changed {
            self.stroke_changed();
        }
    }

    fn draw_x_object(&mut self, x_object: Stream, resources: &Arc<Resources>) {
        let xref = resources.xref();
        let dict = x_object.dict();
        let membership = dict
            .get_raw(OC)
            .and_then(|oc| OcMembership::resolve(oc, xref));

        if let Some(membership) = &membership {
            self.push(DrawCommand::PushOcg(membership.clone()));
        }

        match xref.get::<Name>(dict, SUBTYPE).as_deref() {
            Some(IMAGE) => {
                let image = match x_object.reference() {
                    Some(reference) => self
                        .images
                        .entry(reference)
                        .or_insert_with(|| {
                            Arc::new(ImageStream::new(x_object.clone(), self.config.clone()))
                        })
                        .clone(),
                    None => Arc::new(ImageStream::new(x_object.clone(), self.config.clone())),
                };

                self.draw_image(image, resources);
            }
            Some(FORM) => self.draw_form(&x_object, resources),
            other => warn!("unknown XObject subtype {other:?}"),
        }

        if membership.is_some() {
            self.push(DrawCommand::PopOcg);
        }
    }

    fn draw_image(&mut self, image: Arc<ImageStream>, resources: &Arc<Resources>) {
        let fill = self.state().fill_rgb;

        self.push(DrawCommand::DrawImage {
            image,
            resources: resources.clone(),
            fill,
        });
    }

    fn draw_form(&mut self, form: &Stream, resources: &Arc<Resources>) {
        if self.form_depth >= MAX_FORM_DEPTH {
            warn!("form XObjects are nested too deeply");

            return;
        }

        if let Some(reference) = form.reference() {
            if self.forms.contains(&reference) {
                warn!("form XObject {reference} draws itself");

                return;
            }

            self.forms.push(reference);
        }

        let Some(content) = form
            .decoded(resources.xref())
            .inspect_err(|e| warn!("failed to decode form XObject: {e}"))
            .ok()
        else {
            if form.reference().is_some() {
                self.forms.pop();
            }

            return;
        };

        let xref = resources.xref();
        let dict = form.dict();
        let matrix = xref
            .get::<Array>(dict, MATRIX)
            .map(|m| m.iter_as::<f64>().collect::<SmallVec<[f64; 6]>>())
            .and_then(|m| <[f64; 6]>::try_from(m.as_slice()).ok())
            .map(Affine::new)
            .unwrap_or_default();
        let bbox = xref
            .get::<Array>(dict, BBOX)
            .map(|b| b.iter_as::<f64>().collect::<SmallVec<[f64; 4]>>())
            .and_then(|b| <[f64; 4]>::try_from(b.as_slice()).ok());

        let form_resources = match xref.get_dict(dict, RESOURCES) {
            Some(r) => Arc::new(Resources::from_parent(&r, resources.as_ref().clone())),
            None => resources.clone(),
        };

        self.save_state();

        let state = self.state_mut();
        state.ctm *= matrix;
        let ctm = state.ctm;
        self.push(DrawCommand::SetTransform(ctm));

        if let Some([x0, y0, x1, y1]) = bbox {
            self.push(DrawCommand::Clip {
                path: Rect::new(x0, y0, x1, y1).abs().to_path(0.1),
                rule: FillRule::NonZero,
            });
        }

        // The path is not part of the graphics state.
        let path = std::mem::take(&mut self.path);
        let pending_clip = self.pending_clip.take();

        self.form_depth += 1;
        self.run(&content, &form_resources);
        self.form_depth -= 1;

        self.path = path;
        self.pending_clip = pending_clip;
        self.restore_state();

        if form.reference().is_some() {
            self.forms.pop();
        }
    }
}

/// Interpret a content stream into a draw list.
pub fn interpret(
    content: &[u8],
    resources: &Arc<Resources>,
    initial_transform: Affine,
    config: Arc<DecodeConfig>,
) -> DrawList {
    Interpreter::new(config).interpret(content, resources, initial_transform)
}

fn marked_content_membership(
    instruction: &Instruction,
    resources: &Resources,
) -> Option<OcMembership> {
    let properties = match instruction.operand::<Object>(1)? {
        Object::Name(name) => resources
            .get_property(&name)
            .warn_none("failed to get marked content properties")?,
        other => other,
    };

    OcMembership::resolve(&properties, resources.xref())
}

/// The last `N` operands as numbers.
fn numbers<const N: usize>(instruction: &Instruction) -> Option<[f64; N]> {
    let operands = &instruction.operands;

    if operands.len() < N {
        warn!(
            "too few operands for {}",
            String::from_utf8_lossy(&instruction.operator)
        );

        return None;
    }

    let mut out = [0.0; N];

    for (operand, value) in operands[operands.len() - N..].iter().zip(out.iter_mut()) {
        *value = operand.cast::<f64>()?;
    }

    Some(out)
}

fn line_cap(value: i32) -> Option<Cap> {
    match value {
        0 => Some(Cap::Butt),
        1 => Some(Cap::Round),
        2 => Some(Cap::Square),
        _ => None,
    }
}

fn line_join(value: i32) -> Option<Join> {
    match value {
        0 => Some(Join::Miter),
        1 => Some(Join::Round),
        2 => Some(Join::Bevel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::{XRef, parse_object};

    fn run(content: &[u8]) -> DrawList {
        let resources = Arc::new(Resources::new(&Dict::new(), Arc::new(XRef::new())));

        interpret(content, &resources, Affine::IDENTITY, Arc::default())
    }

    fn run_with(content: &[u8], resources: &[u8], xref: XRef) -> DrawList {
        let dict = parse_object(resources).unwrap().cast::<Dict>().unwrap();
        let resources = Arc::new(Resources::new(&dict, Arc::new(xref)));

        interpret(content, &resources, Affine::IDENTITY, Arc::default())
    }

    fn names(list: &DrawList) -> Vec<&'static str> {
        list.commands()
            .iter()
            .map(|c| match c {
                DrawCommand::SetAlpha { .. } => "alpha",
                DrawCommand::SetFillColor(_) => "fill-color",
                DrawCommand::SetStrokeColor(_) => "stroke-color",
                DrawCommand::SetStroke(_) => "stroke-props",
                DrawCommand::SetTransform(_) => "transform",
                DrawCommand::PushState => "push",
                DrawCommand::PopState => "pop",
                DrawCommand::Clip { .. } => "clip",
                DrawCommand::FillPath { .. } => "fill",
                DrawCommand::StrokePath(_) => "stroke",
                DrawCommand::DrawImage { .. } => "image",
                DrawCommand::PushOcg(_) => "push-ocg",
                DrawCommand::PopOcg => "pop-ocg",
            })
            .collect()
    }

    #[test]
    fn paths_and_state() {
        let list = run(b"q 1 0 0 rg 0 0 10 10 re f 2 w 0 0 m 5 5 l S Q");

        assert_eq!(
            names(&list),
            [
                "transform",
                "push",
                "fill-color",
                "fill",
                "stroke-props",
                "stroke",
                "pop"
            ]
        );

        let DrawCommand::SetFillColor(color) = &list.commands()[2] else {
            panic!("expected a fill color");
        };
        assert_eq!(*color, [255, 0, 0]);
    }

    #[test]
    fn cmyk_colors() {
        let list = run(b"0 0 0 1 k 0 0 0 0 K");

        assert!(matches!(
            list.commands()[1],
            DrawCommand::SetFillColor([0, 0, 0])
        ));
        assert!(matches!(
            list.commands()[2],
            DrawCommand::SetStrokeColor([255, 255, 255])
        ));
    }

    #[test]
    fn clip_applies_after_painting() {
        let list = run(b"0 0 10 10 re W* n 0 0 5 5 re f");

        assert_eq!(names(&list), ["transform", "clip", "fill"]);
        assert!(matches!(
            list.commands()[1],
            DrawCommand::Clip {
                rule: FillRule::EvenOdd,
                ..
            }
        ));
    }

    #[test]
    fn unbalanced_state_is_closed() {
        let list = run(b"Q q q 1 g");

        assert_eq!(
            names(&list),
            ["transform", "push", "push", "fill-color", "pop", "pop"]
        );
    }

    #[test]
    fn unknown_operators_are_skipped() {
        let list = run(b"BT /F1 12 Tf (Hello) Tj ET 1 2 foo 0 0 m 1 1 l S");

        assert_eq!(names(&list), ["transform", "stroke"]);
    }

    #[test]
    fn graphics_state() {
        let list = run_with(
            b"/GS1 gs /GS2 gs",
            b"<< /ExtGState << /GS1 << /CA 0.5 /ca 0.25 /LW 3 >> /GS2 << /AIS true /ca 0.1 >> >> >>",
            XRef::new(),
        );

        let commands = list.commands();
        assert!(matches!(
            commands[1],
            DrawCommand::SetAlpha {
                stroke: true,
                paint_alpha: true,
                ..
            }
        ));
        assert!(matches!(
            commands[2],
            DrawCommand::SetAlpha {
                stroke: false,
                paint_alpha: true,
                ..
            }
        ));
        assert!(matches!(&commands[3], DrawCommand::SetStroke(s) if s.line_width == 3.0));
        assert!(matches!(
            commands[4],
            DrawCommand::SetAlpha {
                paint_alpha: false,
                ..
            }
        ));
    }

    #[test]
    fn marked_content() {
        let mut xref = XRef::new();
        xref.insert(
            ObjRef::new(5, 0),
            parse_object(b"<< /Type /OCG /Name (Layer) >>").unwrap(),
        );

        let list = run_with(
            b"/OC /L1 BDC 0 0 1 1 re f /Span BMC EMC EMC /OC /Unknown BDC EMC",
            b"<< /Properties << /L1 5 0 R >> >>",
            xref,
        );

        assert_eq!(names(&list), ["transform", "push-ocg", "fill", "pop-ocg"]);
    }

    #[test]
    fn forms_are_expanded() {
        let mut xref = XRef::new();
        let form = parse_object(
            b"<< /Type /XObject /Subtype /Form /BBox [0 0 10 10] /Matrix [2 0 0 2 0 0] >>",
        )
        .unwrap()
        .cast::<Dict>()
        .unwrap();
        xref.insert(
            ObjRef::new(3, 0),
            Stream::new(form, b"0 0 1 1 re f q".to_vec()).with_reference(ObjRef::new(3, 0)),
        );

        let list = run_with(b"/Fm0 Do", b"<< /XObject << /Fm0 3 0 R >> >>", xref);

        assert_eq!(
            names(&list),
            ["transform", "push", "transform", "clip", "fill", "push", "pop", "pop"]
        );
        assert!(matches!(
            list.commands()[2],
            DrawCommand::SetTransform(t) if t == Affine::scale(2.0)
        ));
    }

    #[test]
    fn recursive_form_stops() {
        let mut xref = XRef::new();
        let form = parse_object(b"<< /Subtype /Form /Resources << /XObject << /Fm0 3 0 R >> >> >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();
        xref.insert(
            ObjRef::new(3, 0),
            Stream::new(form, b"/Fm0 Do".to_vec()).with_reference(ObjRef::new(3, 0)),
        );

        let list = run_with(b"/Fm0 Do", b"<< /XObject << /Fm0 3 0 R >> >>", xref);

        assert_eq!(names(&list), ["transform", "push", "transform", "pop"]);
    }

    #[test]
    fn images_are_cached() {
        let mut xref = XRef::new();
        let image = parse_object(b"<< /Subtype /Image /Width 1 /Height 1 /ColorSpace /DeviceGray >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();
        xref.insert(
            ObjRef::new(7, 0),
            Stream::new(image, vec![0x80]).with_reference(ObjRef::new(7, 0)),
        );

        let dict = parse_object(b"<< /XObject << /Im0 7 0 R >> >>")
            .unwrap()
            .cast::<Dict>()
            .unwrap();
        let resources = Arc::new(Resources::new(&dict, Arc::new(xref)));
        let mut interpreter = Interpreter::new(Arc::default());

        let list = interpreter.interpret(b"/Im0 Do /Im0 Do", &resources, Affine::IDENTITY);

        let images = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawImage { image, .. } => Some(image.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(images.len(), 2);
        assert!(Arc::ptr_eq(&images[0], &images[1]));
        assert_eq!(interpreter.num_cached_images(), 1);
    }

    #[test]
    fn inline_image() {
        let list = run(b"q 1 0 0 1 0 0 cm BI /W 1 /H 1 /CS /G /BPC 8 ID \x80 EI Q");

        assert_eq!(names(&list), ["transform", "push", "transform", "image", "pop"]);
    }
}
