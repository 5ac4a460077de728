//! Output sinks consumed by the render pass
//!
//! The pipeline is agnostic over where geometry lands: a raster surface
//! ([`PixmapOutput`]) or a pure geometric accumulator ([`ShapeOutput`]).
//! The only behavioral split the core is allowed to observe is
//! [`Output::is_soft_clipping_enabled`], which routes clip-paths to either
//! the native region clip or the mask-compositing path.
//!
//! An output is a scoped resource: the orchestrator acquires it, threads it
//! through the whole pass, and the top-level caller disposes it exactly
//! once afterwards.

use crate::clip::ClipShape;
use crate::geometry::containing_bounds_after_transform;
use crate::geometry::Point;
use crate::geometry::Rect;
use crate::path_util::append_path;
use tiny_skia::Color;
use tiny_skia::FillRule;
use tiny_skia::Mask;
use tiny_skia::MaskType;
use tiny_skia::Path;
use tiny_skia::PathBuilder;
use tiny_skia::Pixmap;
use tiny_skia::PixmapPaint;
use tiny_skia::Transform;

/// A paint installed on an output
#[derive(Debug, Clone)]
pub enum Paint {
  /// Plain fill color
  Solid(Color),
  /// Luminosity buffer modulating subsequent fills, anchored at a
  /// device-space origin
  LuminosityMask { surface: Pixmap, origin: Point },
}

/// Rendering sink driven by the orchestrator
pub trait Output {
  /// Fills `path` (in current user space) with the active paint.
  fn fill_path(&mut self, path: &Path);

  /// Intersects the active clip region with `shape` (in current user space).
  fn apply_clip(&mut self, shape: &ClipShape);

  /// Installs a paint produced on demand.
  ///
  /// Sinks that never realize paints (geometry accumulation) must not
  /// invoke the supplier; resource acquisition inside it is skipped
  /// entirely in that case. A supplier returning `None` leaves the current
  /// paint in place.
  fn set_paint(&mut self, supplier: &mut dyn FnMut() -> Option<Paint>);

  /// Runs diagnostic painting against this output. No-op for sinks without
  /// a visual surface.
  fn debug_paint(&mut self, callback: &mut dyn FnMut(&mut dyn Output));

  /// Device-space bounds of the active clip region.
  fn clip_bounds(&self) -> Rect;

  /// Whether clip-paths should composite through a luminosity mask instead
  /// of the native region clip.
  fn is_soft_clipping_enabled(&self) -> bool;

  /// Font size imposed by the rendering context, if any.
  fn context_font_size(&self) -> Option<f32>;

  /// Current user-to-device transform.
  fn current_transform(&self) -> Transform;

  fn translate(&mut self, offset: Point);

  fn concat(&mut self, transform: Transform);

  /// Pushes a copy of the current state (transform, clip, paint).
  fn save(&mut self);

  /// Pops back to the matching [`save`](Self::save).
  fn restore(&mut self);

  /// Releases the sink. Must be called exactly once, after the pass.
  fn dispose(&mut self);
}

#[derive(Debug, Clone)]
struct RasterState {
  transform: Transform,
  clip_rect: Rect,
  /// Canvas-sized coverage of the active clip region; None means unclipped.
  clip_coverage: Option<Pixmap>,
  /// Canvas-sized coverage installed by a luminosity-mask paint.
  soft_coverage: Option<Pixmap>,
  fill_color: Color,
}

/// Raster sink backed by a tiny-skia pixmap
#[derive(Debug)]
pub struct PixmapOutput {
  pixmap: Pixmap,
  states: Vec<RasterState>,
  soft_clipping: bool,
  font_size: Option<f32>,
  disposed: bool,
}

impl PixmapOutput {
  pub fn new(width: u32, height: u32) -> Option<Self> {
    let pixmap = Pixmap::new(width, height)?;
    let clip_rect = Rect::from_xywh(0.0, 0.0, width as f32, height as f32);
    Some(Self {
      pixmap,
      states: vec![RasterState {
        transform: Transform::identity(),
        clip_rect,
        clip_coverage: None,
        soft_coverage: None,
        fill_color: Color::BLACK,
      }],
      soft_clipping: true,
      font_size: None,
      disposed: false,
    })
  }

  /// Routes clip-paths through the native region clip instead of mask
  /// compositing.
  pub fn with_soft_clipping(mut self, enabled: bool) -> Self {
    self.soft_clipping = enabled;
    self
  }

  pub fn with_context_font_size(mut self, font_size: f32) -> Self {
    self.font_size = Some(font_size);
    self
  }

  pub fn pixmap(&self) -> &Pixmap {
    &self.pixmap
  }

  pub fn into_pixmap(self) -> Pixmap {
    self.pixmap
  }

  fn state(&self) -> &RasterState {
    self.states.last().expect("state stack underflow")
  }

  fn state_mut(&mut self) -> &mut RasterState {
    self.states.last_mut().expect("state stack underflow")
  }

  /// Rasterizes `path` under `transform` into a canvas-sized coverage map.
  fn rasterize_coverage(&self, path: &Path, transform: Transform) -> Option<Pixmap> {
    let mut coverage = Pixmap::new(self.pixmap.width(), self.pixmap.height())?;
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(Color::WHITE);
    paint.anti_alias = true;
    coverage.fill_path(path, &paint, FillRule::Winding, transform, None);
    Some(coverage)
  }

  fn clip_mask(&self) -> Option<Mask> {
    let state = self.state();
    match (&state.clip_coverage, &state.soft_coverage) {
      (None, None) => None,
      (Some(coverage), None) | (None, Some(coverage)) => {
        Some(Mask::from_pixmap(coverage.as_ref(), MaskType::Alpha))
      }
      (Some(clip), Some(soft)) => {
        let combined = multiply_coverage(clip.clone(), soft);
        Some(Mask::from_pixmap(combined.as_ref(), MaskType::Alpha))
      }
    }
  }
}

/// Per-pixel product of two coverage maps.
fn multiply_coverage(mut into: Pixmap, other: &Pixmap) -> Pixmap {
  for (dst, src) in into.data_mut().iter_mut().zip(other.data().iter()) {
    *dst = ((u16::from(*dst) * u16::from(*src) + 127) / 255) as u8;
  }
  into
}

impl Output for PixmapOutput {
  fn fill_path(&mut self, path: &Path) {
    debug_assert!(!self.disposed, "fill after dispose");
    let mask = self.clip_mask();
    let state = self.state();
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(state.fill_color);
    paint.anti_alias = true;
    let transform = state.transform;
    self
      .pixmap
      .fill_path(path, &paint, FillRule::Winding, transform, mask.as_ref());
  }

  fn apply_clip(&mut self, shape: &ClipShape) {
    let transform = self.state().transform;
    let path = match shape.to_path() {
      Some(path) => path,
      None => {
        // Degenerate clip shape: nothing is inside it.
        let empty = Pixmap::new(self.pixmap.width(), self.pixmap.height());
        let state = self.state_mut();
        state.clip_rect = Rect::ZERO;
        state.clip_coverage = empty;
        return;
      }
    };
    let coverage = match self.rasterize_coverage(&path, transform) {
      Some(coverage) => coverage,
      None => return,
    };
    let device_bounds = containing_bounds_after_transform(transform, shape.bounds());
    let state = self.state_mut();
    state.clip_coverage = Some(match state.clip_coverage.take() {
      Some(previous) => multiply_coverage(previous, &coverage),
      None => coverage,
    });
    state.clip_rect = state
      .clip_rect
      .intersection(device_bounds)
      .unwrap_or(Rect::ZERO);
  }

  fn set_paint(&mut self, supplier: &mut dyn FnMut() -> Option<Paint>) {
    match supplier() {
      Some(Paint::Solid(color)) => self.state_mut().fill_color = color,
      Some(Paint::LuminosityMask { surface, origin }) => {
        let mut coverage = match Pixmap::new(self.pixmap.width(), self.pixmap.height()) {
          Some(coverage) => coverage,
          None => return,
        };
        coverage.draw_pixmap(
          origin.x as i32,
          origin.y as i32,
          surface.as_ref(),
          &PixmapPaint::default(),
          Transform::identity(),
          None,
        );
        self.state_mut().soft_coverage = Some(coverage);
      }
      None => {}
    }
  }

  fn debug_paint(&mut self, callback: &mut dyn FnMut(&mut dyn Output)) {
    callback(self);
  }

  fn clip_bounds(&self) -> Rect {
    self.state().clip_rect
  }

  fn is_soft_clipping_enabled(&self) -> bool {
    self.soft_clipping
  }

  fn context_font_size(&self) -> Option<f32> {
    self.font_size
  }

  fn current_transform(&self) -> Transform {
    self.state().transform
  }

  fn translate(&mut self, offset: Point) {
    let state = self.state_mut();
    state.transform = state.transform.pre_translate(offset.x, offset.y);
  }

  fn concat(&mut self, transform: Transform) {
    let state = self.state_mut();
    state.transform = state.transform.pre_concat(transform);
  }

  fn save(&mut self) {
    let state = self.state().clone();
    self.states.push(state);
  }

  fn restore(&mut self) {
    debug_assert!(self.states.len() > 1, "restore without matching save");
    if self.states.len() > 1 {
      self.states.pop();
    }
  }

  fn dispose(&mut self) {
    debug_assert!(!self.disposed, "output disposed twice");
    self.disposed = true;
  }
}

#[derive(Debug, Clone, Copy)]
struct ShapeState {
  transform: Transform,
  clip_rect: Rect,
}

/// Bounds standing in for "unclipped" before the first `apply_clip`.
const UNCLIPPED: Rect = Rect::from_xywh(-1.0e9, -1.0e9, 2.0e9, 2.0e9);

/// Geometry-accumulating sink
///
/// Collects every filled path in device space; the aggregate outline is
/// available from [`into_path`](Self::into_path). Never realizes paints, so
/// mask surfaces are never requested on its behalf. Clips narrow
/// [`clip_bounds`](Output::clip_bounds) but do not subtract from already
/// accumulated geometry.
#[derive(Debug)]
pub struct ShapeOutput {
  states: Vec<ShapeState>,
  accumulated: Vec<Path>,
  disposed: bool,
}

impl ShapeOutput {
  pub fn new() -> Self {
    Self {
      states: vec![ShapeState {
        transform: Transform::identity(),
        clip_rect: UNCLIPPED,
      }],
      accumulated: Vec::new(),
      disposed: false,
    }
  }

  fn state(&self) -> &ShapeState {
    self.states.last().expect("state stack underflow")
  }

  fn state_mut(&mut self) -> &mut ShapeState {
    self.states.last_mut().expect("state stack underflow")
  }

  /// The aggregate outline of everything rendered, in device space.
  pub fn into_path(self) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for path in &self.accumulated {
      append_path(&mut builder, path);
    }
    builder.finish()
  }
}

impl Default for ShapeOutput {
  fn default() -> Self {
    Self::new()
  }
}

impl Output for ShapeOutput {
  fn fill_path(&mut self, path: &Path) {
    debug_assert!(!self.disposed, "fill after dispose");
    let clip = self.state().clip_rect;
    let Some(device_path) = path.clone().transform(self.state().transform) else {
      return;
    };
    let bounds = Rect::from_sk_rect(device_path.bounds());
    let Some(visible) = bounds.intersection(clip) else {
      return;
    };
    if visible == bounds {
      self.accumulated.push(device_path);
    } else if let Some(rect) = visible.to_sk_rect() {
      // A clip that cuts into a path degrades its outline to the
      // clipped bounds.
      self.accumulated.push(PathBuilder::from_rect(rect));
    }
  }

  fn apply_clip(&mut self, shape: &ClipShape) {
    let device_bounds = containing_bounds_after_transform(self.state().transform, shape.bounds());
    let state = self.state_mut();
    state.clip_rect = state
      .clip_rect
      .intersection(device_bounds)
      .unwrap_or(Rect::ZERO);
  }

  fn set_paint(&mut self, _supplier: &mut dyn FnMut() -> Option<Paint>) {
    // Geometry output never realizes paints.
  }

  fn debug_paint(&mut self, _callback: &mut dyn FnMut(&mut dyn Output)) {}

  fn clip_bounds(&self) -> Rect {
    self.state().clip_rect
  }

  fn is_soft_clipping_enabled(&self) -> bool {
    false
  }

  fn context_font_size(&self) -> Option<f32> {
    None
  }

  fn current_transform(&self) -> Transform {
    self.state().transform
  }

  fn translate(&mut self, offset: Point) {
    let state = self.state_mut();
    state.transform = state.transform.pre_translate(offset.x, offset.y);
  }

  fn concat(&mut self, transform: Transform) {
    let state = self.state_mut();
    state.transform = state.transform.pre_concat(transform);
  }

  fn save(&mut self) {
    let state = *self.state();
    self.states.push(state);
  }

  fn restore(&mut self) {
    debug_assert!(self.states.len() > 1, "restore without matching save");
    if self.states.len() > 1 {
      self.states.pop();
    }
  }

  fn dispose(&mut self) {
    debug_assert!(!self.disposed, "output disposed twice");
    self.disposed = true;
  }
}
