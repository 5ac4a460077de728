//! Per-pass measure and render contexts
//!
//! A render pass owns a chain of immutable-per-scope contexts: the
//! [`MeasureContext`] carries the viewport box and font metrics used to
//! resolve lengths, and the [`RenderContext`] accumulates the affine
//! transform and opacity while descending the tree. Deriving an inner
//! context never mutates its ancestor; contexts are created fresh per pass
//! and never stored on nodes.

use crate::geometry::Point;
use crate::geometry::Size;
use crate::geometry::ViewBox;
use crate::output::Output;
use std::time::Duration;
use tiny_skia::Transform;

/// Default font size when neither the output nor the platform supplies one.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Ratio of x-height to font size used when no font metrics are available.
const EX_RATIO: f32 = 0.5;

/// Derives the default ex metric from an em value.
pub fn ex_from_em(em: f32) -> f32 {
  em * EX_RATIO
}

/// Supplies environment defaults the document itself does not carry.
///
/// The host environment (a widget toolkit, a headless harness) can provide
/// its ambient font size; [`NullPlatformMetrics`] is the no-op fallback.
pub trait PlatformMetrics {
  fn font_size(&self) -> f32;
}

/// Platform metrics for headless rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlatformMetrics;

impl PlatformMetrics for NullPlatformMetrics {
  fn font_size(&self) -> f32 {
    DEFAULT_FONT_SIZE
  }
}

/// Timeline position of an animated render, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationState {
  elapsed: Duration,
}

impl AnimationState {
  pub const NO_ANIMATION: Self = Self {
    elapsed: Duration::ZERO,
  };

  pub const fn at(elapsed: Duration) -> Self {
    Self { elapsed }
  }

  pub fn elapsed(self) -> Duration {
    self.elapsed
  }

  /// True when this render is one frame of a repeated sequence.
  pub fn is_animated(self) -> bool {
    !self.elapsed.is_zero()
  }
}

/// Length-resolution context: viewport box, font metrics, animation state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureContext {
  viewport: Size,
  em: f32,
  ex: f32,
  animation: AnimationState,
}

impl MeasureContext {
  /// Captures the initial measure state at the top of a render pass.
  pub fn create_initial(viewport: Size, em: f32, ex: f32, animation: AnimationState) -> Self {
    Self {
      viewport,
      em,
      ex,
      animation,
    }
  }

  pub fn viewport(&self) -> Size {
    self.viewport
  }

  pub fn em(&self) -> f32 {
    self.em
  }

  pub fn ex(&self) -> f32 {
    self.ex
  }

  pub fn animation(&self) -> AnimationState {
    self.animation
  }

  /// Derives the measure state for a nested viewport.
  pub fn with_viewport(&self, viewport: Size) -> Self {
    Self { viewport, ..*self }
  }
}

/// Accumulated render state for one subtree scope
///
/// Cloned (never mutated in place across scopes) on every derivation; the
/// root transform is captured exactly once per pass, after the viewport fit
/// transform is applied, so absolute-space effects can reference true device
/// space regardless of nested transforms.
#[derive(Debug, Clone)]
pub struct RenderContext {
  transform: Transform,
  root_transform: Option<Transform>,
  raw_opacity: f32,
  measure: MeasureContext,
}

impl RenderContext {
  pub fn create_initial(measure: MeasureContext) -> Self {
    Self {
      transform: Transform::identity(),
      root_transform: None,
      raw_opacity: 1.0,
      measure,
    }
  }

  pub fn transform(&self) -> Transform {
    self.transform
  }

  /// The absolute device transform captured at the top of the pass.
  ///
  /// Identity until [`set_root_transform`](Self::set_root_transform) runs,
  /// which only happens before the root subtree is entered. Nothing in the
  /// pipeline consumes it; it is exposed for callers resolving effects
  /// such as `vector-effect="non-scaling-stroke"` against device space.
  pub fn root_transform(&self) -> Transform {
    self.root_transform.unwrap_or_default()
  }

  pub fn set_root_transform(&mut self, transform: Transform) {
    debug_assert!(self.root_transform.is_none(), "root transform captured twice");
    self.root_transform = Some(transform);
  }

  pub fn raw_opacity(&self) -> f32 {
    self.raw_opacity
  }

  /// Folds an element's opacity into this scope.
  pub fn multiply_opacity(&mut self, opacity: f32) {
    self.raw_opacity *= opacity.clamp(0.0, 1.0);
  }

  pub fn measure(&self) -> &MeasureContext {
    &self.measure
  }

  /// Derives the context for an inner viewport.
  pub fn derive_inner(&self, view_box: ViewBox, _is_root: bool) -> RenderContext {
    RenderContext {
      transform: self.transform,
      root_transform: self.root_transform,
      raw_opacity: self.raw_opacity,
      measure: self.measure.with_viewport(view_box.size()),
    }
  }

  /// Applies a translation to this scope and mirrors it onto the output.
  pub fn translate(&mut self, output: &mut dyn Output, offset: Point) {
    self.transform = self.transform.pre_translate(offset.x, offset.y);
    output.translate(offset);
  }

  /// Applies an affine transform to this scope and mirrors it onto the output.
  pub fn apply_transform(&mut self, output: &mut dyn Output, transform: Transform) {
    self.transform = self.transform.pre_concat(transform);
    output.concat(transform);
  }
}
