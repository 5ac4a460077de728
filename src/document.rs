//! Document-level orchestration
//!
//! A [`Document`] wraps a parsed scene tree and runs whole-tree passes:
//! raster rendering into caller-supplied display bounds, and geometry
//! extraction via a [`ShapeOutput`]. Intrinsic size is fixed at
//! construction from default font metrics, so repeated queries agree.

use crate::clip::ClipShape;
use crate::context::ex_from_em;
use crate::context::AnimationState;
use crate::context::MeasureContext;
use crate::context::NullPlatformMetrics;
use crate::context::PlatformMetrics;
use crate::context::RenderContext;
use crate::context::DEFAULT_FONT_SIZE;
use crate::error::Result;
use crate::geometry::Point;
use crate::geometry::Rect;
use crate::geometry::Size;
use crate::geometry::ViewBox;
use crate::node::NodeKind;
use crate::node::SceneNode;
use crate::node::SvgAttrs;
use crate::output::Output;
use crate::output::ShapeOutput;
use crate::render::render_node;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::Path;

/// CSS default size for a replaced element without intrinsic dimensions.
const DEFAULT_INTRINSIC: Size = Size::new(300.0, 150.0);

/// A renderable SVG document
#[derive(Debug, Clone)]
pub struct Document {
  root: Arc<SceneNode>,
  attrs: SvgAttrs,
  size: Size,
  animation_period: Option<Duration>,
}

impl Document {
  /// Wraps a parsed scene tree whose root should be an `<svg>` element.
  ///
  /// A root of any other kind gets default viewport attributes and renders
  /// as plain content.
  pub fn new(root: Arc<SceneNode>) -> Self {
    let attrs = match &root.kind {
      NodeKind::Svg(attrs) => attrs.clone(),
      _ => SvgAttrs::default(),
    };
    let size = intrinsic_size(&attrs);
    Self {
      root,
      attrs,
      size,
      animation_period: None,
    }
  }

  /// Declares that the document repeats with the given animation period.
  pub fn with_animation_period(mut self, period: Duration) -> Self {
    self.animation_period = Some(period);
    self
  }

  /// Intrinsic size, resolved once at construction with default metrics.
  pub fn size(&self) -> Size {
    self.size
  }

  pub fn view_box(&self) -> ViewBox {
    self.attrs.view_box.unwrap_or(ViewBox::from_size(self.size))
  }

  pub fn is_animated(&self) -> bool {
    self.animation_period.is_some()
  }

  /// Renders into `output` at `bounds` (intrinsic bounds when None) with
  /// default platform metrics and no animation timeline.
  ///
  /// Disposing the output afterwards is the caller's duty.
  pub fn render(&self, output: &mut dyn Output, bounds: Option<Rect>) -> Result<()> {
    self.render_with_platform(
      &NullPlatformMetrics,
      output,
      bounds,
      AnimationState::NO_ANIMATION,
    )
  }

  /// Renders one pass with explicit platform metrics and timeline position.
  ///
  /// The context font size comes from the output when it carries one,
  /// falling back to the platform default. The view box is fit into
  /// `bounds` with the document's `preserveAspectRatio`, content outside
  /// the bounds is clipped, and the absolute device transform is captured
  /// before descending.
  pub fn render_with_platform(
    &self,
    platform: &dyn PlatformMetrics,
    output: &mut dyn Output,
    bounds: Option<Rect>,
    animation: AnimationState,
  ) -> Result<()> {
    let em = output.context_font_size().unwrap_or_else(|| platform.font_size());
    let bounds = bounds.unwrap_or(Rect::new(Point::ZERO, self.size));
    let view_box = self.view_box();

    let measure = MeasureContext::create_initial(view_box.size(), em, ex_from_em(em), animation);
    let mut ctx = RenderContext::create_initial(measure);

    output.save();
    output.apply_clip(&ClipShape::Rect(bounds));
    ctx.translate(output, bounds.origin);
    let fit = self
      .attrs
      .preserve_aspect_ratio
      .view_box_transform(view_box, bounds.size);
    ctx.apply_transform(output, fit);
    ctx.set_root_transform(ctx.transform());

    let mut result = Ok(());
    if matches!(self.root.kind, NodeKind::Svg(_)) {
      for child in &self.root.children {
        result = render_node(child, &ctx, output).map_err(Into::into);
        if result.is_err() {
          break;
        }
      }
    } else {
      result = render_node(&self.root, &ctx, output).map_err(Into::into);
    }
    output.restore();
    result
  }

  /// The aggregate outline of the rendered document, in device space for
  /// a pass over the intrinsic bounds.
  pub fn compute_shape(&self) -> Result<Option<Path>> {
    let mut output = ShapeOutput::new();
    self.render(&mut output, None)?;
    output.dispose();
    Ok(output.into_path())
  }
}

/// Resolves the root width/height into a concrete pixel size.
///
/// Percentages and missing lengths have no outer viewport to resolve
/// against; they fall back to the view box size, then the CSS default.
fn intrinsic_size(attrs: &SvgAttrs) -> Size {
  let em = DEFAULT_FONT_SIZE;
  let ex = ex_from_em(em);
  let fallback = attrs
    .view_box
    .map(ViewBox::size)
    .unwrap_or(DEFAULT_INTRINSIC);
  let width = match attrs.width {
    Some(len) if !len.is_percentage() => len.resolve(em, ex, 0.0),
    _ => fallback.width,
  };
  let height = match attrs.height {
    Some(len) if !len.is_percentage() => len.resolve(em, ex, 0.0),
    _ => fallback.height,
  };
  Size::new(width, height)
}
