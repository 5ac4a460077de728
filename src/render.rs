//! Recursive scene-tree renderer
//!
//! One pass walks the tree top-down with a cloned-per-scope
//! [`RenderContext`]: apply the node's transform, apply its clip, emit its
//! geometry, recurse, restore. All state lives in the context and the
//! output's save stack; nodes are never written to.

use crate::clip::ClipShape;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::geometry::Point;
use crate::geometry::Rect;
use crate::geometry::Size;
use crate::geometry::ViewBox;
use crate::node::ElementBounds;
use crate::node::NodeKind;
use crate::node::SceneNode;
use crate::node::SvgAttrs;
use crate::output::Output;
use crate::output::Paint;
use crate::text::layout;
use tiny_skia::Color;
use tiny_skia::Path;

/// Renders `node` and its subtree into `output`.
pub fn render_node(
  node: &SceneNode,
  ctx: &RenderContext,
  output: &mut dyn Output,
) -> Result<(), RenderError> {
  let mut ctx = ctx.clone();
  ctx.multiply_opacity(node.opacity);
  if !node.visible || ctx.raw_opacity() <= 0.0 {
    return Ok(());
  }
  if matches!(node.kind, NodeKind::ClipPath(_)) {
    // Templates render only through the elements referencing them.
    return Ok(());
  }

  output.save();
  let result = render_scoped(node, &mut ctx, output);
  output.restore();
  result
}

fn render_scoped(
  node: &SceneNode,
  ctx: &mut RenderContext,
  output: &mut dyn Output,
) -> Result<(), RenderError> {
  if let Some(geometry) = &node.geometry {
    if let Some(transform) = geometry.resolved_transform() {
      ctx.apply_transform(output, transform);
    }
    if let Some(clip_ref) = &geometry.clip_path {
      if let NodeKind::ClipPath(clip) = &clip_ref.kind {
        let bounds = ElementBounds::compute(node, ctx);
        clip.apply_clip(output, ctx, &bounds)?;
      } else {
        log::warn!("clip-path reference resolves to <{}>, ignored", clip_ref.tag_name());
      }
    }
  }

  match &node.kind {
    NodeKind::Group => render_children(node, ctx, output),
    NodeKind::Use(target) => match target {
      Some(target) => render_node(target, ctx, output),
      None => Ok(()),
    },
    NodeKind::Svg(attrs) => render_inner_view(node, attrs, ctx, output),
    NodeKind::Shape(attrs) => {
      fill(output, &attrs.path, attrs.fill, ctx.raw_opacity());
      Ok(())
    }
    NodeKind::TextPath(attrs) => {
      if !attrs.is_valid() {
        log::warn!("text path has no resolvable path, skipping");
        return Ok(());
      }
      if let Some(outline) = layout::glyph_outline(attrs, ctx.measure()) {
        fill(output, &outline, attrs.fill, ctx.raw_opacity());
      }
      Ok(())
    }
    NodeKind::ClipPath(_) => Ok(()),
  }
}

fn render_children(
  node: &SceneNode,
  ctx: &RenderContext,
  output: &mut dyn Output,
) -> Result<(), RenderError> {
  for child in &node.children {
    render_node(child, ctx, output)?;
  }
  Ok(())
}

/// Establishes a nested viewport for a non-root `<svg>` element.
///
/// The viewport clips its content; a view box additionally installs the
/// element's uniform-fit transform and becomes the percentage base for
/// everything inside.
fn render_inner_view(
  node: &SceneNode,
  attrs: &SvgAttrs,
  ctx: &mut RenderContext,
  output: &mut dyn Output,
) -> Result<(), RenderError> {
  let viewport = resolve_viewport(attrs, ctx);
  if viewport.is_empty() {
    return Ok(());
  }
  output.apply_clip(&ClipShape::Rect(Rect::new(Point::ZERO, viewport)));

  let view_box = attrs.view_box.unwrap_or(ViewBox::from_size(viewport));
  let fit = attrs.preserve_aspect_ratio.view_box_transform(view_box, viewport);
  let mut inner = ctx.derive_inner(view_box, false);
  inner.apply_transform(output, fit);
  render_children(node, &inner, output)
}

fn resolve_viewport(attrs: &SvgAttrs, ctx: &RenderContext) -> Size {
  let measure = ctx.measure();
  let outer = measure.viewport();
  let width = attrs
    .width
    .map(|len| len.resolve(measure.em(), measure.ex(), outer.width))
    .unwrap_or(outer.width);
  let height = attrs
    .height
    .map(|len| len.resolve(measure.em(), measure.ex(), outer.height))
    .unwrap_or(outer.height);
  Size::new(width, height)
}

fn fill(output: &mut dyn Output, path: &Path, color: Color, opacity: f32) {
  let mut color = color;
  color.apply_opacity(opacity);
  output.set_paint(&mut || Some(Paint::Solid(color)));
  output.fill_path(path);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clip::ClipPathNode;
  use crate::context::ex_from_em;
  use crate::context::AnimationState;
  use crate::context::MeasureContext;
  use crate::context::DEFAULT_FONT_SIZE;
  use crate::geometry::Length;
  use crate::node::GeometryContext;
  use crate::node::ShapeAttrs;
  use crate::node::UnitType;
  use crate::output::PixmapOutput;
  use crate::output::ShapeOutput;
  use std::sync::Arc;
  use tiny_skia::PathBuilder;
  use tiny_skia::Transform;

  fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Path {
    PathBuilder::from_rect(tiny_skia::Rect::from_xywh(x, y, w, h).unwrap())
  }

  fn shape(x: f32, y: f32, w: f32, h: f32) -> SceneNode {
    SceneNode::new(NodeKind::Shape(ShapeAttrs {
      path: rect_path(x, y, w, h),
      fill: Color::WHITE,
    }))
  }

  fn test_ctx() -> RenderContext {
    RenderContext::create_initial(MeasureContext::create_initial(
      Size::new(100.0, 100.0),
      DEFAULT_FONT_SIZE,
      ex_from_em(DEFAULT_FONT_SIZE),
      AnimationState::NO_ANIMATION,
    ))
  }

  fn rendered_bounds(node: &SceneNode) -> Option<Rect> {
    let mut output = ShapeOutput::new();
    render_node(node, &test_ctx(), &mut output).expect("render");
    output.dispose();
    output
      .into_path()
      .map(|path| Rect::from_sk_rect(path.bounds()))
  }

  #[test]
  fn invisible_subtree_renders_nothing() {
    let node = shape(0.0, 0.0, 10.0, 10.0).with_visible(false);
    assert!(rendered_bounds(&node).is_none());

    let transparent = shape(0.0, 0.0, 10.0, 10.0).with_opacity(0.0);
    assert!(rendered_bounds(&transparent).is_none());
  }

  #[test]
  fn transform_applies_to_subtree() {
    let child = Arc::new(shape(0.0, 0.0, 10.0, 10.0));
    let group = SceneNode::new(NodeKind::Group)
      .with_children(vec![child])
      .with_geometry(GeometryContext {
        transform: Some(Transform::from_translate(20.0, 0.0)),
        ..GeometryContext::default()
      });
    let bounds = rendered_bounds(&group).expect("bounds");
    assert_eq!(bounds, Rect::from_xywh(20.0, 0.0, 10.0, 10.0));
  }

  #[test]
  fn invalid_clip_renders_element_unclipped() {
    let bad_clip = Arc::new(SceneNode::new(NodeKind::ClipPath(ClipPathNode::new(
      UnitType::UserSpaceOnUse,
      vec![Arc::new(SceneNode::new(NodeKind::Group))],
    ))));
    let node = shape(0.0, 0.0, 10.0, 10.0).with_geometry(GeometryContext {
      clip_path: Some(bad_clip),
      ..GeometryContext::default()
    });
    let bounds = rendered_bounds(&node).expect("bounds");
    assert_eq!(bounds, Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
  }

  #[test]
  fn hard_clip_cuts_raster_fill() {
    let clip = Arc::new(SceneNode::new(NodeKind::ClipPath(ClipPathNode::new(
      UnitType::UserSpaceOnUse,
      vec![Arc::new(shape(0.0, 0.0, 2.0, 4.0))],
    ))));
    let node = shape(0.0, 0.0, 4.0, 4.0).with_geometry(GeometryContext {
      clip_path: Some(clip),
      ..GeometryContext::default()
    });
    let mut output = PixmapOutput::new(4, 4).expect("pixmap").with_soft_clipping(false);
    render_node(&node, &test_ctx(), &mut output).expect("render");
    output.dispose();
    let data = output.pixmap().data();
    assert!(data[3] > 0, "inside clip painted");
    assert_eq!(data[4 * 3 + 3], 0, "outside clip untouched");
  }

  #[test]
  fn nested_view_clips_and_fits_content() {
    // Inner 10x10 viewport showing a 20x20 view box at half scale.
    let inner_shape = Arc::new(shape(0.0, 0.0, 20.0, 20.0));
    let inner = SceneNode::new(NodeKind::Svg(SvgAttrs {
      width: Some(Length::px(10.0)),
      height: Some(Length::px(10.0)),
      view_box: Some(ViewBox::new(0.0, 0.0, 20.0, 20.0)),
      ..SvgAttrs::default()
    }))
    .with_children(vec![inner_shape]);
    let bounds = rendered_bounds(&inner).expect("bounds");
    assert_eq!(bounds, Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
  }

  #[test]
  fn opacity_scales_fill_alpha() {
    let node = shape(0.0, 0.0, 2.0, 2.0).with_opacity(0.5);
    let mut output = PixmapOutput::new(2, 2).expect("pixmap");
    render_node(&node, &test_ctx(), &mut output).expect("render");
    output.dispose();
    let alpha = output.pixmap().data()[3];
    assert!(alpha > 100 && alpha < 150, "half-opaque fill, got {alpha}");
  }
}
