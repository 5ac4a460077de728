//! Clip-path resolution and application
//!
//! A clip-path template aggregates its children into one outline, then
//! applies it either as a hard region clip on the output or, when the
//! output supports it, as a luminosity mask rendered into a pooled
//! off-screen surface. Axis-aligned rectangle outlines short-circuit into
//! a region rect so the common `clip-path: rect(...)`-shaped case never
//! rasterizes a mask.

use crate::context::RenderContext;
use crate::error::RenderError;
use crate::geometry::containing_bounds_after_transform;
use crate::geometry::Rect;
use crate::node::ElementBounds;
use crate::node::NodeKind;
use crate::node::SceneNode;
use crate::node::UnitType;
use crate::output::Output;
use crate::path_util::append_path;
use crate::path_util::as_axis_aligned_rect;
use crate::surface::BlittableImage;
use crate::surface::CacheStats;
use crate::surface::SurfaceCache;
use crate::text::layout;
use std::sync::Arc;
use tiny_skia::Path;
use tiny_skia::PathBuilder;

/// Outline of one clip child in the template's unit space, with the
/// child's own transform applied.
fn child_outline(node: &SceneNode, ctx: &RenderContext) -> Option<Path> {
  let base = match &node.kind {
    NodeKind::Shape(attrs) => Some(attrs.path.clone()),
    NodeKind::TextPath(attrs) => layout::glyph_outline(attrs, ctx.measure()),
    NodeKind::Use(target) => target.as_ref().and_then(|t| child_outline(t, ctx)),
    _ => None,
  }?;
  match node.geometry.as_ref().and_then(|g| g.resolved_transform()) {
    Some(transform) => base.transform(transform),
    None => Some(base),
  }
}

/// Resolved clip geometry, ready to hand to an output
#[derive(Debug, Clone)]
pub enum ClipShape {
  /// Axis-aligned rectangle, eligible for the region-clip fast path
  Rect(Rect),
  /// Arbitrary outline
  Path(Path),
}

impl ClipShape {
  pub fn bounds(&self) -> Rect {
    match self {
      ClipShape::Rect(rect) => *rect,
      ClipShape::Path(path) => Rect::from_sk_rect(path.bounds()),
    }
  }

  /// The outline as a fillable path; None for degenerate shapes.
  pub fn to_path(&self) -> Option<Path> {
    match self {
      ClipShape::Rect(rect) => rect.to_sk_rect().map(PathBuilder::from_rect),
      ClipShape::Path(path) => Some(path.clone()),
    }
  }
}

/// A `<clipPath>` template node
///
/// Validity is decided once at construction: every child must contribute
/// plain geometry. An invalid template is never applied; the renderer draws
/// the referencing element unclipped and reports the reference.
#[derive(Debug, Clone)]
pub struct ClipPathNode {
  units: UnitType,
  children: Vec<Arc<SceneNode>>,
  valid: bool,
  /// Shared so the pool survives cloning the scene tree.
  cache: Arc<SurfaceCache>,
}

impl ClipPathNode {
  pub fn new(units: UnitType, children: Vec<Arc<SceneNode>>) -> Self {
    let valid = children.iter().all(|child| match &child.kind {
      NodeKind::Shape(_) => true,
      NodeKind::TextPath(attrs) => attrs.is_valid(),
      // An unresolved reference contributes nothing; a resolved one must
      // point at plain geometry.
      NodeKind::Use(None) => true,
      NodeKind::Use(Some(target)) => target.kind.is_geometry_bearing(),
      _ => false,
    });
    Self {
      units,
      children,
      valid,
      cache: Arc::new(SurfaceCache::new()),
    }
  }

  pub fn units(&self) -> UnitType {
    self.units
  }

  pub fn is_valid(&self) -> bool {
    self.valid
  }

  /// Surface pool counters, for leak instrumentation.
  pub fn cache_stats(&self) -> CacheStats {
    self.cache.stats()
  }

  /// Union outline of all children, in the template's unit space.
  fn union_path(&self, ctx: &RenderContext) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for child in &self.children {
      if let Some(contribution) = child_outline(child, ctx) {
        append_path(&mut builder, &contribution);
      }
    }
    builder.finish()
  }

  /// Resolves the clip outline into the referencing element's user space.
  ///
  /// Hard clips additionally try the axis-aligned-rectangle fast path; a
  /// soft clip always needs a fillable outline, so the rect check is
  /// skipped there.
  pub fn clip_shape(
    &self,
    ctx: &RenderContext,
    bounding_box: Rect,
    use_soft: bool,
  ) -> Option<ClipShape> {
    let path = self.union_path(ctx)?;
    let path = match self.units {
      UnitType::UserSpaceOnUse => path,
      UnitType::ObjectBoundingBox => path.transform(self.units.view_transform(bounding_box))?,
    };
    if !use_soft {
      if let Some(rect) = as_axis_aligned_rect(&path) {
        return Some(ClipShape::Rect(rect));
      }
    }
    Some(ClipShape::Path(path))
  }

  /// Applies this clip to the output for the element described by `bounds`.
  ///
  /// Invalid templates are skipped entirely. Hard clipping narrows the
  /// output's region; soft clipping installs a lazily-realized luminosity
  /// paint, so geometry-only outputs never pay for a mask surface.
  pub fn apply_clip(
    &self,
    output: &mut dyn Output,
    ctx: &RenderContext,
    bounds: &ElementBounds,
  ) -> Result<(), RenderError> {
    if !self.valid {
      log::warn!("skipping invalid clip-path (non-shape children)");
      return Ok(());
    }

    let use_soft = output.is_soft_clipping_enabled();
    let shape = match self.clip_shape(ctx, bounds.bounding_box, use_soft) {
      Some(shape) => shape,
      None => {
        // No geometry inside the template: everything is clipped away.
        output.apply_clip(&ClipShape::Rect(Rect::ZERO));
        return Ok(());
      }
    };

    if !use_soft {
      output.apply_clip(&shape);
      return Ok(());
    }

    let path = match shape.to_path() {
      Some(path) => path,
      None => {
        output.apply_clip(&ClipShape::Rect(Rect::ZERO));
        return Ok(());
      }
    };

    let device_transform = ctx.transform();
    let mask_bounds =
      containing_bounds_after_transform(device_transform, Rect::from_sk_rect(path.bounds()));
    let device_rect = mask_bounds
      .intersection(bounds.geometry_box)
      .and_then(|rect| rect.intersection(output.clip_bounds()));
    let device_rect = match device_rect {
      Some(rect) => rect,
      None => {
        output.apply_clip(&ClipShape::Rect(Rect::ZERO));
        return Ok(());
      }
    };

    let use_cache = self.cache.use_cache(output, ctx);
    let cache = &self.cache;
    output.set_paint(&mut || match BlittableImage::create(cache, use_cache, device_rect) {
      Ok(Some(mut image)) => {
        image.fill_luminous(&path, device_transform);
        Some(image.into_paint())
      }
      Ok(None) => None,
      Err(error) => {
        log::warn!("soft clip surface unavailable: {error}");
        None
      }
    });
    Ok(())
  }
}
