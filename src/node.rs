//! The scene tree consumed by the render pipeline
//!
//! Nodes are produced by an external parser with all units, enums, and
//! cross-references already resolved. The tree is read-only once built;
//! the pipeline never stores per-render state on a node, so one document
//! can serve any number of render passes.

use crate::clip::ClipPathNode;
use crate::context::RenderContext;
use crate::geometry::containing_bounds_after_transform;
use crate::geometry::Length;
use crate::geometry::Point;
use crate::geometry::PreserveAspectRatio;
use crate::geometry::Rect;
use crate::geometry::ViewBox;
use crate::text::layout;
use crate::text::path_cursor::Side;
use std::sync::Arc;
use tiny_skia::Color;
use tiny_skia::Path;
use tiny_skia::Transform;

/// Coordinate system for a referenced effect (clip-path)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
  /// Coordinates are ambient user-space units
  UserSpaceOnUse,
  /// Coordinates are normalized to the referencing element's bounding box
  ObjectBoundingBox,
}

impl UnitType {
  /// Transform from this unit space into the referencing element's space.
  pub fn view_transform(self, bounding_box: Rect) -> Transform {
    match self {
      UnitType::UserSpaceOnUse => Transform::identity(),
      UnitType::ObjectBoundingBox => {
        Transform::from_translate(bounding_box.x(), bounding_box.y())
          .pre_concat(Transform::from_scale(bounding_box.width(), bounding_box.height()))
      }
    }
  }
}

/// Clip/transform references shared by renderable node types
///
/// Nodes gain these capabilities through composition: a single optional
/// `GeometryContext` field, consulted by the renderer, instead of a
/// capability hierarchy on the node types themselves.
#[derive(Debug, Clone, Default)]
pub struct GeometryContext {
  /// Referenced clip-path node (kind must be [`NodeKind::ClipPath`])
  pub clip_path: Option<Arc<SceneNode>>,
  /// Element transform, applied around `transform_origin`
  pub transform: Option<Transform>,
  pub transform_origin: Point,
}

impl GeometryContext {
  /// The element transform, conjugated by the transform origin.
  pub fn resolved_transform(&self) -> Option<Transform> {
    let transform = self.transform?;
    let origin = self.transform_origin;
    if origin == Point::ZERO {
      return Some(transform);
    }
    Some(
      Transform::from_translate(origin.x, origin.y)
        .pre_concat(transform)
        .pre_concat(Transform::from_translate(-origin.x, -origin.y)),
    )
  }
}

/// Root `<svg>` attributes
#[derive(Debug, Clone)]
pub struct SvgAttrs {
  pub width: Option<Length>,
  pub height: Option<Length>,
  pub view_box: Option<ViewBox>,
  pub preserve_aspect_ratio: PreserveAspectRatio,
}

impl Default for SvgAttrs {
  fn default() -> Self {
    Self {
      width: None,
      height: None,
      view_box: None,
      preserve_aspect_ratio: PreserveAspectRatio::for_display(),
    }
  }
}

/// A filled geometric shape
#[derive(Debug, Clone)]
pub struct ShapeAttrs {
  pub path: Path,
  pub fill: Color,
}

/// Text laid out along a path
///
/// The path is resolved by the parser, either from inline path data or by
/// borrowing the geometry of a referenced shape node. A node whose path
/// could not be resolved is invalid and renders nothing.
#[derive(Debug, Clone)]
pub struct TextPathAttrs {
  pub text: String,
  pub path: Option<Path>,
  pub start_offset: Length,
  pub side: Side,
  pub fill: Color,
  /// Per-grapheme-cluster advance widths from the external shaper, when
  /// available; layout falls back to an em-proportional advance otherwise.
  pub advances: Option<Vec<f32>>,
}

impl TextPathAttrs {
  pub fn new(text: impl Into<String>, path: Option<Path>) -> Self {
    Self {
      text: text.into(),
      path,
      start_offset: Length::px(0.0),
      side: Side::Left,
      fill: Color::BLACK,
      advances: None,
    }
  }

  pub fn is_valid(&self) -> bool {
    self.path.is_some()
  }
}

/// Node payload determining render behavior
#[derive(Debug, Clone)]
pub enum NodeKind {
  /// Structural group
  Group,
  /// Viewport element (root or nested)
  Svg(SvgAttrs),
  /// Filled shape
  Shape(ShapeAttrs),
  /// Text along a path
  TextPath(TextPathAttrs),
  /// Clip-path template; never rendered directly
  ClipPath(ClipPathNode),
  /// Reference to another node, resolved by the parser
  Use(Option<Arc<SceneNode>>),
}

impl NodeKind {
  pub fn tag_name(&self) -> &'static str {
    match self {
      NodeKind::Group => "g",
      NodeKind::Svg(_) => "svg",
      NodeKind::Shape(_) => "path",
      NodeKind::TextPath(_) => "textpath",
      NodeKind::ClipPath(_) => "clippath",
      NodeKind::Use(_) => "use",
    }
  }

  /// Whether this node type contributes geometry a clip-path may reference.
  pub fn is_geometry_bearing(&self) -> bool {
    matches!(self, NodeKind::Shape(_) | NodeKind::TextPath(_))
  }
}

/// One node of the parsed scene tree
#[derive(Debug, Clone)]
pub struct SceneNode {
  pub kind: NodeKind,
  pub children: Vec<Arc<SceneNode>>,
  pub geometry: Option<GeometryContext>,
  pub visible: bool,
  /// Element opacity, multiplied into the context while descending.
  /// Zero hides the whole subtree.
  pub opacity: f32,
}

impl SceneNode {
  pub fn new(kind: NodeKind) -> Self {
    Self {
      kind,
      children: Vec::new(),
      geometry: None,
      visible: true,
      opacity: 1.0,
    }
  }

  pub fn with_children(mut self, children: Vec<Arc<SceneNode>>) -> Self {
    self.children = children;
    self
  }

  pub fn with_geometry(mut self, geometry: GeometryContext) -> Self {
    self.geometry = Some(geometry);
    self
  }

  pub fn with_visible(mut self, visible: bool) -> Self {
    self.visible = visible;
    self
  }

  pub fn with_opacity(mut self, opacity: f32) -> Self {
    self.opacity = opacity;
    self
  }

  pub fn tag_name(&self) -> &'static str {
    self.kind.tag_name()
  }

  /// Untransformed bounds of this node's own subtree, in its local user
  /// space. Includes child transforms; excludes the node's own transform.
  pub fn local_bounds(&self, ctx: &RenderContext) -> Option<Rect> {
    match &self.kind {
      NodeKind::Shape(attrs) => Some(Rect::from_sk_rect(attrs.path.bounds())),
      NodeKind::TextPath(attrs) => layout::glyph_outline(attrs, ctx.measure()).map(|p| Rect::from_sk_rect(p.bounds())),
      NodeKind::Use(target) => target.as_ref().and_then(|t| t.subtree_bounds(ctx)),
      NodeKind::Group | NodeKind::Svg(_) => {
        let mut union: Option<Rect> = None;
        for child in &self.children {
          if let Some(bounds) = child.subtree_bounds(ctx) {
            union = Some(match union {
              Some(u) => u.union(bounds),
              None => bounds,
            });
          }
        }
        union
      }
      NodeKind::ClipPath(_) => None,
    }
  }

  /// Local bounds with this node's own transform applied.
  fn subtree_bounds(&self, ctx: &RenderContext) -> Option<Rect> {
    let bounds = self.local_bounds(ctx)?;
    let transform = self
      .geometry
      .as_ref()
      .and_then(|g| g.resolved_transform())
      .unwrap_or_default();
    Some(containing_bounds_after_transform(transform, bounds))
  }
}

/// Geometry and object-bounding boxes of an element under one render pass
///
/// Computed lazily just before an effect needs them and discarded with the
/// pass; never cached across passes.
#[derive(Debug, Clone, Copy)]
pub struct ElementBounds {
  /// Object bounding box in local user space
  pub bounding_box: Rect,
  /// Bounding box mapped into device space by the current transform
  pub geometry_box: Rect,
}

impl ElementBounds {
  pub fn compute(node: &SceneNode, ctx: &RenderContext) -> ElementBounds {
    let bounding_box = node.local_bounds(ctx).unwrap_or(Rect::ZERO);
    let geometry_box = containing_bounds_after_transform(ctx.transform(), bounding_box);
    ElementBounds {
      bounding_box,
      geometry_box,
    }
  }
}
