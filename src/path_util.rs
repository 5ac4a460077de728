//! Path helpers shared by clipping and output sinks

use crate::geometry::Rect;
use tiny_skia::Path;
use tiny_skia::PathBuilder;
use tiny_skia::PathSegment;

/// Re-emits `path` into `builder`, preserving every segment.
pub(crate) fn append_path(builder: &mut PathBuilder, path: &Path) {
  for segment in path.segments() {
    match segment {
      PathSegment::MoveTo(p) => builder.move_to(p.x, p.y),
      PathSegment::LineTo(p) => builder.line_to(p.x, p.y),
      PathSegment::QuadTo(p1, p2) => builder.quad_to(p1.x, p1.y, p2.x, p2.y),
      PathSegment::CubicTo(p1, p2, p3) => builder.cubic_to(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y),
      PathSegment::Close => builder.close(),
    }
  }
}

/// True when the path's final subpath is explicitly closed.
pub(crate) fn is_closed(path: &Path) -> bool {
  path.segments().last() == Some(PathSegment::Close)
}

/// Detects a path that is exactly one axis-aligned rectangle.
///
/// Accepts a single closed subpath of four corner points whose edges
/// alternate between horizontal and vertical. Returns the rectangle so
/// downstream clipping can use region membership instead of a general
/// path.
pub(crate) fn as_axis_aligned_rect(path: &Path) -> Option<Rect> {
  let mut points: Vec<(f32, f32)> = Vec::with_capacity(5);
  let mut closed = false;
  for segment in path.segments() {
    match segment {
      PathSegment::MoveTo(p) => {
        if !points.is_empty() {
          // Second subpath; not a plain rectangle.
          return None;
        }
        points.push((p.x, p.y));
      }
      PathSegment::LineTo(p) => {
        if closed {
          return None;
        }
        points.push((p.x, p.y));
      }
      PathSegment::Close => {
        if closed {
          return None;
        }
        closed = true;
      }
      PathSegment::QuadTo(..) | PathSegment::CubicTo(..) => return None,
    }
  }
  if !closed {
    return None;
  }
  // An explicit final line back to the start is equivalent to the close.
  if points.len() == 5 && points[4] == points[0] {
    points.pop();
  }
  if points.len() != 4 {
    return None;
  }

  let edges: Vec<(f32, f32)> = (0..4)
    .map(|i| {
      let (x1, y1) = points[i];
      let (x2, y2) = points[(i + 1) % 4];
      (x2 - x1, y2 - y1)
    })
    .collect();
  for (i, (dx, dy)) in edges.iter().enumerate() {
    let horizontal = *dy == 0.0 && *dx != 0.0;
    let vertical = *dx == 0.0 && *dy != 0.0;
    if !(horizontal || vertical) {
      return None;
    }
    let (ndx, ndy) = edges[(i + 1) % 4];
    if horizontal && ndy == 0.0 || vertical && ndx == 0.0 {
      return None;
    }
  }

  let min_x = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
  let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
  let max_x = points.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
  let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
  Some(Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y))
}
