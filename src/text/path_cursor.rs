//! Arc-length cursor over a flattened path
//!
//! Curves are flattened once, up front, into a polyline; the cursor then
//! resolves distances along that polyline into placement transforms
//! (position plus tangent rotation). Distances past the end are not
//! wrapped: callers drop whatever no longer fits.

use crate::error::TextError;
use crate::geometry::Point;
use crate::path_util::is_closed;
use tiny_skia::Path;
use tiny_skia::PathSegment;
use tiny_skia::Transform;

/// Which side of the path the text runs along
///
/// `Right` walks the path in reverse, so text reads along the opposite
/// direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
  #[default]
  Left,
  Right,
}

const MAX_FLATTEN_DEPTH: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct Edge {
  start: Point,
  end: Point,
  length: f32,
  /// Arc length from the path start to `start`.
  offset: f32,
}

fn lerp(a: Point, b: Point, t: f32) -> Point {
  Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

fn distance(a: Point, b: Point) -> f32 {
  ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Distance from `p` to the line through `a` and `b`.
fn deviation(p: Point, a: Point, b: Point) -> f32 {
  let chord = distance(a, b);
  if chord <= f32::EPSILON {
    return distance(p, a);
  }
  ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / chord
}

fn flatten_quad(p0: Point, p1: Point, p2: Point, tolerance: f32, depth: u32, out: &mut Vec<Point>) {
  if depth >= MAX_FLATTEN_DEPTH || deviation(p1, p0, p2) <= tolerance {
    out.push(p2);
    return;
  }
  let a = lerp(p0, p1, 0.5);
  let b = lerp(p1, p2, 0.5);
  let mid = lerp(a, b, 0.5);
  flatten_quad(p0, a, mid, tolerance, depth + 1, out);
  flatten_quad(mid, b, p2, tolerance, depth + 1, out);
}

fn flatten_cubic(
  p0: Point,
  p1: Point,
  p2: Point,
  p3: Point,
  tolerance: f32,
  depth: u32,
  out: &mut Vec<Point>,
) {
  let flat = deviation(p1, p0, p3).max(deviation(p2, p0, p3));
  if depth >= MAX_FLATTEN_DEPTH || flat <= tolerance {
    out.push(p3);
    return;
  }
  let a = lerp(p0, p1, 0.5);
  let b = lerp(p1, p2, 0.5);
  let c = lerp(p2, p3, 0.5);
  let ab = lerp(a, b, 0.5);
  let bc = lerp(b, c, 0.5);
  let mid = lerp(ab, bc, 0.5);
  flatten_cubic(p0, a, ab, mid, tolerance, depth + 1, out);
  flatten_cubic(mid, bc, c, p3, tolerance, depth + 1, out);
}

/// Flattens `path` into per-subpath polylines at the given tolerance.
fn flatten(path: &Path, tolerance: f32) -> Vec<Vec<Point>> {
  let mut subpaths: Vec<Vec<Point>> = Vec::new();
  let mut current: Vec<Point> = Vec::new();
  let mut subpath_start = Point::ZERO;
  let mut cursor = Point::ZERO;

  for segment in path.segments() {
    match segment {
      PathSegment::MoveTo(p) => {
        if current.len() > 1 {
          subpaths.push(std::mem::take(&mut current));
        } else {
          current.clear();
        }
        cursor = Point::new(p.x, p.y);
        subpath_start = cursor;
        current.push(cursor);
      }
      PathSegment::LineTo(p) => {
        cursor = Point::new(p.x, p.y);
        current.push(cursor);
      }
      PathSegment::QuadTo(p1, p2) => {
        let end = Point::new(p2.x, p2.y);
        flatten_quad(
          cursor,
          Point::new(p1.x, p1.y),
          end,
          tolerance,
          0,
          &mut current,
        );
        cursor = end;
      }
      PathSegment::CubicTo(p1, p2, p3) => {
        let end = Point::new(p3.x, p3.y);
        flatten_cubic(
          cursor,
          Point::new(p1.x, p1.y),
          Point::new(p2.x, p2.y),
          end,
          tolerance,
          0,
          &mut current,
        );
        cursor = end;
      }
      PathSegment::Close => {
        current.push(subpath_start);
        cursor = subpath_start;
      }
    }
  }
  if current.len() > 1 {
    subpaths.push(current);
  }
  subpaths
}

/// Cursor resolving arc-length distances into placements along a path
#[derive(Debug)]
pub struct PathCursor {
  edges: Vec<Edge>,
  total_length: f32,
  closed: bool,
  position: f32,
}

impl PathCursor {
  /// Flattens `path` and positions the cursor at its start.
  ///
  /// `tolerance` is the maximum deviation of the polyline from the true
  /// curve, in user units. Returns [`TextError::EmptyPath`] when the path
  /// has no drawable length.
  pub fn new(path: &Path, side: Side, tolerance: f32) -> Result<Self, TextError> {
    let mut subpaths = flatten(path, tolerance.max(1.0e-3));
    if side == Side::Right {
      for subpath in &mut subpaths {
        subpath.reverse();
      }
      subpaths.reverse();
    }

    let mut edges = Vec::new();
    let mut offset = 0.0;
    for subpath in &subpaths {
      for pair in subpath.windows(2) {
        let length = distance(pair[0], pair[1]);
        if length <= f32::EPSILON {
          continue;
        }
        edges.push(Edge {
          start: pair[0],
          end: pair[1],
          length,
          offset,
        });
        offset += length;
      }
    }
    if edges.is_empty() {
      return Err(TextError::EmptyPath);
    }

    Ok(Self {
      edges,
      total_length: offset,
      closed: is_closed(path),
      position: 0.0,
    })
  }

  pub fn total_length(&self) -> f32 {
    self.total_length
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Moves the cursor to `offset` user units along the path.
  ///
  /// On a closed path the offset wraps into `[0, length)`, so an offset of
  /// one-and-a-half turns lands half way around. Open paths keep the raw
  /// value; out-of-range placements are simply dropped later.
  pub fn set_start_offset(&mut self, offset: f32) {
    self.position = if self.closed {
      offset.rem_euclid(self.total_length)
    } else {
      offset
    };
  }

  /// The placement transform for a cluster of `advance_width`, then moves
  /// past it.
  ///
  /// The placement is anchored at the midpoint of the advance, so the
  /// rotation follows the tangent under the cluster's center and walking
  /// the same advances backward visits the same anchor points in reverse.
  /// Returns None when the midpoint lies outside the path; once past the
  /// end every later call is None.
  pub fn advance(&mut self, advance_width: f32) -> Option<Transform> {
    let placement = self.placement_at(self.position + advance_width * 0.5);
    self.position += advance_width;
    placement
  }

  fn placement_at(&self, position: f32) -> Option<Transform> {
    if position < 0.0 || position > self.total_length {
      return None;
    }
    let edge = match self
      .edges
      .iter()
      .find(|edge| position <= edge.offset + edge.length)
    {
      Some(edge) => edge,
      // position == total_length with accumulated rounding
      None => self.edges.last()?,
    };
    let t = ((position - edge.offset) / edge.length).clamp(0.0, 1.0);
    let point = lerp(edge.start, edge.end, t);
    let angle = (edge.end.y - edge.start.y)
      .atan2(edge.end.x - edge.start.x)
      .to_degrees();
    Some(Transform::from_translate(point.x, point.y).pre_concat(Transform::from_rotate(angle)))
  }
}
