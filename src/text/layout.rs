//! Placement of grapheme clusters along a path
//!
//! Each cluster gets one placement transform from the path cursor and an
//! advance width, either supplied by the external shaper or estimated from
//! the font size. Clusters the path cannot hold are dropped without error.

use crate::context::MeasureContext;
use crate::node::TextPathAttrs;
use crate::path_util::append_path;
use crate::text::path_cursor::PathCursor;
use crate::text::segment;
use tiny_skia::Path;
use tiny_skia::PathBuilder;
use tiny_skia::Transform;

/// Advance per cluster, as a fraction of em, when no shaper data exists.
pub const FALLBACK_ADVANCE_RATIO: f32 = 0.6;

/// Fraction of em above the baseline covered by a cluster box.
const ASCENT_RATIO: f32 = 0.8;

/// Fraction of the x-height allowed as curve flattening error.
const FLATTEN_TOLERANCE_RATIO: f32 = 0.1;

/// One placed grapheme cluster
#[derive(Debug, Clone, Copy)]
pub struct ClusterPlacement {
  pub advance: f32,
  /// Maps cluster-local space (origin at the cluster's center on the
  /// baseline, +x along the advance direction) into the element's user
  /// space.
  pub transform: Transform,
}

fn cursor_for(attrs: &TextPathAttrs, measure: &MeasureContext) -> Option<PathCursor> {
  let path = attrs.path.as_ref()?;
  let tolerance = FLATTEN_TOLERANCE_RATIO * measure.ex();
  let mut cursor = match PathCursor::new(path, attrs.side, tolerance) {
    Ok(cursor) => cursor,
    Err(error) => {
      log::warn!("text path ignored: {error}");
      return None;
    }
  };
  let offset = attrs
    .start_offset
    .resolve(measure.em(), measure.ex(), cursor.total_length());
  cursor.set_start_offset(offset);
  Some(cursor)
}

/// Lays out every cluster of `attrs.text` along its path.
///
/// Clusters the path cannot hold (before its start or past its end) are
/// omitted from the result; the remaining placements keep text order.
pub fn cluster_placements(attrs: &TextPathAttrs, measure: &MeasureContext) -> Vec<ClusterPlacement> {
  let Some(mut cursor) = cursor_for(attrs, measure) else {
    return Vec::new();
  };
  let clusters = segment::GraphemeClusters::new(&attrs.text);
  let fallback = measure.em() * FALLBACK_ADVANCE_RATIO;
  let mut placements = Vec::with_capacity(clusters.len());
  for index in 0..clusters.len() {
    let advance = attrs
      .advances
      .as_ref()
      .and_then(|advances| advances.get(index).copied())
      .unwrap_or(fallback);
    if let Some(transform) = cursor.advance(advance) {
      placements.push(ClusterPlacement { advance, transform });
    }
  }
  placements
}

/// The union outline of all placed cluster boxes, in element user space.
///
/// Cluster boxes stand in for shaped glyph outlines: one em-tall rectangle
/// per cluster, sitting on the baseline. None when nothing was placed.
pub fn glyph_outline(attrs: &TextPathAttrs, measure: &MeasureContext) -> Option<Path> {
  let placements = cluster_placements(attrs, measure);
  let em = measure.em();
  let ascent = em * ASCENT_RATIO;
  let mut builder = PathBuilder::new();
  for placement in placements {
    let Some(rect) =
      tiny_skia::Rect::from_xywh(-placement.advance * 0.5, -ascent, placement.advance, em)
    else {
      continue;
    };
    let Some(cluster_box) = PathBuilder::from_rect(rect).transform(placement.transform) else {
      continue;
    };
    append_path(&mut builder, &cluster_box);
  }
  builder.finish()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::ex_from_em;
  use crate::context::AnimationState;
  use crate::geometry::Length;
  use crate::geometry::Point;
  use crate::geometry::Size;
  use crate::geometry::map_point;
  use crate::text::path_cursor::Side;

  fn measure() -> MeasureContext {
    MeasureContext::create_initial(
      Size::new(100.0, 100.0),
      10.0,
      ex_from_em(10.0),
      AnimationState::NO_ANIMATION,
    )
  }

  fn line(length: f32) -> Path {
    let mut builder = PathBuilder::new();
    builder.move_to(0.0, 0.0);
    builder.line_to(length, 0.0);
    builder.finish().unwrap()
  }

  fn square(size: f32) -> Path {
    let mut builder = PathBuilder::new();
    builder.move_to(0.0, 0.0);
    builder.line_to(size, 0.0);
    builder.line_to(size, size);
    builder.line_to(0.0, size);
    builder.close();
    builder.finish().unwrap()
  }

  fn origins(placements: &[ClusterPlacement]) -> Vec<Point> {
    placements
      .iter()
      .map(|p| map_point(p.transform, Point::ZERO))
      .collect()
  }

  #[test]
  fn clusters_past_the_end_are_dropped() {
    let mut attrs = TextPathAttrs::new("abcd", Some(line(10.0)));
    attrs.advances = Some(vec![4.0, 4.0, 4.0, 4.0]);
    let placements = cluster_placements(&attrs, &measure());
    // Anchor midpoints 2, 6, 10 fit; 14 does not.
    assert_eq!(placements.len(), 3);
    let origins = origins(&placements);
    assert!((origins[2].x - 10.0).abs() < 1e-5);
  }

  #[test]
  fn shaper_advances_override_fallback() {
    let mut attrs = TextPathAttrs::new("ab", Some(line(100.0)));
    attrs.advances = Some(vec![3.0, 7.0]);
    let shaped = origins(&cluster_placements(&attrs, &measure()));
    assert!((shaped[1].x - 6.5).abs() < 1e-5);

    let fallback_attrs = TextPathAttrs::new("ab", Some(line(100.0)));
    let estimated = origins(&cluster_placements(&fallback_attrs, &measure()));
    assert!((estimated[1].x - 9.0).abs() < 1e-5, "0.6em default");
  }

  #[test]
  fn combining_mark_shares_its_base_placement() {
    let attrs = TextPathAttrs::new("e\u{0301}x", Some(line(100.0)));
    let placements = cluster_placements(&attrs, &measure());
    assert_eq!(placements.len(), 2);
  }

  #[test]
  fn right_side_mirrors_left_side_positions() {
    let length = 10.0;
    let mut left = TextPathAttrs::new("ab", Some(line(length)));
    left.advances = Some(vec![4.0, 4.0]);
    let mut right = left.clone();
    right.side = Side::Right;

    let left_origins = origins(&cluster_placements(&left, &measure()));
    let right_origins = origins(&cluster_placements(&right, &measure()));
    assert_eq!(left_origins.len(), right_origins.len());
    for (l, r) in left_origins.iter().zip(&right_origins) {
      assert!((r.x - (length - l.x)).abs() < 1e-5);
    }
  }

  #[test]
  fn percent_offset_wraps_on_closed_path() {
    let mut a = TextPathAttrs::new("a", Some(square(10.0)));
    a.start_offset = Length::percent(150.0);
    let mut b = TextPathAttrs::new("a", Some(square(10.0)));
    b.start_offset = Length::percent(50.0);

    let pa = origins(&cluster_placements(&a, &measure()));
    let pb = origins(&cluster_placements(&b, &measure()));
    assert_eq!(pa.len(), 1);
    assert!((pa[0].x - pb[0].x).abs() < 1e-5);
    assert!((pa[0].y - pb[0].y).abs() < 1e-5);
  }

  #[test]
  fn missing_path_places_nothing() {
    let attrs = TextPathAttrs::new("abc", None);
    assert!(cluster_placements(&attrs, &measure()).is_empty());
    assert!(glyph_outline(&attrs, &measure()).is_none());
  }

  #[test]
  fn outline_covers_placed_boxes() {
    let mut attrs = TextPathAttrs::new("ab", Some(line(100.0)));
    attrs.advances = Some(vec![5.0, 5.0]);
    let outline = glyph_outline(&attrs, &measure()).expect("outline");
    let bounds = outline.bounds();
    assert!((bounds.x() - 0.0).abs() < 1e-5);
    assert!((bounds.width() - 10.0).abs() < 1e-5);
    // One em tall, sitting on the baseline.
    assert!((bounds.height() - 10.0).abs() < 1e-5);
    assert!((bounds.y() + 8.0).abs() < 1e-5);
  }
}
