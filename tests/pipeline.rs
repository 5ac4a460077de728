//! Cross-sink pipeline properties
//!
//! Drives whole documents through both output sinks and checks that they
//! agree with each other and that clip surfaces never leak.

use fastsvg::context::NullPlatformMetrics;
use fastsvg::geometry::Length;
use fastsvg::geometry::Rect;
use fastsvg::geometry::ViewBox;
use fastsvg::AnimationState;
use fastsvg::ClipPathNode;
use fastsvg::Document;
use fastsvg::GeometryContext;
use fastsvg::NodeKind;
use fastsvg::Output;
use fastsvg::PixmapOutput;
use fastsvg::SceneNode;
use fastsvg::ShapeAttrs;
use fastsvg::ShapeOutput;
use fastsvg::SvgAttrs;
use fastsvg::TextPathAttrs;
use fastsvg::UnitType;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::Color;
use tiny_skia::Path;
use tiny_skia::PathBuilder;

fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Path {
  PathBuilder::from_rect(tiny_skia::Rect::from_xywh(x, y, w, h).unwrap())
}

fn shape(x: f32, y: f32, w: f32, h: f32) -> Arc<SceneNode> {
  Arc::new(SceneNode::new(NodeKind::Shape(ShapeAttrs {
    path: rect_path(x, y, w, h),
    fill: Color::WHITE,
  })))
}

fn document(width: f32, height: f32, children: Vec<Arc<SceneNode>>) -> Document {
  Document::new(Arc::new(
    SceneNode::new(NodeKind::Svg(SvgAttrs {
      width: Some(Length::px(width)),
      height: Some(Length::px(height)),
      ..SvgAttrs::default()
    }))
    .with_children(children),
  ))
}

/// Bounding box of all pixels with non-zero alpha.
fn painted_bounds(output: &PixmapOutput) -> Option<Rect> {
  let pixmap = output.pixmap();
  let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
  let (mut max_x, mut max_y) = (0, 0);
  let mut any = false;
  for y in 0..pixmap.height() {
    for x in 0..pixmap.width() {
      let alpha = pixmap.data()[(4 * (y * pixmap.width() + x) + 3) as usize];
      if alpha > 0 {
        any = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
      }
    }
  }
  any.then(|| {
    Rect::from_xywh(
      min_x as f32,
      min_y as f32,
      (max_x - min_x + 1) as f32,
      (max_y - min_y + 1) as f32,
    )
  })
}

#[test]
fn geometry_pass_agrees_with_raster_pass() {
  let document = document(
    32.0,
    32.0,
    vec![shape(4.0, 6.0, 10.0, 8.0), shape(20.0, 20.0, 6.0, 6.0)],
  );

  let outline = document
    .compute_shape()
    .expect("geometry pass")
    .expect("outline");
  let geometry_bounds = Rect::from_sk_rect(outline.bounds());

  let mut raster = PixmapOutput::new(32, 32).expect("pixmap");
  document.render(&mut raster, None).expect("raster pass");
  raster.dispose();
  let raster_bounds = painted_bounds(&raster).expect("painted");

  // Pixel bounds may exceed geometry bounds by the anti-aliasing fringe.
  assert!((raster_bounds.x() - geometry_bounds.x()).abs() <= 1.0);
  assert!((raster_bounds.y() - geometry_bounds.y()).abs() <= 1.0);
  assert!((raster_bounds.width() - geometry_bounds.width()).abs() <= 2.0);
  assert!((raster_bounds.height() - geometry_bounds.height()).abs() <= 2.0);
}

fn clipped_document(clip: ClipPathNode, size: f32) -> Document {
  let clip_node = Arc::new(SceneNode::new(NodeKind::ClipPath(clip)));
  let clipped = Arc::new(
    SceneNode::new(NodeKind::Shape(ShapeAttrs {
      path: rect_path(0.0, 0.0, size, size),
      fill: Color::WHITE,
    }))
    .with_geometry(GeometryContext {
      clip_path: Some(clip_node),
      ..GeometryContext::default()
    }),
  );
  document(size, size, vec![clipped])
}

#[test]
fn geometry_pass_agrees_with_raster_pass_under_clipping() {
  let clip = ClipPathNode::new(UnitType::UserSpaceOnUse, vec![shape(0.0, 0.0, 4.0, 16.0)]);
  let document = clipped_document(clip, 16.0);

  let outline = document
    .compute_shape()
    .expect("geometry pass")
    .expect("outline");
  let geometry_bounds = Rect::from_sk_rect(outline.bounds());

  let mut raster = PixmapOutput::new(16, 16).expect("pixmap");
  document.render(&mut raster, None).expect("raster pass");
  raster.dispose();
  let raster_bounds = painted_bounds(&raster).expect("painted");

  assert!((raster_bounds.x() - geometry_bounds.x()).abs() <= 1.0);
  assert!((raster_bounds.width() - geometry_bounds.width()).abs() <= 1.0);
  assert!((raster_bounds.height() - geometry_bounds.height()).abs() <= 1.0);
}

#[test]
fn soft_clip_surfaces_balance_over_a_full_render() {
  let clip = ClipPathNode::new(UnitType::UserSpaceOnUse, vec![shape(0.0, 0.0, 8.0, 16.0)]);
  let document = clipped_document(clip.clone(), 16.0);

  let mut output = PixmapOutput::new(16, 16).expect("pixmap");
  document.render(&mut output, None).expect("render");
  output.dispose();

  let bounds = painted_bounds(&output).expect("painted");
  assert!(bounds.max_x() <= 9.0, "fill confined to the mask");

  let stats = clip.cache_stats();
  assert_eq!(stats.acquired, stats.released, "no lease leaked");
  assert!(stats.acquired >= 1, "soft clip actually ran");
  assert_eq!(stats.pooled, 0, "one-shot render frees its surface");
}

#[test]
fn animated_render_pools_clip_surfaces() {
  let clip = ClipPathNode::new(UnitType::UserSpaceOnUse, vec![shape(0.0, 0.0, 8.0, 8.0)]);
  let document =
    clipped_document(clip.clone(), 16.0).with_animation_period(Duration::from_secs(1));
  assert!(document.is_animated());

  for frame in 0..3 {
    let mut output = PixmapOutput::new(16, 16).expect("pixmap");
    document
      .render_with_platform(
        &NullPlatformMetrics,
        &mut output,
        None,
        AnimationState::at(Duration::from_millis(100 * (frame + 1))),
      )
      .expect("frame");
    output.dispose();
  }

  let stats = clip.cache_stats();
  assert_eq!(stats.acquired, 3);
  assert_eq!(stats.released, 3);
  // Every frame reused the single pooled surface.
  assert_eq!(stats.pooled, 1);
}

#[test]
fn invalid_clip_path_renders_unclipped() {
  let invalid = ClipPathNode::new(
    UnitType::UserSpaceOnUse,
    vec![Arc::new(SceneNode::new(NodeKind::Group))],
  );
  assert!(!invalid.is_valid());
  let document = clipped_document(invalid.clone(), 8.0);

  let mut output = PixmapOutput::new(8, 8).expect("pixmap");
  document.render(&mut output, None).expect("render");
  output.dispose();

  let bounds = painted_bounds(&output).expect("painted");
  assert_eq!(bounds, Rect::from_xywh(0.0, 0.0, 8.0, 8.0));
  assert_eq!(invalid.cache_stats().acquired, 0);
}

#[test]
fn geometry_pass_skips_mask_surfaces_entirely() {
  let clip = ClipPathNode::new(UnitType::UserSpaceOnUse, vec![shape(0.0, 0.0, 4.0, 4.0)]);
  let document = clipped_document(clip.clone(), 8.0);

  let mut output = ShapeOutput::new();
  document.render(&mut output, None).expect("render");
  output.dispose();
  assert!(output.into_path().is_some());
  assert_eq!(clip.cache_stats().acquired, 0);
}

#[test]
fn text_on_path_renders_through_both_sinks() {
  let mut attrs = TextPathAttrs::new("abc", Some({
    let mut builder = PathBuilder::new();
    builder.move_to(2.0, 20.0);
    builder.line_to(30.0, 20.0);
    builder.finish().unwrap()
  }));
  attrs.advances = Some(vec![6.0, 6.0, 6.0]);
  let text = Arc::new(SceneNode::new(NodeKind::TextPath(attrs)));
  let document = document(32.0, 32.0, vec![text]);

  let outline = document
    .compute_shape()
    .expect("geometry pass")
    .expect("outline");
  let bounds = Rect::from_sk_rect(outline.bounds());
  assert!((bounds.x() - 2.0).abs() < 1e-4);
  assert!((bounds.width() - 18.0).abs() < 1e-4);

  let mut raster = PixmapOutput::new(32, 32).expect("pixmap");
  document.render(&mut raster, None).expect("raster pass");
  raster.dispose();
  assert!(painted_bounds(&raster).is_some());
}

#[test]
fn view_box_scaling_is_consistent_across_sinks() {
  let root = SceneNode::new(NodeKind::Svg(SvgAttrs {
    width: Some(Length::px(10.0)),
    height: Some(Length::px(10.0)),
    view_box: Some(ViewBox::new(0.0, 0.0, 100.0, 100.0)),
    ..SvgAttrs::default()
  }))
  .with_children(vec![shape(0.0, 0.0, 50.0, 50.0)]);
  let document = Document::new(Arc::new(root));

  let outline = document
    .compute_shape()
    .expect("geometry pass")
    .expect("outline");
  // 50 view-box units at 1:10 scale.
  assert!((outline.bounds().width() - 5.0).abs() < 1e-4);
}
