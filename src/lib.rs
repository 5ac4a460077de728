//! SVG render core
//!
//! Renders an already-parsed SVG scene tree into a raster surface or a
//! pure geometric outline. The crate covers the compositing half of an
//! SVG engine: the nested transform/viewport context stack, clip-path
//! resolution (hard region clips with an axis-aligned fast path, soft
//! luminosity-mask clips over pooled off-screen surfaces), and
//! grapheme-aware text-on-path layout.
//!
//! Parsing, CSS, filters, font shaping, and I/O live in external
//! collaborators: the scene tree arrives fully resolved, and shaped
//! advance widths ride in on the text nodes.
//!
//! ```
//! use fastsvg::Document;
//! use fastsvg::NodeKind;
//! use fastsvg::Output as _;
//! use fastsvg::PixmapOutput;
//! use fastsvg::SceneNode;
//! use fastsvg::ShapeAttrs;
//! use fastsvg::SvgAttrs;
//! use fastsvg::geometry::Length;
//! use std::sync::Arc;
//! use tiny_skia::Color;
//! use tiny_skia::PathBuilder;
//!
//! let circle = SceneNode::new(NodeKind::Shape(ShapeAttrs {
//!   path: PathBuilder::from_oval(tiny_skia::Rect::from_xywh(2.0, 2.0, 12.0, 12.0).unwrap()).unwrap(),
//!   fill: Color::BLACK,
//! }));
//! let root = SceneNode::new(NodeKind::Svg(SvgAttrs {
//!   width: Some(Length::px(16.0)),
//!   height: Some(Length::px(16.0)),
//!   ..SvgAttrs::default()
//! }))
//! .with_children(vec![Arc::new(circle)]);
//!
//! let document = Document::new(Arc::new(root));
//! let mut output = PixmapOutput::new(16, 16).unwrap();
//! document.render(&mut output, None).unwrap();
//! output.dispose();
//! ```

pub mod clip;
pub mod context;
pub mod document;
pub mod error;
pub mod geometry;
pub mod node;
pub mod output;
mod path_util;
pub mod render;
pub mod surface;
pub mod text;

pub use clip::ClipPathNode;
pub use clip::ClipShape;
pub use context::AnimationState;
pub use context::MeasureContext;
pub use context::NullPlatformMetrics;
pub use context::PlatformMetrics;
pub use context::RenderContext;
pub use document::Document;
pub use error::Error;
pub use error::Result;
pub use geometry::PreserveAspectRatio;
pub use geometry::Rect;
pub use geometry::Size;
pub use geometry::ViewBox;
pub use node::GeometryContext;
pub use node::NodeKind;
pub use node::SceneNode;
pub use node::ShapeAttrs;
pub use node::SvgAttrs;
pub use node::TextPathAttrs;
pub use node::UnitType;
pub use output::Output;
pub use output::Paint;
pub use output::PixmapOutput;
pub use output::ShapeOutput;
pub use render::render_node;
pub use surface::SurfaceCache;
pub use surface::SurfaceLease;
pub use text::path_cursor::PathCursor;
pub use text::path_cursor::Side;
pub use text::segment::GraphemeClusters;
