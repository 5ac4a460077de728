//! Core geometry types for the render pipeline
//!
//! All coordinates are in SVG user units unless a function says otherwise.
//! The coordinate system has its origin at the top-left corner: positive X
//! extends to the right, positive Y downward.

use tiny_skia::Transform;

/// A 2D point in user space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

  pub const fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

/// A 2D size (width and height)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
  pub width: f32,
  pub height: f32,
}

impl Size {
  pub const ZERO: Self = Self {
    width: 0.0,
    height: 0.0,
  };

  pub const fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  pub fn is_empty(self) -> bool {
    self.width <= 0.0 || self.height <= 0.0
  }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
  pub origin: Point,
  pub size: Size,
}

impl Rect {
  pub const ZERO: Self = Self {
    origin: Point::ZERO,
    size: Size::ZERO,
  };

  pub const fn new(origin: Point, size: Size) -> Self {
    Self { origin, size }
  }

  pub const fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      origin: Point::new(x, y),
      size: Size::new(width, height),
    }
  }

  pub fn x(self) -> f32 {
    self.origin.x
  }

  pub fn y(self) -> f32 {
    self.origin.y
  }

  pub fn width(self) -> f32 {
    self.size.width
  }

  pub fn height(self) -> f32 {
    self.size.height
  }

  pub fn max_x(self) -> f32 {
    self.origin.x + self.size.width
  }

  pub fn max_y(self) -> f32 {
    self.origin.y + self.size.height
  }

  pub fn is_empty(self) -> bool {
    self.size.is_empty()
  }

  pub fn translate(self, offset: Point) -> Rect {
    Rect {
      origin: Point::new(self.origin.x + offset.x, self.origin.y + offset.y),
      size: self.size,
    }
  }

  /// Returns the overlapping region of two rectangles, or None if disjoint.
  pub fn intersection(self, other: Rect) -> Option<Rect> {
    let x1 = self.x().max(other.x());
    let y1 = self.y().max(other.y());
    let x2 = self.max_x().min(other.max_x());
    let y2 = self.max_y().min(other.max_y());
    if x2 <= x1 || y2 <= y1 {
      return None;
    }
    Some(Rect::from_xywh(x1, y1, x2 - x1, y2 - y1))
  }

  pub fn union(self, other: Rect) -> Rect {
    if self.is_empty() {
      return other;
    }
    if other.is_empty() {
      return self;
    }
    let x1 = self.x().min(other.x());
    let y1 = self.y().min(other.y());
    let x2 = self.max_x().max(other.max_x());
    let y2 = self.max_y().max(other.max_y());
    Rect::from_xywh(x1, y1, x2 - x1, y2 - y1)
  }

  pub fn contains_point(self, point: Point) -> bool {
    point.x >= self.x() && point.x <= self.max_x() && point.y >= self.y() && point.y <= self.max_y()
  }

  pub fn to_sk_rect(self) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(self.x(), self.y(), self.width(), self.height())
  }

  pub fn from_sk_rect(rect: tiny_skia::Rect) -> Self {
    Rect::from_xywh(rect.x(), rect.y(), rect.width(), rect.height())
  }
}

/// Maps a point through an affine transform.
pub fn map_point(transform: Transform, point: Point) -> Point {
  Point::new(
    transform.sx * point.x + transform.kx * point.y + transform.tx,
    transform.ky * point.x + transform.sy * point.y + transform.ty,
  )
}

/// Axis-aligned bounds of a rectangle after an arbitrary affine transform.
///
/// The result contains all four mapped corners, so for rotated or skewed
/// transforms it is larger than the mapped shape itself.
pub fn containing_bounds_after_transform(transform: Transform, rect: Rect) -> Rect {
  let corners = [
    map_point(transform, rect.origin),
    map_point(transform, Point::new(rect.max_x(), rect.y())),
    map_point(transform, Point::new(rect.max_x(), rect.max_y())),
    map_point(transform, Point::new(rect.x(), rect.max_y())),
  ];
  let mut min_x = f32::INFINITY;
  let mut min_y = f32::INFINITY;
  let mut max_x = f32::NEG_INFINITY;
  let mut max_y = f32::NEG_INFINITY;
  for corner in corners {
    min_x = min_x.min(corner.x);
    min_y = min_y.min(corner.y);
    max_x = max_x.max(corner.x);
    max_y = max_y.max(corner.y);
  }
  Rect::from_xywh(min_x, min_y, (max_x - min_x).max(0.0), (max_y - min_y).max(0.0))
}

/// An SVG view box: a window into user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
  pub min_x: f32,
  pub min_y: f32,
  pub width: f32,
  pub height: f32,
}

impl ViewBox {
  pub const fn new(min_x: f32, min_y: f32, width: f32, height: f32) -> Self {
    Self {
      min_x,
      min_y,
      width,
      height,
    }
  }

  pub const fn from_size(size: Size) -> Self {
    Self {
      min_x: 0.0,
      min_y: 0.0,
      width: size.width,
      height: size.height,
    }
  }

  pub fn size(self) -> Size {
    Size::new(self.width, self.height)
  }

  pub fn location(self) -> Point {
    Point::new(self.min_x, self.min_y)
  }

  pub fn to_rect(self) -> Rect {
    Rect::from_xywh(self.min_x, self.min_y, self.width, self.height)
  }

  pub fn is_empty(self) -> bool {
    self.width <= 0.0 || self.height <= 0.0
  }
}

/// A length with a resolvable unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
  pub value: f32,
  pub unit: LengthUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
  /// User units (CSS pixels)
  Px,
  /// Multiples of the current font size
  Em,
  /// Multiples of the current font x-height
  Ex,
  /// Percentage of a caller-supplied base
  Percent,
}

impl Length {
  pub const fn px(value: f32) -> Self {
    Self {
      value,
      unit: LengthUnit::Px,
    }
  }

  pub const fn em(value: f32) -> Self {
    Self {
      value,
      unit: LengthUnit::Em,
    }
  }

  pub const fn ex(value: f32) -> Self {
    Self {
      value,
      unit: LengthUnit::Ex,
    }
  }

  pub const fn percent(value: f32) -> Self {
    Self {
      value,
      unit: LengthUnit::Percent,
    }
  }

  pub fn is_percentage(self) -> bool {
    self.unit == LengthUnit::Percent
  }

  /// Resolves to user units against the given font metrics and percentage base.
  pub fn resolve(self, em: f32, ex: f32, percentage_base: f32) -> f32 {
    match self.unit {
      LengthUnit::Px => self.value,
      LengthUnit::Em => self.value * em,
      LengthUnit::Ex => self.value * ex,
      LengthUnit::Percent => self.value / 100.0 * percentage_base,
    }
  }
}

/// `preserveAspectRatio` alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
  XMinYMin,
  XMidYMin,
  XMaxYMin,
  XMinYMid,
  XMidYMid,
  XMaxYMid,
  XMinYMax,
  XMidYMax,
  XMaxYMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetOrSlice {
  /// Scale down until the whole view box is visible
  Meet,
  /// Scale up until the whole viewport is covered
  Slice,
}

/// Uniform-fit policy mapping a view box into a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreserveAspectRatio {
  /// Non-uniform stretch; align and meet/slice are ignored
  pub none: bool,
  pub align: Align,
  pub meet_or_slice: MeetOrSlice,
}

impl PreserveAspectRatio {
  pub const fn new(align: Align, meet_or_slice: MeetOrSlice) -> Self {
    Self {
      none: false,
      align,
      meet_or_slice,
    }
  }

  pub const fn stretch() -> Self {
    Self {
      none: true,
      align: Align::XMidYMid,
      meet_or_slice: MeetOrSlice::Meet,
    }
  }

  /// The policy used when fitting a document into caller-supplied display
  /// bounds: centered, uniformly scaled to fit.
  pub const fn for_display() -> Self {
    Self::new(Align::XMidYMid, MeetOrSlice::Meet)
  }

  /// Computes the transform mapping `view_box` into a viewport of `size`.
  pub fn view_box_transform(self, view_box: ViewBox, size: Size) -> Transform {
    if view_box.is_empty() || size.is_empty() {
      return Transform::identity();
    }

    let sx = size.width / view_box.width;
    let sy = size.height / view_box.height;
    if self.none {
      return Transform::from_row(
        sx,
        0.0,
        0.0,
        sy,
        -view_box.min_x * sx,
        -view_box.min_y * sy,
      );
    }

    let scale = match self.meet_or_slice {
      MeetOrSlice::Meet => sx.min(sy),
      MeetOrSlice::Slice => sx.max(sy),
    };
    let scaled_w = view_box.width * scale;
    let scaled_h = view_box.height * scale;

    let (align_x, align_y) = match self.align {
      Align::XMinYMin => (0.0, 0.0),
      Align::XMidYMin => ((size.width - scaled_w) * 0.5, 0.0),
      Align::XMaxYMin => (size.width - scaled_w, 0.0),
      Align::XMinYMid => (0.0, (size.height - scaled_h) * 0.5),
      Align::XMidYMid => (
        (size.width - scaled_w) * 0.5,
        (size.height - scaled_h) * 0.5,
      ),
      Align::XMaxYMid => (size.width - scaled_w, (size.height - scaled_h) * 0.5),
      Align::XMinYMax => (0.0, size.height - scaled_h),
      Align::XMidYMax => ((size.width - scaled_w) * 0.5, size.height - scaled_h),
      Align::XMaxYMax => (size.width - scaled_w, size.height - scaled_h),
    };

    Transform::from_row(
      scale,
      0.0,
      0.0,
      scale,
      align_x - view_box.min_x * scale,
      align_y - view_box.min_y * scale,
    )
  }
}
