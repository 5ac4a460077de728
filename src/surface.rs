//! Pooled off-screen surfaces for mask compositing
//!
//! Soft clipping renders a luminosity mask into an off-screen buffer. For
//! animated documents the same clip is rasterized every frame, so each
//! clip-path owns a [`SurfaceCache`] that recycles equally-sized buffers
//! across passes. A [`SurfaceLease`] returns its buffer in `Drop`, so the
//! release happens exactly once on every exit path of the scope that
//! acquired it.

use crate::context::RenderContext;
use crate::error::RenderError;
use crate::geometry::Point;
use crate::geometry::Rect;
use crate::output::Output;
use crate::output::Paint;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tiny_skia::Color;
use tiny_skia::FillRule;
use tiny_skia::Path;
use tiny_skia::Pixmap;
use tiny_skia::Transform;

const BYTES_PER_PIXEL: u64 = 4;
/// Upper bound on a single surface allocation to avoid process aborts on OOM.
const MAX_SURFACE_BYTES: u64 = 256 * 1024 * 1024;

fn guard_dimensions(width: u32, height: u32) -> Result<(), RenderError> {
  if width == 0 || height == 0 {
    return Err(RenderError::InvalidSurface {
      message: format!("surface size is zero ({width}x{height})"),
    });
  }
  let bytes = (width as u64)
    .checked_mul(height as u64)
    .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
    .ok_or_else(|| RenderError::InvalidSurface {
      message: format!("surface dimensions overflow ({width}x{height})"),
    })?;
  if bytes > MAX_SURFACE_BYTES {
    return Err(RenderError::InvalidSurface {
      message: format!("surface {width}x{height} would allocate {bytes} bytes (limit {MAX_SURFACE_BYTES})"),
    });
  }
  Ok(())
}

fn new_surface(width: u32, height: u32) -> Result<Pixmap, RenderError> {
  guard_dimensions(width, height)?;
  Pixmap::new(width, height).ok_or_else(|| RenderError::InvalidSurface {
    message: format!("surface creation failed for {width}x{height}"),
  })
}

/// Acquire/release counters, exposed for leak instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
  pub acquired: usize,
  pub released: usize,
  pub pooled: usize,
}

/// Pool of reusable luminosity buffers, owned by one clip-path node
///
/// The pool sits behind a mutex, so a document shared across threads stays
/// sound; concurrent renders of the same node only contend on pool access.
#[derive(Debug, Default)]
pub struct SurfaceCache {
  pool: Mutex<Vec<Pixmap>>,
  acquired: AtomicUsize,
  released: AtomicUsize,
}

impl SurfaceCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether pooling applies for this output and render context.
  ///
  /// Only raster-capable outputs during animated renders benefit: a
  /// one-shot render has no later frame to reuse the buffer, and geometry
  /// outputs never reach the soft-clip path at all.
  pub fn use_cache(&self, output: &dyn Output, ctx: &RenderContext) -> bool {
    output.is_soft_clipping_enabled() && ctx.measure().animation().is_animated()
  }

  /// Checks out a buffer of exactly `width` x `height` pixels.
  ///
  /// Pooled buffers are reused when one of matching size is available;
  /// otherwise a fresh allocation is made, guarded against overflow and
  /// oversize. The returned lease releases the buffer in `Drop`: back to
  /// the pool when `use_cache` is set, freed otherwise.
  pub fn acquire(&self, width: u32, height: u32, use_cache: bool) -> Result<SurfaceLease<'_>, RenderError> {
    let reused = if use_cache {
      let mut pool = self.pool.lock().expect("surface pool poisoned");
      pool
        .iter()
        .position(|surface| surface.width() == width && surface.height() == height)
        .map(|idx| pool.swap_remove(idx))
    } else {
      None
    };

    let mut surface = match reused {
      Some(surface) => surface,
      None => new_surface(width, height)?,
    };
    // Pooled surfaces carry the previous frame's mask.
    surface.fill(Color::TRANSPARENT);

    self.acquired.fetch_add(1, Ordering::Relaxed);
    Ok(SurfaceLease {
      surface: Some(surface),
      cache: self,
      pooled: use_cache,
    })
  }

  pub fn stats(&self) -> CacheStats {
    CacheStats {
      acquired: self.acquired.load(Ordering::Relaxed),
      released: self.released.load(Ordering::Relaxed),
      pooled: self.pool.lock().expect("surface pool poisoned").len(),
    }
  }

  fn release(&self, surface: Pixmap, pooled: bool) {
    self.released.fetch_add(1, Ordering::Relaxed);
    if pooled {
      self.pool.lock().expect("surface pool poisoned").push(surface);
    }
  }
}

/// Exclusive handle to a checked-out surface
///
/// Releases its buffer exactly once, when dropped.
#[derive(Debug)]
pub struct SurfaceLease<'a> {
  surface: Option<Pixmap>,
  cache: &'a SurfaceCache,
  pooled: bool,
}

impl SurfaceLease<'_> {
  pub fn surface(&self) -> &Pixmap {
    self.surface.as_ref().expect("lease already released")
  }

  pub fn surface_mut(&mut self) -> &mut Pixmap {
    self.surface.as_mut().expect("lease already released")
  }
}

impl Drop for SurfaceLease<'_> {
  fn drop(&mut self) {
    if let Some(surface) = self.surface.take() {
      self.cache.release(surface, self.pooled);
    }
  }
}

/// A leased surface anchored at a device-space rectangle
///
/// The buffer covers exactly the integer bounds of `device_bounds`; painting
/// into it goes through [`fill_luminous`](Self::fill_luminous), which shifts
/// device coordinates into the buffer.
#[derive(Debug)]
pub struct BlittableImage<'a> {
  lease: SurfaceLease<'a>,
  device_bounds: Rect,
}

impl<'a> BlittableImage<'a> {
  /// Leases a buffer covering `device_rect`, or None when the rect has no
  /// pixel coverage (in which case no buffer is requested at all).
  pub fn create(
    cache: &'a SurfaceCache,
    use_cache: bool,
    device_rect: Rect,
  ) -> Result<Option<BlittableImage<'a>>, RenderError> {
    if device_rect.is_empty() {
      return Ok(None);
    }
    let min_x = device_rect.x().floor();
    let min_y = device_rect.y().floor();
    let width = (device_rect.max_x().ceil() - min_x) as u32;
    let height = (device_rect.max_y().ceil() - min_y) as u32;
    if width == 0 || height == 0 {
      return Ok(None);
    }
    let lease = cache.acquire(width, height, use_cache)?;
    Ok(Some(BlittableImage {
      lease,
      device_bounds: Rect::from_xywh(min_x, min_y, width as f32, height as f32),
    }))
  }

  pub fn device_bounds(&self) -> Rect {
    self.device_bounds
  }

  /// Fills `path` at maximum luminosity under `device_transform`.
  pub fn fill_luminous(&mut self, path: &Path, device_transform: Transform) {
    let shifted =
      device_transform.post_translate(-self.device_bounds.x(), -self.device_bounds.y());
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(Color::WHITE);
    paint.anti_alias = true;
    self
      .lease
      .surface_mut()
      .fill_path(path, &paint, FillRule::Winding, shifted, None);
  }

  /// Wraps the rendered buffer as a mask-modulated paint.
  ///
  /// Copies the buffer out and drops the lease, so the surface returns to
  /// its cache the moment the paint exists.
  pub fn into_paint(self) -> Paint {
    let origin = Point::new(self.device_bounds.x(), self.device_bounds.y());
    Paint::LuminosityMask {
      surface: self.lease.surface().clone(),
      origin,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_zero_and_oversized_dimensions() {
    assert!(matches!(new_surface(0, 4), Err(RenderError::InvalidSurface { .. })));
    assert!(matches!(new_surface(4, 0), Err(RenderError::InvalidSurface { .. })));
    let too_wide = (MAX_SURFACE_BYTES / BYTES_PER_PIXEL + 1) as u32;
    assert!(matches!(
      new_surface(too_wide, 1),
      Err(RenderError::InvalidSurface { .. })
    ));
  }

  #[test]
  fn one_shot_lease_is_freed_not_pooled() {
    let cache = SurfaceCache::new();
    {
      let lease = cache.acquire(4, 4, false).expect("acquire");
      assert_eq!(lease.surface().width(), 4);
    }
    let stats = cache.stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.pooled, 0);
  }

  #[test]
  fn pooled_lease_returns_and_reuses() {
    let cache = SurfaceCache::new();
    drop(cache.acquire(8, 8, true).expect("acquire"));
    assert_eq!(cache.stats().pooled, 1);

    drop(cache.acquire(8, 8, true).expect("reuse"));
    let stats = cache.stats();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.released, 2);
    // Same buffer cycled through, not a second allocation kept around.
    assert_eq!(stats.pooled, 1);
  }

  #[test]
  fn pooled_reuse_requires_matching_size() {
    let cache = SurfaceCache::new();
    drop(cache.acquire(8, 8, true).expect("acquire"));
    drop(cache.acquire(4, 4, true).expect("different size"));
    assert_eq!(cache.stats().pooled, 2);
  }

  #[test]
  fn reused_surface_is_cleared() {
    let cache = SurfaceCache::new();
    {
      let mut lease = cache.acquire(2, 2, true).expect("acquire");
      lease.surface_mut().fill(Color::WHITE);
    }
    let lease = cache.acquire(2, 2, true).expect("reuse");
    assert!(lease.surface().data().iter().all(|byte| *byte == 0));
  }

  #[test]
  fn blittable_image_skips_empty_rects() {
    let cache = SurfaceCache::new();
    let image = BlittableImage::create(&cache, false, Rect::ZERO).expect("no error");
    assert!(image.is_none());
    assert_eq!(cache.stats().acquired, 0);
  }

  #[test]
  fn blittable_image_snaps_to_pixel_grid() {
    let cache = SurfaceCache::new();
    let image = BlittableImage::create(&cache, false, Rect::from_xywh(0.4, 0.4, 3.2, 3.2))
      .expect("no error")
      .expect("non-empty");
    assert_eq!(image.device_bounds(), Rect::from_xywh(0.0, 0.0, 4.0, 4.0));
  }
}
