//! Error types for the render core
//!
//! Degradations that SVG defines as recoverable (an invalid clip-path, an
//! unresolvable text path, degenerate geometry) are *not* errors: the
//! affected element loses the effect or renders nothing, and rendering
//! continues. The error types here cover the cases where a render pass
//! genuinely cannot proceed, such as a surface allocation that would
//! overflow.

use thiserror::Error;

/// Result type alias for render-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
  /// Surface allocation or compositing error
  #[error("Render error: {0}")]
  Render(#[from] RenderError),

  /// Text segmentation or layout error
  #[error("Text error: {0}")]
  Text(#[from] TextError),
}

/// Errors raised by surface management and compositing
#[derive(Error, Debug, Clone)]
pub enum RenderError {
  /// A surface allocation was rejected (zero, overflowing, or oversized)
  #[error("Invalid surface: {message}")]
  InvalidSurface { message: String },
}

/// Errors raised by text layout
#[derive(Error, Debug, Clone)]
pub enum TextError {
  /// A glyph cursor was constructed over an empty path
  #[error("Empty layout path")]
  EmptyPath,
}
