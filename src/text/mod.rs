//! Text-on-path layout
//!
//! Splitting into grapheme clusters, walking a flattened path, and placing
//! cluster boxes along it. Shaping is external; the layout consumes
//! per-cluster advances when the parser supplies them and falls back to an
//! em-proportional estimate otherwise.

pub mod layout;
pub mod path_cursor;
pub mod segment;
