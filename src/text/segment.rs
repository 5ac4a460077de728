//! Grapheme cluster segmentation
//!
//! Layout operates on extended grapheme clusters, never raw chars: a base
//! letter plus its combining marks moves along the path as one unit.

use unicode_segmentation::UnicodeSegmentation;

/// Splits `text` into extended grapheme clusters.
pub fn clusters(text: &str) -> impl Iterator<Item = &str> {
  text.graphemes(true)
}

/// Number of extended grapheme clusters in `text`.
pub fn cluster_count(text: &str) -> usize {
  clusters(text).count()
}

/// An index-addressable view of a string's grapheme clusters
///
/// Built once per layout so cluster lookups by index stay O(1) while the
/// shaper's advance table is consumed positionally.
#[derive(Debug, Clone)]
pub struct GraphemeClusters<'a> {
  clusters: Vec<&'a str>,
}

impl<'a> GraphemeClusters<'a> {
  pub fn new(text: &'a str) -> Self {
    Self {
      clusters: clusters(text).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.clusters.len()
  }

  pub fn is_empty(&self) -> bool {
    self.clusters.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&'a str> {
    self.clusters.get(index).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
    self.clusters.iter().copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn combining_mark_stays_with_base() {
    // "e" followed by COMBINING ACUTE ACCENT is a single cluster.
    let text = "e\u{0301}";
    assert_eq!(text.chars().count(), 2);
    assert_eq!(cluster_count(text), 1);
    assert_eq!(clusters(text).next(), Some("e\u{301}"));
  }

  #[test]
  fn ascii_clusters_are_chars() {
    let collected: Vec<&str> = clusters("abc").collect();
    assert_eq!(collected, vec!["a", "b", "c"]);
  }

  #[test]
  fn emoji_with_modifier_is_one_cluster() {
    // WOMAN + EMOJI MODIFIER FITZPATRICK TYPE-4
    assert_eq!(cluster_count("\u{1F469}\u{1F3FD}"), 1);
  }

  #[test]
  fn indexed_view_addresses_clusters() {
    let view = GraphemeClusters::new("ae\u{0301}b");
    assert_eq!(view.len(), 3);
    assert_eq!(view.get(1), Some("e\u{301}"));
    assert_eq!(view.get(3), None);
    assert!(!view.is_empty());
    assert_eq!(view.iter().count(), 3);
  }
}
