//! Segment plans.

use serde::{Deserialize, Serialize};

/// How a word budget is split across segments.
///
/// The entries are ordered; segment `i` (1-based) targets `words_per_segment[i - 1]`.
///
/// # Examples
///
/// ```
/// use scriptorium_core::SegmentPlan;
///
/// let plan = SegmentPlan::new(vec![2400, 2400, 2400]);
/// assert_eq!(plan.segment_count(), 3);
/// assert_eq!(plan.total_words(), 7200);
/// assert_eq!(plan.target_for(2), Some(2400));
/// assert_eq!(plan.target_for(4), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPlan {
    words_per_segment: Vec<u32>,
}

impl SegmentPlan {
    /// Wrap a list of per-segment targets.
    pub fn new(words_per_segment: Vec<u32>) -> Self {
        Self { words_per_segment }
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.words_per_segment.len()
    }

    /// Per-segment targets in order.
    pub fn words_per_segment(&self) -> &[u32] {
        &self.words_per_segment
    }

    /// Sum of all targets.
    pub fn total_words(&self) -> u32 {
        self.words_per_segment.iter().sum()
    }

    /// Target of the 1-based segment `index`.
    pub fn target_for(&self, index: usize) -> Option<u32> {
        index
            .checked_sub(1)
            .and_then(|i| self.words_per_segment.get(i))
            .copied()
    }

    /// `(index, target)` pairs with 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.words_per_segment
            .iter()
            .enumerate()
            .map(|(i, words)| (i + 1, *words))
    }
}
