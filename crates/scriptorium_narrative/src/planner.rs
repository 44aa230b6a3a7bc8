//! Segment planning.

use scriptorium_core::SegmentPlan;
use tracing::{debug, warn};

/// Long works are split into at least this many segments.
pub const MIN_SEGMENTS_FOR_LONG_WORK: usize = 3;
/// Long works aim for roughly this many words per segment.
pub const WORDS_PER_SEGMENT_DIVISOR: u32 = 2500;
/// No segment is planned shorter than this, unless the whole work is.
pub const MIN_SEGMENT_WORDS: u32 = 100;

/// Split `total_words` into ordered per-segment targets.
///
/// Works up to 1.5× `max_words_per_segment` use as few segments as fit;
/// longer works use one segment per ~2500 words, at least three. The sum of
/// the plan always equals `total_words`, leading segments absorb the
/// remainder, and the segment count never drops an entry below
/// [`MIN_SEGMENT_WORDS`]. A plan with an entry above 1.1× the maximum gets
/// one more segment, once.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::plan_segments;
///
/// let plan = plan_segments(12_000, 3_000);
/// assert_eq!(plan.words_per_segment(), &[2400, 2400, 2400, 2400, 2400]);
///
/// let plan = plan_segments(4_001, 3_000);
/// assert_eq!(plan.words_per_segment(), &[2001, 2000]);
/// ```
pub fn plan_segments(total_words: u32, max_words_per_segment: u32) -> SegmentPlan {
    if total_words == 0 {
        return SegmentPlan::new(vec![0]);
    }
    let max = max_words_per_segment.max(1);
    let ceiling = max_segments(total_words);

    let count = if f64::from(total_words) <= f64::from(max) * 1.5 {
        total_words.div_ceil(max) as usize
    } else {
        let by_divisor = (f64::from(total_words) / f64::from(WORDS_PER_SEGMENT_DIVISOR)).round();
        (by_divisor as usize).max(MIN_SEGMENTS_FOR_LONG_WORK)
    };
    let count = count.clamp(1, ceiling);
    let mut plan = distribute(total_words, count);

    let over = |plan: &[u32], factor: f64| plan.iter().any(|w| f64::from(*w) > f64::from(max) * factor);

    if over(&plan, 1.1) {
        let rebalanced = (count + 1)
            .max(total_words.div_ceil(max) as usize)
            .clamp(1, ceiling);
        debug!(from = count, to = rebalanced, "Rebalancing oversized segments");
        plan = distribute(total_words, rebalanced);
        if over(&plan, 1.2) {
            warn!(
                segments = plan.len(),
                largest = plan.first().copied().unwrap_or_default(),
                max_words_per_segment = max,
                "Segments still exceed the per-segment maximum after rebalancing"
            );
        }
    }

    debug!(total_words, segments = plan.len(), "Planned segments");
    SegmentPlan::new(plan)
}

fn max_segments(total_words: u32) -> usize {
    ((total_words / MIN_SEGMENT_WORDS) as usize).max(1)
}

fn distribute(total_words: u32, count: usize) -> Vec<u32> {
    let count = count.max(1);
    let base = total_words / count as u32;
    let remainder = (total_words % count as u32) as usize;
    (0..count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}
