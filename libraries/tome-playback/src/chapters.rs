//! Chapter index
//!
//! Pure functions mapping a playback position (seconds) onto the chapter list:
//! - Which chapter contains a position
//! - Whether a seek crosses one or more chapter boundaries
//! - "Smart previous" / next chapter targets
//! - Clamping and edge tolerance helpers
//!
//! Nothing here touches the engine or shared state, so every function is
//! safe to call from render code.

use crate::error::{PlaybackError, Result};
use crate::types::{BoundaryHit, Chapter, ChapterTarget};
use serde::{Deserialize, Serialize};

/// Seconds into a chapter after which "previous" restarts the chapter
pub const DEFAULT_RESTART_THRESHOLD_SECONDS: f64 = 3.0;

/// Distance from a timeline edge that still counts as "at the edge"
pub const DEFAULT_EDGE_TOLERANCE_SECONDS: f64 = 0.5;

/// A seek whose source and destination fall in different chapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterCrossing {
    pub from_chapter: Chapter,
    pub from_chapter_index: usize,
    pub to_chapter: Chapter,
    pub to_chapter_index: usize,
    pub from_position: f64,
    pub target_position: f64,

    /// Offset of `target_position` from the start of `to_chapter`
    pub position_in_chapter: f64,
}

impl ChapterCrossing {
    fn between(
        chapters: &[Chapter],
        from: usize,
        to: usize,
        from_position: f64,
        target: f64,
    ) -> Self {
        let from_chapter = chapters[from].clone();
        let to_chapter = chapters[to].clone();
        let position_in_chapter = target - to_chapter.start;
        Self {
            from_chapter,
            from_chapter_index: from,
            to_chapter,
            to_chapter_index: to,
            from_position,
            target_position: target,
            position_in_chapter,
        }
    }
}

/// Result of applying a signed seek amount to the current position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeekCalculation {
    /// Clamped destination in `[0, duration]`
    pub target_position: f64,

    /// Chapter crossing against the clamped target
    pub crossing: Option<ChapterCrossing>,

    /// Edge the raw target was clamped against, if any
    pub boundary_hit: Option<BoundaryHit>,
}

/// Index of the last chapter whose start is at or before `position`
///
/// Empty chapter lists yield `0`. Negative positions clamp to `0`, and
/// positions past the last chapter's start map to the last index.
pub fn find_chapter_index(chapters: &[Chapter], position: f64) -> usize {
    if chapters.is_empty() {
        return 0;
    }

    let position = if position.is_nan() { 0.0 } else { position.max(0.0) };

    chapters
        .iter()
        .rposition(|chapter| chapter.start <= position)
        .unwrap_or(0)
}

/// Single boundary crossing between two positions, or `None` when both
/// positions resolve to the same chapter
pub fn detect_chapter_crossing(
    chapters: &[Chapter],
    from_position: f64,
    to_position: f64,
) -> Option<ChapterCrossing> {
    if chapters.is_empty() {
        return None;
    }

    let from = find_chapter_index(chapters, from_position);
    let to = find_chapter_index(chapters, to_position);
    if from == to {
        return None;
    }

    Some(ChapterCrossing::between(
        chapters,
        from,
        to,
        from_position,
        to_position,
    ))
}

/// One crossing record per chapter boundary traversed, in traversal order
///
/// Intermediate records target the start of the chapter being entered;
/// the final record carries the true target.
pub fn detect_all_chapter_crossings(
    chapters: &[Chapter],
    from_position: f64,
    to_position: f64,
) -> Vec<ChapterCrossing> {
    if chapters.is_empty() {
        return Vec::new();
    }

    let from = find_chapter_index(chapters, from_position);
    let to = find_chapter_index(chapters, to_position);
    if from == to {
        return Vec::new();
    }

    let steps: Vec<(usize, usize)> = if from < to {
        (from..to).map(|i| (i, i + 1)).collect()
    } else {
        (to + 1..=from).rev().map(|i| (i, i - 1)).collect()
    };

    let last = steps.len() - 1;
    let mut crossings = Vec::with_capacity(steps.len());
    let mut previous_position = from_position;

    for (step, (leaving, entering)) in steps.into_iter().enumerate() {
        let target = if step == last {
            to_position
        } else {
            chapters[entering].start
        };
        crossings.push(ChapterCrossing::between(
            chapters,
            leaving,
            entering,
            previous_position,
            target,
        ));
        previous_position = target;
    }

    crossings
}

/// "Smart previous": restart the current chapter once more than
/// `restart_threshold` seconds have elapsed in it, otherwise go to the
/// previous chapter. Always `0` inside the first chapter.
pub fn calculate_prev_chapter_position(
    chapters: &[Chapter],
    current_position: f64,
    restart_threshold: f64,
) -> ChapterTarget {
    let index = find_chapter_index(chapters, current_position);
    if chapters.is_empty() || index == 0 {
        return ChapterTarget {
            position: 0.0,
            chapter_index: 0,
        };
    }

    let current = &chapters[index];
    if current_position - current.start > restart_threshold {
        ChapterTarget {
            position: current.start,
            chapter_index: index,
        }
    } else {
        ChapterTarget {
            position: chapters[index - 1].start,
            chapter_index: index - 1,
        }
    }
}

/// Start of chapter `index`
pub fn chapter_target(chapters: &[Chapter], index: usize) -> Result<ChapterTarget> {
    chapters
        .get(index)
        .map(|chapter| ChapterTarget {
            position: chapter.start,
            chapter_index: index,
        })
        .ok_or(PlaybackError::InvalidChapterIndex(index))
}

/// Start of the next chapter, or `None` from inside the last one
pub fn calculate_next_chapter_position(
    chapters: &[Chapter],
    current_position: f64,
) -> Option<ChapterTarget> {
    if chapters.is_empty() {
        return None;
    }

    let next = find_chapter_index(chapters, current_position) + 1;
    chapters.get(next).map(|chapter| ChapterTarget {
        position: chapter.start,
        chapter_index: next,
    })
}

/// Apply a signed seek amount, clamping into `[0, duration]`
pub fn calculate_seek_position(
    chapters: &[Chapter],
    current_position: f64,
    seek_amount_seconds: f64,
    duration: f64,
) -> SeekCalculation {
    let raw = current_position + seek_amount_seconds;
    let upper = duration.max(0.0);

    let boundary_hit = if raw < 0.0 {
        Some(BoundaryHit::Start)
    } else if raw > upper {
        Some(BoundaryHit::End)
    } else {
        None
    };

    let target_position = clamp_position(raw, duration);
    let crossing = detect_chapter_crossing(chapters, current_position, target_position);

    SeekCalculation {
        target_position,
        crossing,
        boundary_hit,
    }
}

/// Fractional progress through the chapter containing `position`
pub fn get_chapter_progress(chapters: &[Chapter], position: f64) -> f64 {
    let Some(chapter) = chapters.get(find_chapter_index(chapters, position)) else {
        return 0.0;
    };

    let length = chapter.duration();
    if length <= 0.0 {
        return 0.0;
    }

    ((position - chapter.start) / length).clamp(0.0, 1.0)
}

/// Clamp a position into `[0, duration]`; NaN maps to `0`
pub fn clamp_position(position: f64, duration: f64) -> f64 {
    if position.is_nan() {
        return 0.0;
    }
    position.clamp(0.0, duration.max(0.0))
}

pub fn is_at_start(position: f64, tolerance: f64) -> bool {
    position <= tolerance
}

pub fn is_at_end(position: f64, duration: f64, tolerance: f64) -> bool {
    position >= duration - tolerance
}
