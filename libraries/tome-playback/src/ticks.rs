//! Timeline tick generation for the scrub bar
//!
//! Ticks store time in seconds, never pixels, so one generated set is valid
//! for any screen width. Pixel conversion happens at render time through
//! [`TimelineTick::pixel_offset`].
//!
//! Tiers, highest first: chapter, 10-minute, 1-minute, 15-second. Sub-chapter
//! tiers are laid out relative to each chapter's start and drop any tick that
//! would sit on top of a higher-tier tick.

use crate::types::Chapter;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Chapters shorter than this never get a label
const MIN_LABELED_CHAPTER_SECONDS: f64 = 60.0;

/// Minimum distance between two labeled chapter ticks
const MIN_LABEL_SPACING_SECONDS: f64 = 55.0;

/// (tier, interval seconds, suppression window seconds)
const SUB_TIERS: [(TickTier, f64, f64); 3] = [
    (TickTier::TenMinute, 600.0, 30.0),
    (TickTier::OneMinute, 60.0, 5.0),
    (TickTier::FifteenSecond, 15.0, 2.0),
];

/// Default number of books kept in a [`TickCache`]
pub const DEFAULT_TICK_CACHE_SIZE: usize = 8;

/// Tick tier, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickTier {
    Chapter,
    TenMinute,
    OneMinute,
    FifteenSecond,
}

/// A timeline marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineTick {
    /// Position on the book timeline in seconds
    pub time: f64,
    pub tier: TickTier,
    pub label: Option<String>,
}

impl TimelineTick {
    /// Horizontal offset from the playhead for a given zoom
    pub fn pixel_offset(&self, center_position: f64, pixels_per_second: f64) -> f64 {
        (self.time - center_position) * pixels_per_second
    }
}

/// Generate every tick for a book
///
/// Deterministic: identical inputs always yield identical output.
pub fn generate_ticks_for_book(duration: f64, chapters: &[Chapter]) -> Vec<TimelineTick> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let mut ticks = chapter_ticks(duration, chapters);
    let mut placed: Vec<f64> = ticks.iter().map(|tick| tick.time).collect();

    // A book without chapters is laid out as one span
    let spans: Vec<(f64, f64)> = if chapters.is_empty() {
        vec![(0.0, duration)]
    } else {
        chapters
            .iter()
            .filter(|chapter| chapter.start < duration)
            .map(|chapter| (chapter.start, chapter.end.min(duration)))
            .collect()
    };

    for (tier, interval, window) in SUB_TIERS {
        placed.sort_by(f64::total_cmp);

        let mut tier_ticks = Vec::new();
        for &(span_start, span_end) in &spans {
            let mut step = 1u32;
            loop {
                let offset = f64::from(step) * interval;
                let time = span_start + offset;
                if time >= span_end {
                    break;
                }
                if !is_near(&placed, time, window) {
                    tier_ticks.push(TimelineTick {
                        time,
                        tier,
                        label: sub_tier_label(tier, offset),
                    });
                }
                step += 1;
            }
        }

        placed.extend(tier_ticks.iter().map(|tick| tick.time));
        ticks.extend(tier_ticks);
    }

    ticks
}

/// Ticks within `window_seconds` of `center_position`
pub fn get_visible_ticks(
    all_ticks: &[TimelineTick],
    center_position: f64,
    window_seconds: f64,
) -> Vec<&TimelineTick> {
    all_ticks
        .iter()
        .filter(|tick| (tick.time - center_position).abs() <= window_seconds)
        .collect()
}

fn chapter_ticks(duration: f64, chapters: &[Chapter]) -> Vec<TimelineTick> {
    let mut last_labeled = f64::NEG_INFINITY;

    chapters
        .iter()
        .filter(|chapter| chapter.start <= duration)
        .map(|chapter| {
            let labeled = chapter.duration() >= MIN_LABELED_CHAPTER_SECONDS
                && chapter.start - last_labeled >= MIN_LABEL_SPACING_SECONDS;
            if labeled {
                last_labeled = chapter.start;
            }
            TimelineTick {
                time: chapter.start,
                tier: TickTier::Chapter,
                label: labeled.then(|| chapter.title.clone()),
            }
        })
        .collect()
}

fn sub_tier_label(tier: TickTier, offset_in_chapter: f64) -> Option<String> {
    let total_seconds = offset_in_chapter.round() as u64;
    match tier {
        TickTier::OneMinute => Some(format!("{}", total_seconds / 60)),
        TickTier::FifteenSecond => {
            Some(format!("{}:{:02}", total_seconds / 60, total_seconds % 60))
        }
        TickTier::Chapter | TickTier::TenMinute => None,
    }
}

/// `sorted` must be ascending
fn is_near(sorted: &[f64], time: f64, window: f64) -> bool {
    let idx = sorted.partition_point(|&placed| placed < time - window);
    sorted
        .get(idx)
        .is_some_and(|&placed| placed <= time + window)
}

/// Per-book tick cache
///
/// Generation runs once per loaded book; later lookups share the same
/// `Arc` until the entry is evicted or invalidated.
pub struct TickCache {
    cache: Mutex<LruCache<String, Arc<[TimelineTick]>>>,
}

impl TickCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached ticks for `book_id`, generating them on first use
    pub fn get_or_generate(
        &self,
        book_id: &str,
        duration: f64,
        chapters: &[Chapter],
    ) -> Arc<[TimelineTick]> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ticks) = cache.get(book_id) {
            return Arc::clone(ticks);
        }

        let ticks: Arc<[TimelineTick]> = generate_ticks_for_book(duration, chapters).into();
        tracing::debug!(book_id, count = ticks.len(), "Generated timeline ticks");
        cache.put(book_id.to_string(), Arc::clone(&ticks));
        ticks
    }

    /// Drop a book's ticks (chapters changed)
    pub fn invalidate(&self, book_id: &str) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(book_id);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TickCache {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_CACHE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier_times(ticks: &[TimelineTick], tier: TickTier) -> Vec<f64> {
        ticks
            .iter()
            .filter(|tick| tick.tier == tier)
            .map(|tick| tick.time)
            .collect()
    }

    #[test]
    fn tiers_are_ordered_highest_first() {
        let chapters = vec![
            Chapter::new("One", 0.0, 900.0),
            Chapter::new("Two", 900.0, 1800.0),
        ];
        let ticks = generate_ticks_for_book(1800.0, &chapters);

        let tiers: Vec<TickTier> = ticks.iter().map(|tick| tick.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        assert_eq!(tier_times(&ticks, TickTier::Chapter), vec![0.0, 900.0]);
        assert_eq!(tier_times(&ticks, TickTier::TenMinute), vec![600.0, 1500.0]);
    }

    #[test]
    fn lower_tiers_skip_higher_tier_positions() {
        let chapters = vec![Chapter::new("Only", 0.0, 1200.0)];
        let ticks = generate_ticks_for_book(1200.0, &chapters);

        let minutes = tier_times(&ticks, TickTier::OneMinute);
        assert!(!minutes.contains(&600.0), "covered by the 10-minute tick");
        assert!(minutes.contains(&60.0));

        let quarters = tier_times(&ticks, TickTier::FifteenSecond);
        assert!(!quarters.contains(&60.0), "covered by the 1-minute tick");
        assert!(quarters.contains(&15.0));
        assert!(quarters.contains(&75.0));
    }

    #[test]
    fn sub_tier_labels_are_relative_to_chapter() {
        let chapters = vec![
            Chapter::new("One", 0.0, 100.0),
            Chapter::new("Two", 100.0, 400.0),
        ];
        let ticks = generate_ticks_for_book(400.0, &chapters);

        let minute = ticks
            .iter()
            .find(|tick| tick.tier == TickTier::OneMinute && tick.time == 220.0)
            .unwrap();
        assert_eq!(minute.label.as_deref(), Some("2"));

        let quarter = ticks
            .iter()
            .find(|tick| tick.tier == TickTier::FifteenSecond && tick.time == 175.0)
            .unwrap();
        assert_eq!(quarter.label.as_deref(), Some("1:15"));
    }

    #[test]
    fn short_and_crowded_chapters_are_unlabeled() {
        let chapters = vec![
            Chapter::new("Long", 0.0, 120.0),
            Chapter::new("Short", 120.0, 150.0),
            Chapter::new("Crowded", 150.0, 400.0),
            Chapter::new("Spaced", 400.0, 600.0),
        ];
        let ticks = generate_ticks_for_book(600.0, &chapters);
        let labels: Vec<Option<&str>> = ticks
            .iter()
            .filter(|tick| tick.tier == TickTier::Chapter)
            .map(|tick| tick.label.as_deref())
            .collect();

        assert_eq!(labels, vec![Some("Long"), None, Some("Crowded"), Some("Spaced")]);
    }

    #[test]
    fn book_without_chapters_still_has_time_ticks() {
        let ticks = generate_ticks_for_book(120.0, &[]);
        assert!(tier_times(&ticks, TickTier::Chapter).is_empty());
        assert_eq!(tier_times(&ticks, TickTier::OneMinute), vec![60.0]);
        assert!(generate_ticks_for_book(0.0, &[]).is_empty());
    }

    #[test]
    fn visible_window_filter() {
        let ticks = generate_ticks_for_book(600.0, &[]);
        let visible = get_visible_ticks(&ticks, 300.0, 30.0);
        assert!(visible.iter().all(|tick| (tick.time - 300.0).abs() <= 30.0));
        assert!(visible.iter().any(|tick| tick.time == 300.0));
    }

    #[test]
    fn pixel_offset_is_relative_to_center() {
        let tick = TimelineTick {
            time: 130.0,
            tier: TickTier::FifteenSecond,
            label: None,
        };
        assert_eq!(tick.pixel_offset(100.0, 2.0), 60.0);
        assert_eq!(tick.pixel_offset(160.0, 2.0), -60.0);
    }

    #[test]
    fn cache_reuses_generated_ticks() {
        let cache = TickCache::new(2);
        let chapters = vec![Chapter::new("One", 0.0, 600.0)];

        let first = cache.get_or_generate("book-1", 600.0, &chapters);
        let second = cache.get_or_generate("book-1", 600.0, &chapters);
        assert!(Arc::ptr_eq(&first, &second));

        cache.get_or_generate("book-2", 300.0, &[]);
        cache.get_or_generate("book-3", 300.0, &[]);
        assert_eq!(cache.len(), 2);

        cache.invalidate("book-3");
        assert_eq!(cache.len(), 1);
    }
}
