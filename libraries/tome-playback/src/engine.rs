//! Audio engine adapter contract
//!
//! Abstracts the decoding/transport layer the seek controller drives.
//! Implementations live with the platform (native player bridge on mobile,
//! a decoder pipeline on desktop) and are injected as `Arc<dyn AudioEngine>`.

use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Platform-agnostic audio engine
///
/// Positions are seconds on the book's single logical timeline. When a book is
/// split into several physical files the implementation translates to and
/// from per-file offsets; [`TrackTimeline`] covers the arithmetic.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Seek to a position on the logical timeline
    ///
    /// # Returns
    /// * `Ok(())` - Seek issued (the engine may still be settling)
    /// * `Err(_)` - Seek rejected
    async fn seek_to(&self, position: f64) -> Result<()>;

    /// Position the engine currently reports
    async fn position(&self) -> Result<f64>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;
}

/// One physical file of a multi-file book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Engine-specific locator (path or URL)
    pub source: String,

    /// Length of this file in seconds
    pub duration: f64,
}

/// Location of a logical position inside a multi-file book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackLocation {
    pub track_index: usize,

    /// Seconds from the start of the track
    pub offset: f64,
}

/// Maps the logical book timeline onto consecutive track files
#[derive(Debug, Clone, Default)]
pub struct TrackTimeline {
    segments: Vec<TrackSegment>,

    /// Logical start offset of each segment
    starts: Vec<f64>,

    duration: f64,
}

impl TrackTimeline {
    pub fn new(segments: Vec<TrackSegment>) -> Result<Self> {
        let mut starts = Vec::with_capacity(segments.len());
        let mut duration = 0.0;
        for segment in &segments {
            if !segment.duration.is_finite() || segment.duration < 0.0 {
                return Err(PlaybackError::InvalidPosition(segment.duration));
            }
            starts.push(duration);
            duration += segment.duration;
        }

        Ok(Self {
            segments,
            starts,
            duration,
        })
    }

    /// Total logical duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// Track and in-track offset for a logical position
    ///
    /// Positions are clamped into the timeline; a position exactly on a
    /// boundary belongs to the later track. Returns `None` for an empty
    /// timeline.
    pub fn locate(&self, position: f64) -> Option<TrackLocation> {
        if self.segments.is_empty() {
            return None;
        }

        let position = crate::chapters::clamp_position(position, self.duration);
        let track_index = self
            .starts
            .iter()
            .rposition(|&start| start <= position)
            .unwrap_or(0);

        let offset = (position - self.starts[track_index])
            .min(self.segments[track_index].duration);

        Some(TrackLocation {
            track_index,
            offset,
        })
    }

    /// Logical position for a track offset reported by the engine
    pub fn to_logical(&self, location: TrackLocation) -> Result<f64> {
        let start = self
            .starts
            .get(location.track_index)
            .ok_or(PlaybackError::InvalidPosition(location.offset))?;
        Ok(start + location.offset.max(0.0))
    }
}
