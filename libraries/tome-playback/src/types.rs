//! Core types for seek and position control

use serde::{Deserialize, Serialize};

/// A chapter on the book's single logical timeline
///
/// Chapters for a book are ordered and non-overlapping: `start[i] < start[i + 1]`
/// and `end[i] <= start[i + 1]`. The list is replaced wholesale when a new
/// book loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter title
    pub title: String,

    /// Start offset in seconds
    pub start: f64,

    /// End offset in seconds
    pub end: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            title: title.into(),
            start,
            end,
        }
    }

    /// Chapter length in seconds (never negative)
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Direction of a seek gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekDirection {
    Forward,
    Backward,
}

impl SeekDirection {
    /// Direction implied by a signed delta; zero counts as forward
    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            SeekDirection::Backward
        } else {
            SeekDirection::Forward
        }
    }

    /// `1.0` for forward, `-1.0` for backward
    pub fn sign(self) -> f64 {
        match self {
            SeekDirection::Forward => 1.0,
            SeekDirection::Backward => -1.0,
        }
    }
}

/// Kind of operation holding the seek lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekOperation {
    /// Discrete seek (relative, absolute, chapter)
    Seek,

    /// Held-button continuous seek
    Continuous,
}

/// Timeline edge a seek was clamped against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryHit {
    Start,
    End,
}

/// Destination of a chapter navigation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChapterTarget {
    /// Position to seek to, in seconds
    pub position: f64,

    /// Index of the chapter containing `position`
    pub chapter_index: usize,
}

/// Foreground/background state reported by the host app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycleState {
    /// App is in the foreground and receiving input
    Active,

    /// Transitioning (e.g. system overlay shown)
    Inactive,

    /// App is suspended in the background
    Background,
}

/// UI-facing seek state, republished on every step of a seek
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekState {
    pub is_seeking: bool,

    /// Set while a seek crosses a chapter boundary
    pub is_changing_chapter: bool,

    pub seek_direction: Option<SeekDirection>,

    /// Requested (or live-scrubbed) position
    pub seek_position: f64,

    /// Position when the seek started
    pub seek_start_position: f64,
}

impl SeekState {
    /// Idle state resting at `position`
    pub fn idle(position: f64) -> Self {
        Self {
            is_seeking: false,
            is_changing_chapter: false,
            seek_direction: None,
            seek_position: position,
            seek_start_position: position,
        }
    }

    /// Signed distance from the start of the seek
    pub fn seek_delta(&self) -> f64 {
        if self.is_seeking {
            self.seek_position - self.seek_start_position
        } else {
            0.0
        }
    }

    pub fn seek_magnitude(&self) -> f64 {
        self.seek_delta().abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_delta() {
        assert_eq!(SeekDirection::from_delta(-30.0), SeekDirection::Backward);
        assert_eq!(SeekDirection::from_delta(30.0), SeekDirection::Forward);
        assert_eq!(SeekDirection::from_delta(0.0), SeekDirection::Forward);
        assert_eq!(SeekDirection::Backward.sign(), -1.0);
    }

    #[test]
    fn chapter_duration_never_negative() {
        let chapter = Chapter::new("Broken", 100.0, 50.0);
        assert_eq!(chapter.duration(), 0.0);
        assert_eq!(Chapter::new("Intro", 0.0, 300.0).duration(), 300.0);
    }

    #[test]
    fn seek_delta_only_while_seeking() {
        let mut state = SeekState::idle(100.0);
        assert_eq!(state.seek_delta(), 0.0);

        state.is_seeking = true;
        state.seek_position = 70.0;
        assert_eq!(state.seek_delta(), -30.0);
        assert_eq!(state.seek_magnitude(), 30.0);
    }
}
