//! Seek events
//!
//! Broadcast to observers that care about discrete seek outcomes rather than
//! the continuously updated [`SeekState`](crate::SeekState):
//! - Progress sync persisting confirmed positions
//! - Diagnostics (stuck locks, unconfirmed seeks)

use crate::types::{SeekDirection, SeekOperation};
use serde::{Deserialize, Serialize};

/// Why a lock was force-released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceReleaseReason {
    /// Lock outlived the timeout
    Timeout,

    /// A new request found a stale lock
    Stale,

    /// App left the foreground
    AppBackground,

    /// Explicit `cancel_seek`
    Cancelled,

    /// A new book replaced the current one
    BookChanged,
}

/// Events emitted by the seek controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeekEvent {
    /// A seek-family operation acquired the lock
    SeekStarted {
        operation: SeekOperation,
        direction: SeekDirection,
        from_position: f64,
    },

    /// A discrete seek finished and wrote its target
    SeekCompleted {
        position: f64,
        /// Whether the engine reported the target within tolerance
        confirmed: bool,
    },

    /// A seek moved playback into a different chapter
    ChapterChanged {
        from_chapter_index: usize,
        to_chapter_index: usize,
    },

    ContinuousStarted {
        direction: SeekDirection,
    },

    ContinuousStopped {
        position: f64,
        /// Total seconds moved during the gesture
        accumulated_delta: f64,
    },

    /// Lock cleared outside the normal completion path
    LockForceReleased {
        reason: ForceReleaseReason,
        restored_position: f64,
    },
}
