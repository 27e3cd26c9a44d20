//! Animation suspension bridge
//!
//! Position-driven animations (waveform, scrubber) consult this before
//! applying a frame. While a seek is in flight they skip frames, so the UI
//! jumps once the seek resolves instead of animating through intermediate
//! positions.
//!
//! The bridge carries no timer of its own; the controller suspends and
//! resumes it around every seek.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

/// Why animations are suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuspensionReason {
    Seek,
    ChapterChange,
}

/// Snapshot of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSuspensionState {
    pub is_suspended: bool,

    /// When the current suspension began (diagnostics only)
    pub suspended_at: Option<Instant>,

    pub reason: Option<SuspensionReason>,
}

impl AnimationSuspensionState {
    const ACTIVE: Self = Self {
        is_suspended: false,
        suspended_at: None,
        reason: None,
    };
}

/// Suspension flag shared between the controller and one animation context
#[derive(Debug)]
pub struct AnimationSuspension {
    state: Mutex<AnimationSuspensionState>,
}

impl AnimationSuspension {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AnimationSuspensionState::ACTIVE),
        }
    }

    /// Suspend animations; a later reason replaces an earlier one
    pub fn suspend(&self, reason: SuspensionReason) {
        let mut state = self.lock();
        state.suspended_at = state.suspended_at.or_else(|| Some(Instant::now()));
        state.is_suspended = true;
        state.reason = Some(reason);
    }

    pub fn resume(&self) {
        *self.lock() = AnimationSuspensionState::ACTIVE;
    }

    pub fn is_suspended(&self) -> bool {
        self.lock().is_suspended
    }

    pub fn state(&self) -> AnimationSuspensionState {
        *self.lock()
    }

    /// Whether a position-derived frame may be applied
    ///
    /// `false` while the upstream seeking flag is set or while locally
    /// suspended.
    pub fn should_update_animation(&self, is_seeking_upstream: bool) -> bool {
        !is_seeking_upstream && !self.is_suspended()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AnimationSuspensionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AnimationSuspension {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspend_and_resume() {
        let bridge = AnimationSuspension::new();
        assert!(bridge.should_update_animation(false));

        bridge.suspend(SuspensionReason::Seek);
        let state = bridge.state();
        assert!(state.is_suspended);
        assert_eq!(state.reason, Some(SuspensionReason::Seek));
        assert!(state.suspended_at.is_some());
        assert!(!bridge.should_update_animation(false));

        bridge.resume();
        assert_eq!(bridge.state(), AnimationSuspensionState::ACTIVE);
        assert!(bridge.should_update_animation(false));
    }

    #[test]
    fn upstream_seeking_always_blocks() {
        let bridge = AnimationSuspension::new();
        assert!(!bridge.should_update_animation(true));
        bridge.suspend(SuspensionReason::ChapterChange);
        assert!(!bridge.should_update_animation(true));
    }

    #[tokio::test(start_paused = true)]
    async fn suspension_timestamp_follows_runtime_clock() {
        let bridge = AnimationSuspension::new();
        bridge.suspend(SuspensionReason::Seek);

        tokio::time::advance(std::time::Duration::from_secs(5)).await;

        let suspended_at = bridge.state().suspended_at.unwrap();
        assert!(suspended_at.elapsed() >= std::time::Duration::from_secs(5));
        assert!(suspended_at.elapsed() < std::time::Duration::from_secs(6));
    }

    #[test]
    fn chapter_change_keeps_original_timestamp() {
        let bridge = AnimationSuspension::new();
        bridge.suspend(SuspensionReason::Seek);
        let first = bridge.state().suspended_at;

        bridge.suspend(SuspensionReason::ChapterChange);
        let state = bridge.state();
        assert_eq!(state.suspended_at, first);
        assert_eq!(state.reason, Some(SuspensionReason::ChapterChange));
    }
}
