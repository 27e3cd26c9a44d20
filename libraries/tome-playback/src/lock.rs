//! Seek lock state machine
//!
//! At most one seek-family operation is in flight per player. The lock is a
//! tagged enum, so fields only exist for the variant that owns them:
//!
//! ```text
//! Idle ──acquire(seek)──────▶ Seeking ───release──▶ Idle
//! Idle ──acquire(continuous)▶ Continuous ─release─▶ Idle
//! ```
//!
//! Every acquisition gets a fresh generation number. Timers, confirmation
//! polls and tick loops carry the generation they were started under and
//! stop as soon as the lock no longer holds it, so a single force-release
//! cancels all of them.

use crate::types::{SeekDirection, SeekOperation};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

/// Per-gesture data for a held-button continuous seek
#[derive(Debug)]
pub(crate) struct ContinuousGesture {
    pub direction: SeekDirection,

    /// Total seconds moved so far in this gesture
    pub accumulated_delta: f64,

    /// Playback was running when the gesture began
    pub was_playing: bool,

    pub start_position: f64,

    /// Chapter crossing flag stays raised until this instant
    pub chapter_blip_until: Option<Instant>,

    /// A stop is in progress; further ticks and stops are no-ops
    pub stopping: bool,

    pub tick: Option<JoinHandle<()>>,
}

impl ContinuousGesture {
    fn new(direction: SeekDirection, start_position: f64) -> Self {
        Self {
            direction,
            accumulated_delta: 0.0,
            was_playing: false,
            start_position,
            chapter_blip_until: None,
            stopping: false,
            tick: None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum LockState {
    Idle,
    Seeking {
        generation: u64,
        direction: SeekDirection,
        started_at: Instant,
    },
    Continuous {
        generation: u64,
        started_at: Instant,
        gesture: ContinuousGesture,
    },
}

/// Outcome of asking to stop a continuous gesture
#[derive(Debug)]
pub(crate) enum StopTicket {
    /// Caller now owns the stop; carries the gesture's tick task
    Begin {
        generation: u64,
        tick: Option<JoinHandle<()>>,
    },

    /// Someone else is already finishing this gesture
    InProgress { generation: u64 },

    NotHeld,
}

/// Read-only view of the seek lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSnapshot {
    pub is_locked: bool,
    pub operation: Option<SeekOperation>,
    pub direction: Option<SeekDirection>,
    pub started_at: Option<Instant>,
}

/// What a release handed back
#[derive(Debug)]
pub(crate) struct ReleasedLock {
    pub state: LockState,

    /// Last position the engine was known to be at
    pub confirmed_position: f64,
}

#[derive(Debug)]
pub(crate) struct SeekLock {
    state: LockState,
    next_generation: u64,

    /// Last sign of life from the holder; staleness is measured from here
    touched_at: Option<Instant>,

    confirmed_position: f64,
    release_timer: Option<AbortHandle>,
}

impl SeekLock {
    pub fn new(confirmed_position: f64) -> Self {
        Self {
            state: LockState::Idle,
            next_generation: 1,
            touched_at: None,
            confirmed_position,
            release_timer: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self.state, LockState::Idle)
    }

    pub fn generation(&self) -> Option<u64> {
        match self.state {
            LockState::Idle => None,
            LockState::Seeking { generation, .. } | LockState::Continuous { generation, .. } => {
                Some(generation)
            }
        }
    }

    pub fn holds(&self, generation: u64) -> bool {
        self.generation() == Some(generation)
    }

    /// Locked and silent for longer than `timeout`
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        self.is_locked()
            && self
                .touched_at
                .is_some_and(|touched| now.saturating_duration_since(touched) > timeout)
    }

    /// When the holder of `generation` will be considered stuck
    pub fn deadline(&self, generation: u64, timeout: Duration) -> Option<Instant> {
        if !self.holds(generation) {
            return None;
        }
        self.touched_at.map(|touched| touched + timeout)
    }

    pub fn touch(&mut self, generation: u64, now: Instant) {
        if self.holds(generation) {
            self.touched_at = Some(now);
        }
    }

    /// Take the lock; the caller has already checked it is idle
    pub fn acquire(
        &mut self,
        operation: SeekOperation,
        direction: SeekDirection,
        now: Instant,
        confirmed_position: f64,
    ) -> u64 {
        debug_assert!(!self.is_locked(), "acquire on a held seek lock");

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        self.state = match operation {
            SeekOperation::Seek => LockState::Seeking {
                generation,
                direction,
                started_at: now,
            },
            SeekOperation::Continuous => LockState::Continuous {
                generation,
                started_at: now,
                gesture: ContinuousGesture::new(direction, confirmed_position),
            },
        };
        self.touched_at = Some(now);
        self.confirmed_position = confirmed_position;

        generation
    }

    /// Attach the auto-release timer; aborts it straight away if the lock
    /// moved on in the meantime
    pub fn set_release_timer(&mut self, generation: u64, timer: AbortHandle) {
        if self.holds(generation) {
            if let Some(previous) = self.release_timer.replace(timer) {
                previous.abort();
            }
        } else {
            timer.abort();
        }
    }

    /// Detach the auto-release timer without aborting it
    pub fn take_release_timer(&mut self) -> Option<AbortHandle> {
        self.release_timer.take()
    }

    pub fn continuous_mut(&mut self, generation: u64) -> Option<&mut ContinuousGesture> {
        match &mut self.state {
            LockState::Continuous {
                generation: held,
                gesture,
                ..
            } if *held == generation => Some(gesture),
            _ => None,
        }
    }

    /// Mark the continuous gesture as stopping and hand back its tick task
    ///
    /// `None` for `generation` matches whichever gesture holds the lock.
    pub fn begin_stop(&mut self, generation: Option<u64>) -> StopTicket {
        match &mut self.state {
            LockState::Continuous {
                generation: held,
                gesture,
                ..
            } if generation.unwrap_or(*held) == *held => {
                if gesture.stopping {
                    StopTicket::InProgress { generation: *held }
                } else {
                    gesture.stopping = true;
                    StopTicket::Begin {
                        generation: *held,
                        tick: gesture.tick.take(),
                    }
                }
            }
            _ => StopTicket::NotHeld,
        }
    }

    /// Record a position the engine confirmed for the current holder
    pub fn confirm(&mut self, generation: u64, position: f64) {
        if self.holds(generation) {
            self.confirmed_position = position;
        }
    }

    pub fn confirmed_position(&self) -> f64 {
        self.confirmed_position
    }

    /// Release if `generation` still holds the lock
    pub fn release(&mut self, generation: u64) -> Option<ReleasedLock> {
        if !self.holds(generation) {
            return None;
        }
        self.force_release()
    }

    /// Release whatever holds the lock, aborting its timers
    pub fn force_release(&mut self) -> Option<ReleasedLock> {
        if !self.is_locked() {
            return None;
        }

        if let Some(timer) = self.release_timer.take() {
            timer.abort();
        }

        let mut state = std::mem::replace(&mut self.state, LockState::Idle);
        if let LockState::Continuous { gesture, .. } = &mut state {
            if let Some(tick) = gesture.tick.take() {
                tick.abort();
            }
        }
        self.touched_at = None;

        Some(ReleasedLock {
            state,
            confirmed_position: self.confirmed_position,
        })
    }

    pub fn snapshot(&self) -> LockSnapshot {
        match &self.state {
            LockState::Idle => LockSnapshot {
                is_locked: false,
                operation: None,
                direction: None,
                started_at: None,
            },
            LockState::Seeking {
                direction,
                started_at,
                ..
            } => LockSnapshot {
                is_locked: true,
                operation: Some(SeekOperation::Seek),
                direction: Some(*direction),
                started_at: Some(*started_at),
            },
            LockState::Continuous {
                started_at,
                gesture,
                ..
            } => LockSnapshot {
                is_locked: true,
                operation: Some(SeekOperation::Continuous),
                direction: Some(gesture.direction),
                started_at: Some(*started_at),
            },
        }
    }
}
