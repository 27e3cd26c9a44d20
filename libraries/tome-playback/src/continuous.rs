//! Continuous (held-button) seeking
//!
//! While the button is held a repeating tick moves the position by a step
//! that grows with the total distance covered so far, writing every step to
//! shared state so the scrubber follows live. The engine is only seeked
//! once, when the gesture ends.

use crate::{
    animation::SuspensionReason,
    chapters,
    controller::{Inner, ReleaseOnDrop, SeekController},
    events::SeekEvent,
    lock::StopTicket,
    types::{SeekDirection, SeekOperation},
};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Step size for the next tick, from total seconds moved in this gesture
///
/// `<1s → 2s`, `<2s → 5s`, `<4s → 10s`, otherwise `15s`.
pub fn continuous_step_seconds(accumulated_delta: f64) -> f64 {
    if accumulated_delta < 1.0 {
        2.0
    } else if accumulated_delta < 2.0 {
        5.0
    } else if accumulated_delta < 4.0 {
        10.0
    } else {
        15.0
    }
}

/// Result of one continuous-seek step
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StepOutcome {
    pub position: f64,

    /// Reached (or snapped to) the timeline edge in the direction of travel
    pub at_boundary: bool,
}

impl SeekController {
    /// Begin a held-button seek in `direction`
    ///
    /// Pauses playback if it was running, takes an initial step and starts
    /// the tick loop. Returns `false` when another seek holds the lock.
    pub async fn start_continuous_seek(&self, direction: SeekDirection) -> bool {
        let record = self.inner.store.snapshot();
        let Some(generation) = self.acquire_lock(
            SeekOperation::Continuous,
            direction,
            record.position,
            record.position,
        ) else {
            return false;
        };

        {
            let mut lock = self.lock();
            if let Some(gesture) = lock.continuous_mut(generation) {
                gesture.was_playing = record.is_playing;
            }
        }
        info!(?direction, position = record.position, "Continuous seek started");
        self.emit(SeekEvent::ContinuousStarted { direction });

        if record.is_playing {
            match self.inner.engine.pause().await {
                Ok(()) => self.inner.store.set_playing(false),
                Err(err) => warn!(error = %err, "Engine failed to pause for continuous seek"),
            }
        }

        let initial_step = self.inner.config.continuous_initial_step_seconds;
        if self.apply_continuous_step(generation, initial_step).is_none() {
            debug!(generation, "Continuous seek ended before the first tick");
            return true;
        }

        let tick = tokio::spawn(run_continuous_ticks(
            Arc::downgrade(&self.inner),
            generation,
            self.inner.config.continuous_tick(),
        ));

        let mut lock = self.lock();
        match lock.continuous_mut(generation) {
            Some(gesture) if !gesture.stopping => gesture.tick = Some(tick),
            _ => tick.abort(),
        }

        true
    }

    /// End the held-button seek
    ///
    /// Stops the tick, seeks the engine to the scrubbed position, resumes
    /// playback if the gesture paused it, and releases the lock. If the
    /// gesture is already stopping on its own (it hit the edge of the book),
    /// waits for that release instead. No-op when no continuous seek holds
    /// the lock.
    pub async fn stop_continuous_seek(&self) {
        let ticket = self.lock().begin_stop(None);
        match ticket {
            StopTicket::Begin { generation, tick } => {
                if let Some(tick) = tick {
                    tick.abort();
                }
                self.finish_continuous(generation).await;
            }
            StopTicket::InProgress { generation } => {
                debug!(generation, "Continuous seek already stopping, waiting for release");
                self.wait_for_release(generation).await;
            }
            StopTicket::NotHeld => debug!("No continuous seek to stop"),
        }
    }

    /// Resolves once `generation` no longer holds the lock
    async fn wait_for_release(&self, generation: u64) {
        // Subscribe before checking so a release in between still wakes us
        let mut seek_state = self.subscribe_seek_state();
        while self.holds_lock(generation) {
            if seek_state.changed().await.is_err() {
                return;
            }
        }
    }

    /// Move one step, publishing the new position
    ///
    /// `None` once `generation` no longer owns a running gesture.
    pub(crate) fn apply_continuous_step(&self, generation: u64, step: f64) -> Option<StepOutcome> {
        let now = Instant::now();
        let blip = self.inner.config.chapter_blip();
        let tolerance = self.inner.config.edge_tolerance_seconds;

        let mut lock = self.lock();
        let record = self.inner.store.snapshot();
        let gesture = lock
            .continuous_mut(generation)
            .filter(|gesture| !gesture.stopping)?;

        let current = record.position;
        let mut next =
            chapters::clamp_position(current + gesture.direction.sign() * step, record.duration);

        // Close enough to the edge counts as the edge
        let at_boundary = match gesture.direction {
            SeekDirection::Backward => chapters::is_at_start(next, tolerance),
            SeekDirection::Forward => chapters::is_at_end(next, record.duration, tolerance),
        };
        if at_boundary {
            next = match gesture.direction {
                SeekDirection::Backward => 0.0,
                SeekDirection::Forward => record.duration.max(0.0),
            };
        }
        gesture.accumulated_delta += (next - current).abs();

        let crossing = chapters::detect_chapter_crossing(&record.chapters, current, next);
        let mut blip_cleared = false;
        if crossing.is_some() {
            gesture.chapter_blip_until = Some(now + blip);
        } else if gesture.chapter_blip_until.is_some_and(|until| now >= until) {
            gesture.chapter_blip_until = None;
            blip_cleared = true;
        }
        let changing_chapter = gesture.chapter_blip_until.is_some();

        lock.touch(generation, now);
        self.inner.store.write_position(next);
        self.inner.seek_state.send_modify(|state| {
            state.seek_position = next;
            state.is_changing_chapter = changing_chapter;
        });
        drop(lock);

        if let Some(crossing) = crossing {
            self.inner.animation.suspend(SuspensionReason::ChapterChange);
            self.emit(SeekEvent::ChapterChanged {
                from_chapter_index: crossing.from_chapter_index,
                to_chapter_index: crossing.to_chapter_index,
            });
        } else if blip_cleared {
            self.inner.animation.suspend(SuspensionReason::Seek);
        }

        Some(StepOutcome {
            position: next,
            at_boundary,
        })
    }

    /// Seek the engine to the scrubbed position and release the lock
    pub(crate) async fn finish_continuous(&self, generation: u64) {
        let _release = ReleaseOnDrop {
            controller: self.clone(),
            generation,
        };

        let gesture = {
            let mut lock = self.lock();
            lock.continuous_mut(generation)
                .map(|gesture| (gesture.was_playing, gesture.accumulated_delta))
        };
        let Some((was_playing, accumulated_delta)) = gesture else {
            return;
        };

        let target = self.inner.store.position();
        self.perform_seek(generation, target).await;

        if was_playing && self.holds_lock(generation) {
            match self.inner.engine.play().await {
                Ok(()) => self.inner.store.set_playing(true),
                Err(err) => warn!(error = %err, "Engine failed to resume after continuous seek"),
            }
        }

        if self.holds_lock(generation) {
            info!(position = target, accumulated_delta, "Continuous seek finished");
            self.emit(SeekEvent::ContinuousStopped {
                position: target,
                accumulated_delta,
            });
        }
    }
}

/// Tick loop for one continuous gesture
///
/// Exits as soon as `generation` loses the lock, and stops the gesture
/// itself when the position reaches the timeline edge.
async fn run_continuous_ticks(weak: Weak<Inner>, generation: u64, period: Duration) {
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        let Some(inner) = weak.upgrade() else { return };
        let controller = SeekController { inner };

        let accumulated = {
            let mut lock = controller.lock();
            match lock.continuous_mut(generation) {
                Some(gesture) if !gesture.stopping => gesture.accumulated_delta,
                _ => {
                    debug!(generation, "Continuous tick no longer holds the lock");
                    return;
                }
            }
        };

        let Some(outcome) =
            controller.apply_continuous_step(generation, continuous_step_seconds(accumulated))
        else {
            return;
        };

        if outcome.at_boundary {
            debug!(position = outcome.position, "Continuous seek reached timeline edge");
            let ticket = controller.lock().begin_stop(Some(generation));
            if let StopTicket::Begin { tick, .. } = ticket {
                // Handle to this very task; dropping it detaches rather than aborts
                drop(tick);
                controller.finish_continuous(generation).await;
            }
            return;
        }
    }
}
