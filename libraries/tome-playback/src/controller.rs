//! Seek controller - core orchestration
//!
//! Coordinates the seek lock, chapter index, audio engine and shared
//! playback state for every seek-family gesture:
//! - Relative skips (tap skip-back / skip-forward)
//! - Absolute seeks (scrubber drag, chapter list tap)
//! - Chapter navigation (smart previous, next)
//! - Held-button continuous seeking (see `continuous.rs`)
//!
//! All public operations self-arbitrate through the lock and never return
//! engine errors; a rejected or failed request simply leaves the controller
//! idle and ready for the next gesture.

use crate::{
    animation::{AnimationSuspension, SuspensionReason},
    chapters::{self, ChapterCrossing},
    config::SeekConfig,
    engine::AudioEngine,
    events::{ForceReleaseReason, SeekEvent},
    lock::{LockSnapshot, LockState, ReleasedLock, SeekLock},
    smart_rewind::calculate_smart_rewind_seconds,
    store::PlaybackStateStore,
    types::{AppLifecycleState, Chapter, SeekDirection, SeekOperation, SeekState},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the seek event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub(crate) struct Inner {
    pub(crate) engine: Arc<dyn AudioEngine>,
    pub(crate) store: PlaybackStateStore,
    pub(crate) config: SeekConfig,
    pub(crate) animation: Arc<AnimationSuspension>,
    pub(crate) lock: Mutex<SeekLock>,
    pub(crate) seek_state: watch::Sender<SeekState>,
    pub(crate) events: broadcast::Sender<SeekEvent>,
}

/// Seek and position controller for one player
///
/// Cheap to clone; clones share the same lock and state.
#[derive(Clone)]
pub struct SeekController {
    pub(crate) inner: Arc<Inner>,
}

/// Releases the lock when a seek finishes or its future is dropped
pub(crate) struct ReleaseOnDrop {
    pub(crate) controller: SeekController,
    pub(crate) generation: u64,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.controller.release_lock(self.generation);
    }
}

/// Lowers `is_changing_chapter` when a chapter transition ends, however it ends
struct ChapterChangeFlag<'a> {
    controller: &'a SeekController,
    generation: u64,
}

impl Drop for ChapterChangeFlag<'_> {
    fn drop(&mut self) {
        self.controller.set_changing_chapter(self.generation, false);
    }
}

impl SeekController {
    /// Create a controller over an injected engine and state store
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        store: PlaybackStateStore,
        config: SeekConfig,
    ) -> Self {
        let position = store.position();
        let (seek_state, _) = watch::channel(SeekState::idle(position));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                engine,
                store,
                config,
                animation: Arc::new(AnimationSuspension::new()),
                lock: Mutex::new(SeekLock::new(position)),
                seek_state,
                events,
            }),
        }
    }

    // ===== Read-only state =====

    pub fn store(&self) -> &PlaybackStateStore {
        &self.inner.store
    }

    pub fn config(&self) -> &SeekConfig {
        &self.inner.config
    }

    /// Bridge shared with position-driven animations
    pub fn animation(&self) -> Arc<AnimationSuspension> {
        Arc::clone(&self.inner.animation)
    }

    pub fn seek_state(&self) -> SeekState {
        *self.inner.seek_state.borrow()
    }

    pub fn subscribe_seek_state(&self) -> watch::Receiver<SeekState> {
        self.inner.seek_state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SeekEvent> {
        self.inner.events.subscribe()
    }

    pub fn lock_snapshot(&self) -> LockSnapshot {
        self.lock().snapshot()
    }

    pub fn is_locked(&self) -> bool {
        self.lock().is_locked()
    }

    pub fn is_seeking(&self) -> bool {
        self.seek_state().is_seeking
    }

    pub fn is_changing_chapter(&self) -> bool {
        self.seek_state().is_changing_chapter
    }

    pub fn seek_direction(&self) -> Option<SeekDirection> {
        self.seek_state().seek_direction
    }

    pub fn seek_position(&self) -> f64 {
        self.seek_state().seek_position
    }

    pub fn seek_delta(&self) -> f64 {
        self.seek_state().seek_delta()
    }

    pub fn seek_magnitude(&self) -> f64 {
        self.seek_state().seek_magnitude()
    }

    // ===== Discrete seeks =====

    /// Skip by a signed number of seconds
    ///
    /// Returns `false` when another seek holds the lock.
    pub async fn seek_relative(&self, delta_seconds: f64) -> bool {
        if !delta_seconds.is_finite() {
            debug!(delta_seconds, "Ignoring non-finite relative seek");
            return false;
        }

        let record = self.inner.store.snapshot();
        let calculation = chapters::calculate_seek_position(
            &record.chapters,
            record.position,
            delta_seconds,
            record.duration,
        );
        if let Some(boundary) = calculation.boundary_hit {
            debug!(?boundary, delta_seconds, "Relative seek clamped at timeline edge");
        }

        self.run_seek(
            SeekDirection::from_delta(delta_seconds),
            record.position,
            calculation.target_position,
            calculation.crossing,
        )
        .await
    }

    /// Seek to an absolute position in seconds
    pub async fn seek_absolute(&self, target_position: f64) -> bool {
        if !target_position.is_finite() {
            debug!(target_position, "Ignoring non-finite absolute seek");
            return false;
        }

        let record = self.inner.store.snapshot();
        let target = chapters::clamp_position(target_position, record.duration);
        let direction = if target < record.position {
            SeekDirection::Backward
        } else {
            SeekDirection::Forward
        };
        let crossing = chapters::detect_chapter_crossing(&record.chapters, record.position, target);

        self.run_seek(direction, record.position, target, crossing).await
    }

    /// Seek to the start of chapter `index`; out-of-range indices are ignored
    pub async fn seek_to_chapter(&self, index: usize) -> bool {
        let chapters = self.inner.store.chapters();
        match chapters::chapter_target(&chapters, index) {
            Ok(target) => self.seek_absolute(target.position).await,
            Err(err) => {
                debug!(error = %err, chapter_count = chapters.len(), "Ignoring chapter seek");
                false
            }
        }
    }

    /// Jump to the next chapter; no-op inside the last chapter
    pub async fn next_chapter(&self) -> bool {
        let record = self.inner.store.snapshot();
        match chapters::calculate_next_chapter_position(&record.chapters, record.position) {
            Some(target) => self.seek_absolute(target.position).await,
            None => {
                debug!(position = record.position, "Already in the last chapter");
                false
            }
        }
    }

    /// Smart previous: restart the chapter, or go back one when near its start
    pub async fn prev_chapter(&self) -> bool {
        let record = self.inner.store.snapshot();
        let target = chapters::calculate_prev_chapter_position(
            &record.chapters,
            record.position,
            self.inner.config.restart_threshold_seconds,
        );
        self.seek_absolute(target.position).await
    }

    /// Cancel whatever seek is in flight
    pub fn cancel_seek(&self) -> bool {
        self.force_release_lock(ForceReleaseReason::Cancelled)
    }

    // ===== Book and lifecycle =====

    /// Replace the loaded book; any in-flight seek is cancelled first
    pub fn load_book(&self, chapters: Vec<Chapter>, duration: f64, position: f64) {
        self.force_release_lock(ForceReleaseReason::BookChanged);
        self.inner.store.replace_book(chapters, duration, position);

        let position = self.inner.store.position();
        self.inner.seek_state.send_replace(SeekState::idle(position));
        info!(
            chapters = self.inner.store.chapters().len(),
            duration, position, "Loaded book"
        );
    }

    /// React to the host app changing foreground state
    ///
    /// Leaving the foreground while a seek is held always force-releases it;
    /// the OS may reset or reclaim the engine while suspended.
    pub fn handle_app_state(&self, state: AppLifecycleState) {
        if state == AppLifecycleState::Active {
            return;
        }
        if self.force_release_lock(ForceReleaseReason::AppBackground) {
            info!(?state, "Released seek lock on app state change");
        }
    }

    /// Resume playback, backing up by a pause-appropriate amount first
    ///
    /// Returns whether the engine accepted `play`.
    pub async fn resume_after_pause(&self, paused_for: Duration) -> bool {
        let settings = &self.inner.config.smart_rewind;
        if settings.enabled {
            let paused_ms = u64::try_from(paused_for.as_millis()).unwrap_or(u64::MAX);
            let rewind = calculate_smart_rewind_seconds(paused_ms, settings.max_rewind_seconds);
            if rewind > 0 {
                let position = self.inner.store.position();
                let target = (position - f64::from(rewind)).max(0.0);
                debug!(paused_ms, rewind, target, "Applying smart rewind");
                if !self.seek_absolute(target).await {
                    debug!("Smart rewind skipped, seek lock busy");
                }
            }
        }

        match self.inner.engine.play().await {
            Ok(()) => {
                self.inner.store.set_playing(true);
                true
            }
            Err(err) => {
                warn!(error = %err, "Engine failed to resume playback");
                false
            }
        }
    }

    // ===== Lock management =====

    /// Try to take the lock and publish the seeking state
    ///
    /// `None` when another live operation holds it. A stale holder is
    /// force-released first.
    pub(crate) fn acquire_lock(
        &self,
        operation: SeekOperation,
        direction: SeekDirection,
        from_position: f64,
        target_position: f64,
    ) -> Option<u64> {
        let now = Instant::now();
        let timeout = self.inner.config.lock_timeout();

        let mut lock = self.lock();
        if lock.is_locked() {
            if !lock.is_stale(now, timeout) {
                debug!(?operation, ?direction, "Seek lock busy, ignoring request");
                return None;
            }

            warn!(snapshot = ?lock.snapshot(), "Seek lock is stale, force-releasing");
            if let Some(released) = lock.force_release() {
                self.finish_force_release(released, ForceReleaseReason::Stale);
            }
        }

        let generation = lock.acquire(operation, direction, now, self.inner.store.position());

        self.inner.seek_state.send_replace(SeekState {
            is_seeking: true,
            is_changing_chapter: false,
            seek_direction: Some(direction),
            seek_position: target_position,
            seek_start_position: from_position,
        });
        self.inner.store.set_seeking(true);
        self.inner.animation.suspend(SuspensionReason::Seek);

        let timer = tokio::spawn(watch_lock_deadline(
            Arc::downgrade(&self.inner),
            generation,
            timeout,
        ));
        lock.set_release_timer(generation, timer.abort_handle());
        drop(lock);

        debug!(
            ?operation,
            ?direction,
            generation,
            from_position,
            target_position,
            "Acquired seek lock"
        );
        self.emit(SeekEvent::SeekStarted {
            operation,
            direction,
            from_position,
        });

        Some(generation)
    }

    /// Release the lock if `generation` still holds it
    pub(crate) fn release_lock(&self, generation: u64) {
        let released = self.lock().release(generation);
        if released.is_some() {
            self.reset_to_idle(self.inner.store.position());
            debug!(generation, "Released seek lock");
        }
    }

    /// Clear the lock regardless of holder
    ///
    /// Seek state resets to the last confirmed position, never an in-flight
    /// target. Returns `false` when nothing was held.
    pub fn force_release_lock(&self, reason: ForceReleaseReason) -> bool {
        let released = self.lock().force_release();
        match released {
            Some(released) => {
                self.finish_force_release(released, reason);
                true
            }
            None => false,
        }
    }

    fn finish_force_release(&self, released: ReleasedLock, reason: ForceReleaseReason) {
        let restored = released.confirmed_position;
        if let LockState::Continuous { gesture, .. } = &released.state {
            debug!(
                accumulated = gesture.accumulated_delta,
                "Discarding live-scrubbed continuous seek position"
            );
        }

        self.inner.store.complete_seek(restored);
        self.reset_to_idle(restored);
        warn!(?reason, restored_position = restored, "Force-released seek lock");
        self.emit(SeekEvent::LockForceReleased {
            reason,
            restored_position: restored,
        });
    }

    /// Deadline watchdog fired for `generation`
    fn expire_lock(&self, generation: u64) {
        let released = {
            let mut lock = self.lock();
            if !lock.holds(generation) {
                return;
            }
            // This call runs on the timer task itself; detach instead of aborting
            drop(lock.take_release_timer());
            lock.force_release()
        };

        if let Some(released) = released {
            self.finish_force_release(released, ForceReleaseReason::Timeout);
        }
    }

    pub(crate) fn reset_to_idle(&self, position: f64) {
        self.inner.seek_state.send_replace(SeekState::idle(position));
        self.inner.store.set_seeking(false);
        self.inner.animation.resume();
    }

    // ===== Seek execution =====

    async fn run_seek(
        &self,
        direction: SeekDirection,
        from_position: f64,
        target: f64,
        crossing: Option<ChapterCrossing>,
    ) -> bool {
        let Some(generation) =
            self.acquire_lock(SeekOperation::Seek, direction, from_position, target)
        else {
            return false;
        };
        let _release = ReleaseOnDrop {
            controller: self.clone(),
            generation,
        };

        match crossing {
            Some(crossing) => {
                self.handle_chapter_transition(
                    generation,
                    crossing.from_chapter_index,
                    crossing.to_chapter_index,
                    target,
                )
                .await;
            }
            None => self.perform_seek(generation, target).await,
        }

        true
    }

    async fn handle_chapter_transition(
        &self,
        generation: u64,
        from_index: usize,
        to_index: usize,
        target: f64,
    ) {
        self.set_changing_chapter(generation, true);
        let _flag = ChapterChangeFlag {
            controller: self,
            generation,
        };

        self.inner.animation.suspend(SuspensionReason::ChapterChange);
        debug!(from_index, to_index, target, "Seek crosses chapter boundary");
        self.emit(SeekEvent::ChapterChanged {
            from_chapter_index: from_index,
            to_chapter_index: to_index,
        });

        self.perform_seek(generation, target).await;
    }

    /// Seek the engine, wait for it to get there, then write the target
    ///
    /// The write is optimistic: an unconfirmed seek still lands on the
    /// requested target so the UI never sticks. Engine errors leave shared
    /// state untouched.
    pub(crate) async fn perform_seek(&self, generation: u64, target: f64) {
        if let Err(err) = self.inner.engine.seek_to(target).await {
            warn!(error = %err, target, "Engine seek failed");
            return;
        }

        let confirmed = self.wait_for_position_confirmation(generation, target).await;
        if !confirmed {
            warn!(target, "Engine did not confirm seek position, writing target anyway");
        }

        let written = {
            let mut lock = self.lock();
            if lock.holds(generation) {
                lock.confirm(generation, target);
                self.inner.store.complete_seek(target);
                self.inner.seek_state.send_modify(|state| {
                    state.is_seeking = false;
                    state.seek_position = target;
                });
                true
            } else {
                false
            }
        };

        if written {
            self.emit(SeekEvent::SeekCompleted {
                position: target,
                confirmed,
            });
        } else {
            debug!(generation, target, "Seek lock released mid-seek, discarding result");
        }
    }

    /// Poll the engine until it reports `target` within tolerance
    ///
    /// Gives up after the confirmation window or as soon as `generation`
    /// loses the lock. A timeout is a soft failure, not an error.
    pub(crate) async fn wait_for_position_confirmation(
        &self,
        generation: u64,
        target: f64,
    ) -> bool {
        let tolerance = self.inner.config.confirm_tolerance_seconds;
        let mut poll = tokio::time::interval(self.inner.config.confirm_poll_interval());
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let confirm = async {
            loop {
                poll.tick().await;
                if !self.holds_lock(generation) {
                    return false;
                }
                match self.inner.engine.position().await {
                    Ok(reported) if (reported - target).abs() <= tolerance => return true,
                    Ok(_) => {}
                    Err(err) => debug!(error = %err, "Engine position query failed"),
                }
            }
        };

        match tokio::time::timeout(self.inner.config.confirm_timeout(), confirm).await {
            Ok(confirmed) => confirmed,
            Err(_) => {
                debug!(target, "Position confirmation timed out");
                false
            }
        }
    }

    fn set_changing_chapter(&self, generation: u64, changing: bool) {
        let lock = self.lock();
        if lock.holds(generation) {
            self.inner
                .seek_state
                .send_modify(|state| state.is_changing_chapter = changing);
        }
    }

    pub(crate) fn emit(&self, event: SeekEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub(crate) fn holds_lock(&self, generation: u64) -> bool {
        self.lock().holds(generation)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SeekLock> {
        self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Force-release `generation` once it has gone silent for `timeout`
async fn watch_lock_deadline(weak: Weak<Inner>, generation: u64, timeout: Duration) {
    loop {
        let deadline = {
            let Some(inner) = weak.upgrade() else { return };
            let controller = SeekController { inner };
            let deadline = controller.lock().deadline(generation, timeout);
            match deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    warn!(generation, ?timeout, "Seek lock timed out");
                    controller.expire_lock(generation);
                    return;
                }
                Some(deadline) => deadline,
                None => return,
            }
        };

        tokio::time::sleep_until(deadline).await;
    }
}
