//! Tome - Seek and Position Control
//!
//! Platform-agnostic seek core for the Tome audiobook player.
//!
//! This crate provides:
//! - Exclusive seek lock with timeout and stale-lock recovery
//! - Relative, absolute and chapter seeks with engine confirmation
//! - Smart previous-chapter navigation
//! - Held-button continuous seeking with an accelerating step
//! - Smart rewind on resume, scaled by pause length
//! - Timeline tick generation for the scrubber
//! - Animation suspension while seeks own the position
//!
//! # Architecture
//!
//! Every book is a single logical timeline in seconds, even when the audio
//! spans several files. The controller talks to the player through the
//! [`AudioEngine`] trait and publishes into a shared [`PlaybackStateStore`];
//! it never owns audio output itself.
//!
//! Public operations never return engine errors. A request that loses the
//! lock race, or whose engine call fails, leaves the controller idle and
//! ready for the next gesture.
//!
//! # Example: Skip and Chapter Navigation
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tome_playback::{
//!     AudioEngine, Chapter, PlaybackStateStore, Result, SeekConfig, SeekController,
//! };
//!
//! struct MyEngine;
//!
//! #[async_trait::async_trait]
//! impl AudioEngine for MyEngine {
//!     async fn seek_to(&self, _position: f64) -> Result<()> { Ok(()) }
//!     async fn position(&self) -> Result<f64> { Ok(0.0) }
//!     async fn play(&self) -> Result<()> { Ok(()) }
//!     async fn pause(&self) -> Result<()> { Ok(()) }
//! }
//!
//! # async fn run() -> Result<()> {
//! let chapters = vec![
//!     Chapter::new("Opening Credits", 0.0, 300.0),
//!     Chapter::new("Chapter 1", 300.0, 900.0),
//! ];
//! let store = PlaybackStateStore::with_book(chapters, 900.0, 0.0);
//! let controller = SeekController::new(Arc::new(MyEngine), store, SeekConfig::load(None)?);
//!
//! controller.seek_relative(30.0).await;
//! controller.next_chapter().await;
//! controller.prev_chapter().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Held-Button Seeking
//!
//! ```rust,no_run
//! # use tome_playback::{SeekController, SeekDirection};
//! # async fn run(controller: SeekController) {
//! // Button down
//! controller.start_continuous_seek(SeekDirection::Forward).await;
//!
//! // ...position updates live in the store while held...
//!
//! // Button up
//! controller.stop_continuous_seek().await;
//! # }
//! ```

mod animation;
pub mod chapters;
mod config;
mod continuous;
mod controller;
mod engine;
mod error;
mod events;
mod lifecycle;
mod lock;
pub mod smart_rewind;
mod store;
pub mod ticks;
pub mod types;

// Public exports
pub use animation::{AnimationSuspension, AnimationSuspensionState, SuspensionReason};
pub use chapters::{ChapterCrossing, SeekCalculation};
pub use config::{SeekConfig, SmartRewindSettings};
pub use continuous::continuous_step_seconds;
pub use controller::SeekController;
pub use engine::{AudioEngine, TrackLocation, TrackSegment, TrackTimeline};
pub use error::{PlaybackError, Result};
pub use events::{ForceReleaseReason, SeekEvent};
pub use lifecycle::spawn_lifecycle_watcher;
pub use lock::LockSnapshot;
pub use smart_rewind::calculate_smart_rewind_seconds;
pub use store::{PlaybackRecord, PlaybackStateStore};
pub use ticks::{TickCache, TickTier, TimelineTick};
pub use types::{
    AppLifecycleState, BoundaryHit, Chapter, ChapterTarget, SeekDirection, SeekOperation,
    SeekState,
};
