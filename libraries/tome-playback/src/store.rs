//! Shared playback state
//!
//! One logically-atomic record holding position, duration, transport and
//! seeking flags plus the loaded chapter list. The controller receives a
//! handle at construction; everything else (UI, progress sync) subscribes
//! read-only through [`PlaybackStateStore::subscribe`].

use crate::types::Chapter;
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of shared playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRecord {
    /// Seconds, always within `[0, duration]`
    pub position: f64,

    pub duration: f64,

    pub is_playing: bool,

    /// A seek-family operation owns `position`
    pub is_seeking: bool,

    pub chapters: Arc<[Chapter]>,
}

impl Default for PlaybackRecord {
    fn default() -> Self {
        Self {
            position: 0.0,
            duration: 0.0,
            is_playing: false,
            is_seeking: false,
            chapters: Arc::from(Vec::new()),
        }
    }
}

/// Cloneable handle to the shared playback record
#[derive(Debug, Clone)]
pub struct PlaybackStateStore {
    tx: Arc<watch::Sender<PlaybackRecord>>,
}

impl PlaybackStateStore {
    pub fn new(record: PlaybackRecord) -> Self {
        let (tx, _rx) = watch::channel(record);
        Self { tx: Arc::new(tx) }
    }

    /// Store for a freshly loaded book, paused at `position`
    pub fn with_book(chapters: Vec<Chapter>, duration: f64, position: f64) -> Self {
        Self::new(PlaybackRecord {
            position: crate::chapters::clamp_position(position, duration),
            duration,
            chapters: chapters.into(),
            ..PlaybackRecord::default()
        })
    }

    pub fn snapshot(&self) -> PlaybackRecord {
        self.tx.borrow().clone()
    }

    pub fn position(&self) -> f64 {
        self.tx.borrow().position
    }

    pub fn duration(&self) -> f64 {
        self.tx.borrow().duration
    }

    pub fn is_playing(&self) -> bool {
        self.tx.borrow().is_playing
    }

    pub fn is_seeking(&self) -> bool {
        self.tx.borrow().is_seeking
    }

    pub fn chapters(&self) -> Arc<[Chapter]> {
        Arc::clone(&self.tx.borrow().chapters)
    }

    /// Read-only view that is notified on every write
    pub fn subscribe(&self) -> watch::Receiver<PlaybackRecord> {
        self.tx.subscribe()
    }

    /// Periodic position report from the engine during normal playback
    ///
    /// Ignored while a seek owns the position, so a late engine tick can't
    /// overwrite the seek target.
    pub fn report_engine_position(&self, position: f64) {
        self.tx.send_if_modified(|record| {
            if record.is_seeking {
                return false;
            }
            record.position = crate::chapters::clamp_position(position, record.duration);
            true
        });
    }

    /// Transport state reported by the host
    pub fn set_playing(&self, is_playing: bool) {
        self.tx.send_if_modified(|record| {
            let changed = record.is_playing != is_playing;
            record.is_playing = is_playing;
            changed
        });
    }

    pub(crate) fn write_position(&self, position: f64) {
        self.tx.send_modify(|record| {
            record.position = crate::chapters::clamp_position(position, record.duration);
        });
    }

    pub(crate) fn set_seeking(&self, is_seeking: bool) {
        self.tx.send_if_modified(|record| {
            let changed = record.is_seeking != is_seeking;
            record.is_seeking = is_seeking;
            changed
        });
    }

    /// Finish a seek: write the position and clear the seeking flag together
    pub(crate) fn complete_seek(&self, position: f64) {
        self.tx.send_modify(|record| {
            record.position = crate::chapters::clamp_position(position, record.duration);
            record.is_seeking = false;
        });
    }

    pub(crate) fn replace_book(&self, chapters: Vec<Chapter>, duration: f64, position: f64) {
        self.tx.send_modify(|record| {
            record.chapters = chapters.into();
            record.duration = duration;
            record.position = crate::chapters::clamp_position(position, duration);
            record.is_seeking = false;
        });
    }
}

impl Default for PlaybackStateStore {
    fn default() -> Self {
        Self::new(PlaybackRecord::default())
    }
}
