//! Debounced auto-save into the local draft store.
//!
//! The engine is timer-less: the host calls [`AutoSaveEngine::tick`] with the
//! current time and the engine decides whether a save is due. A due tick only
//! writes when the snapshot changed since the last save. Manual saves write
//! immediately and supersede the pending tick, so a stale value can never be
//! persisted after a newer one.

use crate::{DraftKey, DraftStore, FormSnapshot, Timestamp};

/// Default save interval, in the host's time units (the reference UI ticks
/// in seconds; tests tick in abstract units).
pub const DEFAULT_AUTOSAVE_INTERVAL: u64 = 30;

/// Interval-driven persistence of the working snapshot.
#[derive(Debug, Clone)]
pub struct AutoSaveEngine {
    interval: u64,
    armed: bool,
    next_due: Option<Timestamp>,
    dirty: bool,
}

impl Default for AutoSaveEngine {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL)
    }
}

impl AutoSaveEngine {
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            armed: false,
            next_due: None,
            dirty: false,
        }
    }

    /// Start the save timer.
    pub fn arm(&mut self, now: Timestamp) {
        self.armed = true;
        self.next_due = Some(now + self.interval);
    }

    /// Stop the save timer without touching the stored draft.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.next_due = None;
    }

    /// Record that the snapshot changed since the last save.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether there are edits not yet written to the draft store.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Advance the timer. Saves the snapshot when the interval has elapsed
    /// and there are unsaved changes. Returns whether a save happened.
    pub fn tick(
        &mut self,
        now: Timestamp,
        store: &mut DraftStore,
        key: &DraftKey,
        snapshot: &FormSnapshot,
    ) -> bool {
        if !self.armed {
            return false;
        }
        let due = match self.next_due {
            Some(due) => now >= due,
            None => false,
        };
        if !due {
            return false;
        }

        self.next_due = Some(now + self.interval);
        if !self.dirty {
            return false;
        }

        store.save_draft(key, snapshot, now);
        self.dirty = false;
        true
    }

    /// Save immediately, bypassing the timer. The pending tick is superseded
    /// (re-scheduled a full interval out), so no duplicate write follows.
    pub fn manual_save(
        &mut self,
        now: Timestamp,
        store: &mut DraftStore,
        key: &DraftKey,
        snapshot: &FormSnapshot,
    ) {
        store.save_draft(key, snapshot, now);
        self.dirty = false;
        if self.armed {
            self.next_due = Some(now + self.interval);
        }
    }

    /// Unconditional synchronous save for page unload. Runs even when a
    /// debounced save is pending - this is the durability guarantee of last
    /// resort.
    pub fn flush(
        &mut self,
        now: Timestamp,
        store: &mut DraftStore,
        key: &DraftKey,
        snapshot: &FormSnapshot,
    ) {
        store.save_draft(key, snapshot, now);
        self.dirty = false;
    }

    /// Cancel the timer and discard the stored draft. Called whenever the
    /// session abandons the snapshot (Start New, Duplicate, Completion), so a
    /// stale timer cannot resurrect a discarded draft.
    pub fn clear(&mut self, store: &mut DraftStore, key: &DraftKey) {
        self.disarm();
        self.dirty = false;
        store.clear_draft(key);
    }
}
