//! Write-through note store over a snapshot backend.
//!
//! # Responsibility
//! - Hold the in-memory notes/settings state loaded once at open.
//! - Commit the whole snapshot on every mutation before returning.
//!
//! # Invariants
//! - Notes are ordered newest first (insertion at the front).
//! - Note ids are unique across the collection.
//! - `created_at`, `duration_seconds` and `id` are never modified.
//! - The next state is committed first and swapped into memory only on
//!   success, so memory and the durable record never diverge.

use crate::model::note::{Note, NoteId};
use crate::model::settings::{clamp_duration, Settings, SettingsPatch};
use crate::repo::note_repo::{NoteRepository, StoreError, StoreResult};
use crate::repo::snapshot::SnapshotBackend;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Serialized shape of the durable record: `{ notes, settings }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub settings: Settings,
}

impl StoreSnapshot {
    fn position(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }
}

/// Durable note collection plus settings.
pub struct NoteStore<B: SnapshotBackend> {
    backend: B,
    state: StoreSnapshot,
}

impl<B: SnapshotBackend> NoteStore<B> {
    /// Loads the store from `backend`, or starts from defaults when empty.
    ///
    /// Nothing is written until the first mutation.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the backend cannot be read.
    /// - `InvalidData` when the stored snapshot cannot be decoded.
    pub fn open(backend: B) -> StoreResult<Self> {
        let started_at = Instant::now();
        let state = match backend.load()? {
            Some(encoded) => decode_snapshot(&encoded)?,
            None => StoreSnapshot::default(),
        };
        info!(
            "event=store_open module=repo status=ok notes={} duration_ms={}",
            state.notes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Self { backend, state })
    }

    /// Read-only view of the current in-memory snapshot.
    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn commit(&mut self, next: StoreSnapshot, op: &'static str) -> StoreResult<()> {
        let started_at = Instant::now();
        let encoded = serde_json::to_string(&next)
            .map_err(|err| StoreError::InvalidData(format!("snapshot encode failed: {err}")))?;

        if let Err(err) = self.backend.replace(&encoded) {
            error!(
                "event=store_commit module=repo status=error op={op} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }

        info!(
            "event=store_commit module=repo status=ok op={op} notes={} bytes={} duration_ms={}",
            next.notes.len(),
            encoded.len(),
            started_at.elapsed().as_millis()
        );
        self.state = next;
        Ok(())
    }
}

impl<B: SnapshotBackend> NoteRepository for NoteStore<B> {
    fn add_note(&mut self, note: Note) -> StoreResult<()> {
        if self.state.position(note.id).is_some() {
            return Err(StoreError::DuplicateId(note.id));
        }

        let mut next = self.state.clone();
        next.notes.insert(0, note);
        self.commit(next, "add_note")
    }

    fn try_update_note(
        &mut self,
        id: NoteId,
        content: &str,
        title: Option<&str>,
    ) -> StoreResult<()> {
        let index = self.state.position(id).ok_or(StoreError::NotFound(id))?;

        let mut next = self.state.clone();
        let note = &mut next.notes[index];
        note.content = content.to_string();
        if let Some(title) = title {
            note.title = title.to_string();
        }
        self.commit(next, "update_note")
    }

    fn try_delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        let index = self.state.position(id).ok_or(StoreError::NotFound(id))?;

        let mut next = self.state.clone();
        next.notes.remove(index);
        self.commit(next, "delete_note")
    }

    fn get_note(&self, id: NoteId) -> Option<&Note> {
        self.state.notes.iter().find(|note| note.id == id)
    }

    fn list_notes(&self) -> &[Note] {
        &self.state.notes
    }

    fn settings(&self) -> Settings {
        self.state.settings
    }

    fn update_settings(&mut self, patch: SettingsPatch) -> StoreResult<Settings> {
        let mut next = self.state.clone();
        next.settings = self.state.settings.merged(&patch);
        let merged = next.settings;
        self.commit(next, "update_settings")?;
        Ok(merged)
    }
}

fn decode_snapshot(encoded: &str) -> StoreResult<StoreSnapshot> {
    let mut snapshot: StoreSnapshot = serde_json::from_str(encoded)
        .map_err(|err| StoreError::InvalidData(format!("snapshot decode failed: {err}")))?;
    // Older records may carry a duration below today's lower bound.
    snapshot.settings.timer_duration = clamp_duration(snapshot.settings.timer_duration);

    let mut seen = HashSet::new();
    for note in &snapshot.notes {
        if !seen.insert(note.id) {
            return Err(StoreError::InvalidData(format!(
                "duplicate note id `{}` in snapshot",
                note.id
            )));
        }
    }
    Ok(snapshot)
}
