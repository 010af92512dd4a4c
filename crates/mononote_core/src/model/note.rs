//! Note domain model.
//!
//! # Responsibility
//! - Define the record produced by one writing session.
//! - Provide constructors that enforce session-start defaults.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `created_at` and `duration_seconds` are fixed at creation.
//! - `is_locked` is persisted only; nothing in core enforces it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a note.
///
/// Serialized as a hyphenated UUID string.
pub type NoteId = Uuid;

/// One persisted free-writing note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Rich text body serialized as HTML markup.
    pub content: String,
    /// Unix epoch milliseconds captured at session start.
    pub created_at: i64,
    /// Session length the note was written under.
    pub duration_seconds: u32,
    pub is_locked: bool,
}

impl Note {
    /// Creates an empty note for a session starting at `created_at`.
    ///
    /// # Invariants
    /// - Title and content start empty.
    /// - `is_locked` starts as `false`.
    pub fn new(created_at: i64, duration_seconds: u32) -> Self {
        Self::with_id(Uuid::new_v4(), created_at, duration_seconds)
    }

    /// Creates an empty note with a caller-provided id.
    pub fn with_id(id: NoteId, created_at: i64, duration_seconds: u32) -> Self {
        Self {
            id,
            title: String::new(),
            content: String::new(),
            created_at,
            duration_seconds,
            is_locked: false,
        }
    }

    /// Whole minutes of the session length, as shown in listings.
    pub fn duration_minutes(&self) -> u32 {
        self.duration_seconds / 60
    }
}
