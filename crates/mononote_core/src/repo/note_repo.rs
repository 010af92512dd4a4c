//! Note repository contract and error taxonomy.
//!
//! # Responsibility
//! - Define the create/read/update/delete + settings contract the session
//!   controller and front-ends depend on.
//! - Keep the lenient (silent no-op) and strict (`NotFound`) variants of
//!   update/delete side by side.
//!
//! # Invariants
//! - `update_note`/`delete_note` never report a missing id.
//! - `try_update_note`/`try_delete_note` report a missing id as `NotFound`.
//! - Neither variant creates a note.

use crate::model::note::{Note, NoteId};
use crate::model::settings::{Settings, SettingsPatch};
use crate::repo::snapshot::StorageError;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Note store error.
#[derive(Debug)]
pub enum StoreError {
    /// Insert of an id already present. Programming invariant violation.
    DuplicateId(NoteId),
    /// Strict update/delete against a missing id.
    NotFound(NoteId),
    /// Durable commit failed; in-memory state was left unchanged.
    StorageUnavailable(StorageError),
    /// Persisted snapshot could not be decoded or encoded.
    InvalidData(String),
}

impl StoreError {
    /// Whether this error came from the durable medium.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "note id already present: {id}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted store data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::StorageUnavailable(value)
    }
}

/// Repository interface for notes and global settings.
pub trait NoteRepository {
    /// Inserts a fully-formed note at the front of the collection.
    fn add_note(&mut self, note: Note) -> StoreResult<()>;

    /// Replaces content, and title when provided. Missing id is `NotFound`.
    fn try_update_note(
        &mut self,
        id: NoteId,
        content: &str,
        title: Option<&str>,
    ) -> StoreResult<()>;

    /// Removes a note. Missing id is `NotFound`.
    fn try_delete_note(&mut self, id: NoteId) -> StoreResult<()>;

    /// Looks up one note.
    fn get_note(&self, id: NoteId) -> Option<&Note>;

    /// All notes, newest first.
    fn list_notes(&self) -> &[Note];

    /// Current settings record.
    fn settings(&self) -> Settings;

    /// Merges the patch into settings and returns the result.
    fn update_settings(&mut self, patch: SettingsPatch) -> StoreResult<Settings>;

    /// Replaces content, and title when provided. Missing id is ignored.
    fn update_note(&mut self, id: NoteId, content: &str, title: Option<&str>) -> StoreResult<()> {
        match self.try_update_note(id, content, title) {
            Err(StoreError::NotFound(_)) => {
                debug!("event=note_update module=repo status=ignored reason=not_found note_id={id}");
                Ok(())
            }
            other => other,
        }
    }

    /// Removes a note if present. Missing id is ignored.
    fn delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        match self.try_delete_note(id) {
            Err(StoreError::NotFound(_)) => {
                debug!("event=note_delete module=repo status=ignored reason=not_found note_id={id}");
                Ok(())
            }
            other => other,
        }
    }
}
