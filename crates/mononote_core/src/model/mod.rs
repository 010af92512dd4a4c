//! Domain model for timed writing notes and global settings.
//!
//! # Responsibility
//! - Define canonical data structures persisted by the note store.
//! - Keep serialized field names stable for the durable snapshot.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Deletion is permanent; the model carries no tombstone state.

pub mod note;
pub mod settings;
