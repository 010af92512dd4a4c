//! Note persistence contracts and the write-through store.
//!
//! # Responsibility
//! - Define the `NoteRepository` contract used by the session controller.
//! - Keep durable-medium details behind `SnapshotBackend`.
//!
//! # Invariants
//! - Every successful mutation is durably committed before it returns.
//! - A failed commit leaves in-memory state unchanged.

pub mod note_repo;
pub mod note_store;
pub mod snapshot;
