//! Core domain logic for Mononote timed writing sessions.
//! This crate owns the session lifecycle and the durable note store.

pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod session;

pub use config::{CompletionTimings, SessionConfig, AUTOSAVE_INTERVAL_MS};
pub use export::{display_title, export_note, html_to_text, preview_text, ExportDocument};
pub use logging::{init_logging, logging_status, LogTarget, LoggingError};
pub use model::note::{Note, NoteId};
pub use model::settings::{Settings, SettingsPatch, Theme};
pub use repo::note_repo::{NoteRepository, StoreError, StoreResult};
pub use repo::note_store::{NoteStore, StoreSnapshot};
pub use repo::snapshot::{SnapshotBackend, SqliteSnapshotBackend, StorageError, StorageResult};
pub use session::completion::AnimationPhase;
pub use session::controller::{FlowState, SessionController, SessionError, SessionEvent};
pub use session::scheduler::{CancellationToken, Scheduler};
pub use session::surface::{
    AmbientPlayer, EditorSurface, FormatCommand, HtmlBufferEditor, PlaybackError, Silence,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
