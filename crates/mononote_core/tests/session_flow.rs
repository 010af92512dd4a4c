use mononote_core::{
    AmbientPlayer, AnimationPhase, FlowState, FormatCommand, HtmlBufferEditor, Note, NoteId,
    NoteRepository, NoteStore, PlaybackError, SessionConfig, SessionController, SessionEvent,
    Settings, SettingsPatch, SnapshotBackend, SqliteSnapshotBackend, StorageError, StorageResult,
    StoreResult,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

const START_MS: i64 = 1_700_000_000_000;

fn fixed_clock() -> i64 {
    START_MS
}

/// Backend that can be switched into a failing state.
struct FlakyBackend {
    inner: SqliteSnapshotBackend,
    failing: Rc<Cell<bool>>,
}

impl SnapshotBackend for FlakyBackend {
    fn load(&self) -> StorageResult<Option<String>> {
        self.inner.load()
    }

    fn replace(&mut self, snapshot: &str) -> StorageResult<()> {
        if self.failing.get() {
            return Err(StorageError::Backend("medium unreachable".to_string()));
        }
        self.inner.replace(snapshot)
    }
}

/// Repository wrapper that records every mutating call.
struct RecordingRepo<B: SnapshotBackend> {
    inner: NoteStore<B>,
    calls: Vec<String>,
}

impl RecordingRepo<SqliteSnapshotBackend> {
    fn in_memory() -> Self {
        Self::wrap(SqliteSnapshotBackend::open_in_memory().unwrap())
    }
}

impl<B: SnapshotBackend> RecordingRepo<B> {
    fn wrap(backend: B) -> Self {
        Self {
            inner: NoteStore::open(backend).unwrap(),
            calls: Vec::new(),
        }
    }

    fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|recorded| *recorded == call).count()
    }
}

impl<B: SnapshotBackend> NoteRepository for RecordingRepo<B> {
    fn add_note(&mut self, note: Note) -> StoreResult<()> {
        self.calls.push("add".to_string());
        self.inner.add_note(note)
    }

    fn try_update_note(&mut self, id: NoteId, content: &str, title: Option<&str>) -> StoreResult<()> {
        self.calls.push("update".to_string());
        self.inner.try_update_note(id, content, title)
    }

    fn try_delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        self.calls.push("delete".to_string());
        self.inner.try_delete_note(id)
    }

    fn get_note(&self, id: NoteId) -> Option<&Note> {
        self.inner.get_note(id)
    }

    fn list_notes(&self) -> &[Note] {
        self.inner.list_notes()
    }

    fn settings(&self) -> Settings {
        self.inner.settings()
    }

    fn update_settings(&mut self, patch: SettingsPatch) -> StoreResult<Settings> {
        self.calls.push("settings".to_string());
        self.inner.update_settings(patch)
    }
}

/// Player that records calls and can refuse to play.
#[derive(Clone, Default)]
struct ScriptedPlayer {
    log: Rc<RefCell<Vec<&'static str>>>,
    blocked: bool,
}

impl AmbientPlayer for ScriptedPlayer {
    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.blocked {
            self.log.borrow_mut().push("blocked");
            return Err(PlaybackError("autoplay blocked".to_string()));
        }
        self.log.borrow_mut().push("play");
        Ok(())
    }

    fn pause(&mut self) {
        self.log.borrow_mut().push("pause");
    }
}

fn config(autosave_ms: u64) -> SessionConfig {
    SessionConfig::default().with_autosave_interval_ms(autosave_ms)
}

fn saved_events(events: &[SessionEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Saved { final_flush, .. } => Some(*final_flush),
            _ => None,
        })
        .collect()
}

#[test]
fn start_creates_exactly_one_note_with_chosen_duration() {
    for minutes in [1_u32, 5, 25] {
        let mut repo = RecordingRepo::in_memory();
        let note_id = {
            let mut controller =
                SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000))
                    .with_clock(fixed_clock);
            controller.set_duration(minutes * 60).unwrap();
            let note_id = controller.start().unwrap();
            assert_eq!(controller.state(), FlowState::Writing);
            assert_eq!(controller.remaining_seconds(), minutes * 60);
            note_id
        };

        assert_eq!(repo.count("add"), 1);
        assert_eq!(repo.list_notes().len(), 1);
        let note = repo.get_note(note_id).unwrap();
        assert_eq!(note.duration_seconds, minutes * 60);
        assert_eq!(note.created_at, START_MS);
        assert!(note.title.is_empty());
        assert!(note.content.is_empty());
        assert!(!note.is_locked);
    }
}

#[test]
fn created_at_defaults_to_wall_clock() {
    let mut repo = RecordingRepo::in_memory();
    let before = chrono::Utc::now().timestamp_millis();
    let note_id = {
        let mut controller =
            SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));
        controller.start().unwrap()
    };
    let after = chrono::Utc::now().timestamp_millis();

    let created_at = repo.get_note(note_id).unwrap().created_at;
    assert!(created_at >= before && created_at <= after);
}

#[test]
fn initial_duration_comes_from_settings() {
    let mut repo = RecordingRepo::in_memory();
    repo.update_settings(SettingsPatch::timer_duration(900)).unwrap();

    let controller = SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));

    assert_eq!(controller.duration_seconds(), 900);
}

#[test]
fn countdown_decrements_by_one_and_finishes_exactly_once_at_zero() {
    let mut repo = RecordingRepo::in_memory();
    let mut controller =
        SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(600_000));
    controller.set_duration(60).unwrap();
    controller.start().unwrap();
    controller.drain_events();

    controller.advance(Duration::from_secs(59));
    assert_eq!(controller.remaining_seconds(), 1);
    assert!(!controller.is_finishing());

    let ticks: Vec<u32> = controller
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::Tick { remaining_seconds } => Some(remaining_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, (1..=59).rev().collect::<Vec<u32>>());

    controller.advance(Duration::from_secs(1));
    assert_eq!(controller.remaining_seconds(), 0);
    assert!(controller.is_finishing());
    assert_eq!(controller.animation_phase(), AnimationPhase::Starting);

    controller.advance(Duration::from_secs(30));
    let events = controller.drain_events();
    assert_eq!(saved_events(&events), vec![true]);
    assert!(!events
        .iter()
        .any(|event| matches!(event, SessionEvent::Tick { remaining_seconds } if *remaining_seconds > 0)));
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, SessionEvent::Completed { .. }))
            .count(),
        1
    );
    assert_eq!(controller.remaining_seconds(), 0);
    assert_eq!(controller.state(), FlowState::Completed);
}

#[test]
fn sixty_second_session_with_thirty_second_autosave_writes_content_twice() {
    let mut repo = RecordingRepo::in_memory();
    {
        let mut controller =
            SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));
        controller.set_duration(60).unwrap();
        controller.start().unwrap();
        controller.editor_mut().append_line("words");

        controller.advance(Duration::from_secs(60));
        controller.advance(Duration::from_secs(5));
        assert_eq!(controller.state(), FlowState::Completed);
        assert_eq!(saved_events(&controller.drain_events()), vec![false, true]);
    }

    assert_eq!(repo.count("add"), 1);
    assert_eq!(repo.count("update"), 2);
}

#[test]
fn final_flush_happens_before_animation_and_nothing_after() {
    let mut repo = RecordingRepo::in_memory();
    let mut controller =
        SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));
    controller.set_duration(60).unwrap();
    let note_id = controller.start().unwrap();

    controller.advance(Duration::from_secs(45));
    controller.set_title("Rain").unwrap();
    controller.editor_mut().append_line("last thought");

    controller.advance(Duration::from_secs(15));
    assert_eq!(controller.animation_phase(), AnimationPhase::Starting);

    let persisted = controller.store().get_note(note_id).unwrap().clone();
    assert_eq!(persisted.title, "Rain");
    assert_eq!(persisted.content, "<div>last thought</div>");
    let writes_at_animation = controller.store().calls.len();

    let events = controller.drain_events();
    let starting_at = events
        .iter()
        .position(|event| *event == SessionEvent::AnimationPhaseChanged(AnimationPhase::Starting))
        .unwrap();
    assert!(events[starting_at..]
        .iter()
        .all(|event| !matches!(event, SessionEvent::Saved { .. })));

    controller.advance(Duration::from_millis(49));
    assert_eq!(controller.animation_phase(), AnimationPhase::Starting);
    controller.advance(Duration::from_millis(1));
    assert_eq!(controller.animation_phase(), AnimationPhase::Visible);
    controller.advance(Duration::from_millis(1_950));
    assert_eq!(controller.animation_phase(), AnimationPhase::Fading);
    assert_eq!(controller.state(), FlowState::Writing);
    controller.advance(Duration::from_millis(500));
    assert_eq!(controller.state(), FlowState::Completed);

    let events = controller.drain_events();
    assert!(events.contains(&SessionEvent::Completed {
        note_id,
        saved: true
    }));
    assert_eq!(controller.store().calls.len(), writes_at_animation);
    assert!(controller.set_title("too late").is_err());
}

#[test]
fn repeated_autosave_without_changes_matches_single_flush() {
    let mut repo = RecordingRepo::in_memory();
    let mut controller =
        SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(10_000));
    controller.set_duration(600).unwrap();
    controller.start().unwrap();
    controller.set_title("Same").unwrap();
    controller.editor_mut().append_line("unchanged");

    controller.advance(Duration::from_secs(10));
    let after_one = controller.store().inner.snapshot().clone();

    controller.advance(Duration::from_secs(30));
    let after_four = controller.store().inner.snapshot().clone();

    assert_eq!(controller.store().count("update"), 4);
    assert_eq!(after_one, after_four);
    assert_eq!(after_four.notes.len(), 1);
}

#[test]
fn dispose_between_ticks_stops_all_writes() {
    let mut repo = RecordingRepo::in_memory();
    let note_id;
    let writes_before;
    {
        let mut controller =
            SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(2_000));
        controller.set_duration(60).unwrap();
        note_id = controller.start().unwrap();
        controller.editor_mut().append_line("before");

        controller.advance(Duration::from_millis(2_500));
        writes_before = controller.store().calls.len();
        controller.drain_events();

        controller.dispose();
        controller.editor_mut().append_line("after");
        controller.advance(Duration::from_secs(120));

        assert_eq!(controller.state(), FlowState::Cancelled);
        assert_eq!(controller.pending_timers(), 0);
        assert_eq!(controller.remaining_seconds(), 58);
        assert_eq!(controller.drain_events(), vec![SessionEvent::Cancelled]);
        assert_eq!(controller.store().calls.len(), writes_before);
    }

    assert_eq!(repo.calls.len(), writes_before);
    assert_eq!(
        repo.get_note(note_id).unwrap().content,
        "<div>before</div>"
    );
}

#[test]
fn dispose_during_animation_suppresses_completion() {
    let mut repo = RecordingRepo::in_memory();
    let mut controller =
        SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));
    controller.set_duration(60).unwrap();
    controller.start().unwrap();
    controller.advance(Duration::from_secs(61));
    assert!(controller.is_finishing());

    controller.dispose();
    controller.advance(Duration::from_secs(10));

    assert_eq!(controller.state(), FlowState::Cancelled);
    assert!(!controller
        .drain_events()
        .iter()
        .any(|event| matches!(event, SessionEvent::Completed { .. })));
}

#[test]
fn manual_finish_is_single_shot() {
    let mut repo = RecordingRepo::in_memory();
    {
        let mut controller =
            SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));
        controller.start().unwrap();
        controller.advance(Duration::from_secs(3));

        controller.finish_session();
        controller.finish_session();
        controller.advance(Duration::from_secs(3));
        controller.finish_session();

        assert_eq!(controller.state(), FlowState::Completed);
        assert_eq!(controller.remaining_seconds(), 297);
        assert_eq!(saved_events(&controller.drain_events()), vec![true]);
    }
    assert_eq!(repo.count("update"), 1);
}

#[test]
fn format_commands_reach_editor_without_changing_state() {
    let mut repo = RecordingRepo::in_memory();
    let mut controller =
        SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(30_000));
    assert!(controller.apply_format_command(FormatCommand::Bold).is_err());

    controller.start().unwrap();
    controller.apply_format_command(FormatCommand::Bold).unwrap();
    controller.apply_format_command(FormatCommand::BulletList).unwrap();
    controller.editor_mut().append_line("point");

    assert_eq!(controller.state(), FlowState::Writing);
    assert_eq!(
        controller.editor().active_formats(),
        vec![FormatCommand::Bold, FormatCommand::BulletList]
    );
    assert_eq!(controller.pending_timers(), 2);
}

#[test]
fn storage_failure_is_reported_and_session_continues() {
    let failing = Rc::new(Cell::new(false));
    let mut repo = RecordingRepo::wrap(FlakyBackend {
        inner: SqliteSnapshotBackend::open_in_memory().unwrap(),
        failing: Rc::clone(&failing),
    });
    let mut controller =
        SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(10_000));
    controller.set_duration(60).unwrap();
    let note_id = controller.start().unwrap();
    controller.editor_mut().append_line("draft");

    failing.set(true);
    controller.advance(Duration::from_secs(10));
    assert!(!controller.is_saved());
    assert_eq!(controller.state(), FlowState::Writing);
    assert!(controller
        .drain_events()
        .iter()
        .any(|event| matches!(event, SessionEvent::SaveFailed { note_id: id, .. } if *id == note_id)));
    assert_eq!(controller.store().get_note(note_id).unwrap().content, "");

    failing.set(false);
    controller.advance(Duration::from_secs(10));
    assert!(controller.is_saved());
    assert_eq!(
        controller.store().get_note(note_id).unwrap().content,
        "<div>draft</div>"
    );

    failing.set(true);
    controller.advance(Duration::from_secs(45));
    assert_eq!(controller.state(), FlowState::Completed);
    assert!(controller.drain_events().contains(&SessionEvent::Completed {
        note_id,
        saved: false
    }));
}

#[test]
fn failed_initial_insert_is_retried_by_autosave() {
    let failing = Rc::new(Cell::new(true));
    let mut repo = RecordingRepo::wrap(FlakyBackend {
        inner: SqliteSnapshotBackend::open_in_memory().unwrap(),
        failing: Rc::clone(&failing),
    });
    let note_id = {
        let mut controller =
            SessionController::silent(&mut repo, HtmlBufferEditor::new(), config(5_000))
                .with_clock(fixed_clock);
        controller.set_duration(60).unwrap();
        let note_id = controller.start().unwrap();
        assert_eq!(controller.state(), FlowState::Writing);
        assert!(!controller.is_saved());
        assert!(controller.store().get_note(note_id).is_none());

        controller.set_title("Recovered").unwrap();
        failing.set(false);
        controller.advance(Duration::from_secs(5));
        assert!(controller.is_saved());
        controller.advance(Duration::from_secs(5));
        note_id
    };

    assert_eq!(repo.count("add"), 2);
    assert_eq!(repo.count("update"), 1);
    assert_eq!(repo.list_notes().len(), 1);
    let note = repo.get_note(note_id).unwrap();
    assert_eq!(note.title, "Recovered");
    assert_eq!(note.created_at, START_MS);
}

#[test]
fn ambient_failure_is_non_fatal_and_playback_stops_at_finish() {
    let mut repo = RecordingRepo::in_memory();

    let blocked = ScriptedPlayer {
        blocked: true,
        ..ScriptedPlayer::default()
    };
    {
        let mut controller = SessionController::new(
            &mut repo,
            HtmlBufferEditor::new(),
            blocked.clone(),
            config(30_000),
        );
        controller.start().unwrap();
        assert!(!controller.toggle_ambient().unwrap());
        assert_eq!(controller.state(), FlowState::Writing);
        assert!(controller
            .drain_events()
            .iter()
            .any(|event| matches!(event, SessionEvent::AmbientFailed { .. })));
    }
    assert_eq!(*blocked.log.borrow(), vec!["blocked"]);

    let player = ScriptedPlayer::default();
    let mut controller = SessionController::new(
        &mut repo,
        HtmlBufferEditor::new(),
        player.clone(),
        config(30_000),
    );
    controller.start().unwrap();
    assert!(controller.toggle_ambient().unwrap());
    controller.finish_session();

    assert!(!controller.is_ambient_playing());
    assert_eq!(*player.log.borrow(), vec!["play", "pause"]);
}
