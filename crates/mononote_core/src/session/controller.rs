//! Writing session state machine.
//!
//! # Responsibility
//! - Drive one session through `PreStart -> Writing -> Completed`.
//! - Own the countdown, autosave and completion steps on one scheduler.
//! - Flush buffered title/content into the injected note repository.
//!
//! # Invariants
//! - Starting creates exactly one note for the session.
//! - `finish_session` runs at most once and flushes before the completion
//!   overlay begins; no store write happens after that point.
//! - After `dispose` (or drop) no tick fires and no store write happens.
//! - Remaining time decreases by one per countdown tick and never underflows.

use crate::config::{SessionConfig, DURATION_STEP_SECONDS};
use crate::model::note::{Note, NoteId};
use crate::model::settings::clamp_duration;
use crate::repo::note_repo::{NoteRepository, StoreError};
use crate::session::completion::{completion_steps, AnimationPhase, CompletionAction};
use crate::session::scheduler::{CancellationToken, Scheduler};
use crate::session::surface::{AmbientPlayer, EditorSurface, FormatCommand, Silence};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Top-level flow state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    PreStart,
    Writing,
    /// Terminal; the note is ready for viewing.
    Completed,
    /// Terminal; the flow was cancelled or torn down before completing.
    Cancelled,
}

impl FlowState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreStart => "pre_start",
            Self::Writing => "writing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl Display for FlowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    InvalidState {
        action: &'static str,
        state: FlowState,
    },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidState { action, state } => {
                write!(f, "`{action}` is not allowed in state `{state}`")
            }
        }
    }
}

impl Error for SessionError {}

/// Observable session progress, drained by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started {
        note_id: NoteId,
        duration_seconds: u32,
    },
    Tick {
        remaining_seconds: u32,
    },
    Saved {
        note_id: NoteId,
        final_flush: bool,
    },
    SaveFailed {
        note_id: NoteId,
        message: String,
    },
    AnimationPhaseChanged(AnimationPhase),
    /// Hand-off to the viewing surface.
    Completed {
        note_id: NoteId,
        saved: bool,
    },
    Cancelled,
    AmbientChanged {
        playing: bool,
    },
    AmbientFailed {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTask {
    Countdown,
    Autosave,
    Completion(CompletionAction),
}

/// Current wall-clock time in epoch milliseconds.
pub fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Controller for one writing flow.
///
/// The store is borrowed for the controller's lifetime; the editor and the
/// ambient player are owned.
pub struct SessionController<'store, R, E, P = Silence>
where
    R: NoteRepository,
    E: EditorSurface,
    P: AmbientPlayer,
{
    store: &'store mut R,
    editor: E,
    player: P,
    config: SessionConfig,
    clock: fn() -> i64,
    scheduler: Scheduler<SessionTask>,
    session_token: CancellationToken,
    timers_token: CancellationToken,
    state: FlowState,
    duration_seconds: u32,
    remaining_seconds: u32,
    note_id: Option<NoteId>,
    created_at: i64,
    note_persisted: bool,
    last_save_ok: bool,
    title: String,
    animation: AnimationPhase,
    finishing: bool,
    ambient_playing: bool,
    events: Vec<SessionEvent>,
}

impl<'store, R, E> SessionController<'store, R, E, Silence>
where
    R: NoteRepository,
    E: EditorSurface,
{
    /// Creates a controller without ambient playback.
    pub fn silent(store: &'store mut R, editor: E, config: SessionConfig) -> Self {
        Self::new(store, editor, Silence, config)
    }
}

impl<'store, R, E, P> SessionController<'store, R, E, P>
where
    R: NoteRepository,
    E: EditorSurface,
    P: AmbientPlayer,
{
    /// Creates a controller in `PreStart` with the duration from settings.
    pub fn new(store: &'store mut R, editor: E, player: P, config: SessionConfig) -> Self {
        let session_token = CancellationToken::new();
        let timers_token = session_token.child_token();
        let duration_seconds = clamp_duration(store.settings().timer_duration);
        Self {
            store,
            editor,
            player,
            config,
            clock: wall_clock_ms,
            scheduler: Scheduler::new(),
            session_token,
            timers_token,
            state: FlowState::PreStart,
            duration_seconds,
            remaining_seconds: duration_seconds,
            note_id: None,
            created_at: 0,
            note_persisted: false,
            last_save_ok: true,
            title: String::new(),
            animation: AnimationPhase::Idle,
            finishing: false,
            ambient_playing: false,
            events: Vec::new(),
        }
    }

    /// Replaces the wall clock used for `created_at`.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Whether the completion overlay is running.
    pub fn is_finishing(&self) -> bool {
        self.finishing && self.state == FlowState::Writing
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn note_id(&self) -> Option<NoteId> {
        self.note_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn animation_phase(&self) -> AnimationPhase {
        self.animation
    }

    /// Whether the most recent flush reached durable storage.
    pub fn is_saved(&self) -> bool {
        self.last_save_ok
    }

    pub fn is_ambient_playing(&self) -> bool {
        self.ambient_playing
    }

    /// Virtual time elapsed since the controller was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// Live scheduled tasks (countdown, autosave, completion steps).
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Virtual time of the next scheduled task.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.scheduler.next_due_ms()
    }

    pub fn store(&self) -> &R {
        &*self.store
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Mutable editor access; edits are picked up by the next flush.
    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    /// Takes all events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Changes the intended duration by whole steps of five minutes.
    ///
    /// Never goes below the minimum session length.
    pub fn adjust_duration(&mut self, steps: i32) -> Result<u32, SessionError> {
        self.require(FlowState::PreStart, "adjust_duration")?;
        let delta = i64::from(steps) * i64::from(DURATION_STEP_SECONDS);
        let next = (i64::from(self.duration_seconds) + delta).clamp(0, i64::from(u32::MAX));
        self.set_duration_unchecked(u32::try_from(next).unwrap_or(u32::MAX));
        Ok(self.duration_seconds)
    }

    /// Sets the intended duration, clamped to the minimum session length.
    pub fn set_duration(&mut self, seconds: u32) -> Result<u32, SessionError> {
        self.require(FlowState::PreStart, "set_duration")?;
        self.set_duration_unchecked(seconds);
        Ok(self.duration_seconds)
    }

    fn set_duration_unchecked(&mut self, seconds: u32) {
        self.duration_seconds = clamp_duration(seconds);
        self.remaining_seconds = self.duration_seconds;
    }

    /// Leaves the flow from `PreStart` without creating a note.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.require(FlowState::PreStart, "cancel")?;
        self.session_token.cancel();
        self.scheduler.clear();
        self.state = FlowState::Cancelled;
        self.events.push(SessionEvent::Cancelled);
        info!("event=session_cancel module=session status=ok");
        Ok(())
    }

    /// Creates the session note and starts countdown and autosave.
    ///
    /// A storage failure on the initial insert does not stop the session; the
    /// insert is retried by each following flush.
    pub fn start(&mut self) -> Result<NoteId, SessionError> {
        self.require(FlowState::PreStart, "start")?;

        let note = Note::new((self.clock)(), self.duration_seconds);
        let note_id = note.id;
        self.note_id = Some(note_id);
        self.created_at = note.created_at;
        self.remaining_seconds = self.duration_seconds;

        match self.store.add_note(note) {
            Ok(()) => self.note_persisted = true,
            Err(err) => self.record_save_failure(note_id, "start", &err),
        }

        self.scheduler.schedule_repeating(
            self.config.tick_interval_ms,
            SessionTask::Countdown,
            &self.timers_token,
        );
        self.scheduler.schedule_repeating(
            self.config.autosave_interval_ms,
            SessionTask::Autosave,
            &self.timers_token,
        );

        self.state = FlowState::Writing;
        self.events.push(SessionEvent::Started {
            note_id,
            duration_seconds: self.duration_seconds,
        });
        info!(
            "event=session_start module=session status=ok note_id={note_id} duration_seconds={} autosave_interval_ms={}",
            self.duration_seconds, self.config.autosave_interval_ms
        );
        Ok(note_id)
    }

    /// Replaces the buffered title.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), SessionError> {
        self.require_editable("set_title")?;
        self.title = title.into();
        Ok(())
    }

    /// Forwards a formatting command to the editor surface.
    pub fn apply_format_command(&mut self, command: FormatCommand) -> Result<(), SessionError> {
        self.require_editable("apply_format_command")?;
        self.editor.apply_format_command(command);
        debug!(
            "event=format_command module=session status=ok command={}",
            command.as_str()
        );
        Ok(())
    }

    /// Toggles ambient playback and returns whether it is now playing.
    ///
    /// Playback failures are reported as events and never stop the session.
    pub fn toggle_ambient(&mut self) -> Result<bool, SessionError> {
        self.require_editable("toggle_ambient")?;
        if self.ambient_playing {
            self.player.pause();
            self.ambient_playing = false;
        } else {
            match self.player.play() {
                Ok(()) => self.ambient_playing = true,
                Err(err) => {
                    warn!("event=ambient_toggle module=session status=error error={err}");
                    self.events.push(SessionEvent::AmbientFailed {
                        message: err.to_string(),
                    });
                    return Ok(false);
                }
            }
        }
        info!(
            "event=ambient_toggle module=session status=ok playing={}",
            self.ambient_playing
        );
        self.events.push(SessionEvent::AmbientChanged {
            playing: self.ambient_playing,
        });
        Ok(self.ambient_playing)
    }

    /// Advances virtual time, firing every task that falls due on the way.
    pub fn advance(&mut self, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.advance_ms(elapsed_ms);
    }

    /// Millisecond form of `advance`.
    pub fn advance_ms(&mut self, elapsed_ms: u64) {
        let target = self.scheduler.now_ms().saturating_add(elapsed_ms);
        while let Some(task) = self.scheduler.pop_due(target) {
            self.dispatch(task);
        }
        self.scheduler.advance_clock(target);
    }

    /// Ends writing: stops timers and playback, flushes once, then starts
    /// the completion overlay. Calls after the first are ignored.
    pub fn finish_session(&mut self) {
        if self.state != FlowState::Writing || self.finishing {
            return;
        }
        self.finishing = true;

        self.timers_token.cancel();
        self.scheduler.purge_cancelled();
        if self.ambient_playing {
            self.player.pause();
            self.ambient_playing = false;
            self.events.push(SessionEvent::AmbientChanged { playing: false });
        }

        self.flush(true);

        self.set_animation(AnimationPhase::Starting);
        for step in completion_steps(&self.config.completion) {
            self.scheduler.schedule_once(
                step.at_ms,
                SessionTask::Completion(step.action),
                &self.session_token,
            );
        }
        info!(
            "event=session_finish module=session status=ok note_id={} remaining_seconds={} saved={}",
            self.note_id_label(),
            self.remaining_seconds,
            self.last_save_ok
        );
    }

    /// Tears the session down. Pending ticks are discarded and the store is
    /// never written by this controller again.
    pub fn dispose(&mut self) {
        if self.session_token.is_cancelled() && self.state.is_terminal() {
            return;
        }
        self.session_token.cancel();
        self.scheduler.clear();
        if self.ambient_playing {
            self.player.pause();
            self.ambient_playing = false;
        }
        if !self.state.is_terminal() {
            self.state = FlowState::Cancelled;
            self.events.push(SessionEvent::Cancelled);
        }
        info!(
            "event=session_dispose module=session status=ok note_id={} state={}",
            self.note_id_label(),
            self.state
        );
    }

    fn dispatch(&mut self, task: SessionTask) {
        match task {
            SessionTask::Countdown => {
                if !self.timers_token.is_cancelled() {
                    self.on_countdown_tick();
                }
            }
            SessionTask::Autosave => {
                if !self.timers_token.is_cancelled() {
                    self.flush(false);
                }
            }
            SessionTask::Completion(action) => {
                if !self.session_token.is_cancelled() {
                    self.on_completion_step(action);
                }
            }
        }
    }

    fn on_countdown_tick(&mut self) {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.events.push(SessionEvent::Tick {
            remaining_seconds: self.remaining_seconds,
        });
        if self.remaining_seconds == 0 {
            self.finish_session();
        }
    }

    fn on_completion_step(&mut self, action: CompletionAction) {
        match action {
            CompletionAction::Enter(phase) => self.set_animation(phase),
            CompletionAction::Complete => {
                self.state = FlowState::Completed;
                self.session_token.cancel();
                self.scheduler.clear();
                if let Some(note_id) = self.note_id {
                    self.events.push(SessionEvent::Completed {
                        note_id,
                        saved: self.last_save_ok,
                    });
                }
                info!(
                    "event=session_complete module=session status=ok note_id={} saved={} elapsed_ms={}",
                    self.note_id_label(),
                    self.last_save_ok,
                    self.scheduler.now_ms()
                );
            }
        }
    }

    fn set_animation(&mut self, phase: AnimationPhase) {
        self.animation = phase;
        self.events.push(SessionEvent::AnimationPhaseChanged(phase));
    }

    /// Writes the buffered title/content. Returns whether it reached storage.
    fn flush(&mut self, final_flush: bool) -> bool {
        let Some(note_id) = self.note_id else {
            return false;
        };
        if self.session_token.is_cancelled() {
            return false;
        }

        let content = self.editor.serialized_content();
        let result = if self.note_persisted {
            self.store
                .update_note(note_id, &content, Some(self.title.as_str()))
        } else {
            self.insert_buffered_note(note_id, &content)
        };

        let reason = if final_flush { "final" } else { "autosave" };
        match result {
            Ok(()) => {
                self.last_save_ok = true;
                self.events.push(SessionEvent::Saved {
                    note_id,
                    final_flush,
                });
                info!(
                    "event=autosave module=session status=ok reason={reason} note_id={note_id} content_len={} title_len={}",
                    content.len(),
                    self.title.len()
                );
                true
            }
            Err(err) => {
                self.record_save_failure(note_id, reason, &err);
                false
            }
        }
    }

    fn insert_buffered_note(&mut self, note_id: NoteId, content: &str) -> Result<(), StoreError> {
        let mut note = Note::with_id(note_id, self.created_at, self.duration_seconds);
        note.title = self.title.clone();
        note.content = content.to_string();
        match self.store.add_note(note) {
            Ok(()) => {
                self.note_persisted = true;
                Ok(())
            }
            Err(StoreError::DuplicateId(_)) => {
                self.note_persisted = true;
                self.store
                    .update_note(note_id, content, Some(self.title.as_str()))
            }
            Err(err) => Err(err),
        }
    }

    fn record_save_failure(&mut self, note_id: NoteId, reason: &str, err: &StoreError) {
        self.last_save_ok = false;
        error!(
            "event=autosave module=session status=error reason={reason} note_id={note_id} storage_failure={} error={}",
            err.is_storage_failure(),
            err
        );
        self.events.push(SessionEvent::SaveFailed {
            note_id,
            message: err.to_string(),
        });
    }

    fn require(&self, expected: FlowState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    fn require_editable(&self, action: &'static str) -> Result<(), SessionError> {
        self.require(FlowState::Writing, action)?;
        if self.finishing {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    fn note_id_label(&self) -> String {
        self.note_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}

impl<R, E, P> Drop for SessionController<'_, R, E, P>
where
    R: NoteRepository,
    E: EditorSurface,
    P: AmbientPlayer,
{
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.dispose();
        }
    }
}
