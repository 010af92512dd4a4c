//! Live writing session over stdin.
//!
//! # Responsibility
//! - Feed stdin lines into the session editor and map slash commands to
//!   session actions.
//! - Pump the session clock from wall time until the session ends.
//!
//! # Invariants
//! - Stdin is read on its own thread; the session is only touched here.
//! - Closing stdin or `/quit` disposes the session without a final flush.

use anyhow::Result;
use log::debug;
use mononote_core::{
    AnimationPhase, FlowState, FormatCommand, HtmlBufferEditor, NoteRepository, SessionConfig,
    SessionController, SessionEvent,
};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const MAX_IDLE_WAIT: Duration = Duration::from_millis(250);

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Text(String),
    Format(FormatCommand),
    Title(String),
    Ambient,
    Finish,
    Quit,
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if let Some(("/title", rest)) = trimmed.split_once(' ') {
        return Input::Title(rest.trim().to_string());
    }
    match trimmed.trim() {
        "/bold" => Input::Format(FormatCommand::Bold),
        "/italic" => Input::Format(FormatCommand::Italic),
        "/list" => Input::Format(FormatCommand::BulletList),
        "/title" => Input::Title(String::new()),
        "/ambient" => Input::Ambient,
        "/finish" => Input::Finish,
        "/quit" => Input::Quit,
        _ => Input::Text(trimmed.to_string()),
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub fn run<R: NoteRepository>(
    store: &mut R,
    minutes: Option<u32>,
    autosave_ms: Option<u64>,
) -> Result<()> {
    let mut config = SessionConfig::default();
    if let Some(interval_ms) = autosave_ms {
        config = config.with_autosave_interval_ms(interval_ms);
    }

    let mut controller = SessionController::silent(store, HtmlBufferEditor::new(), config);
    if let Some(minutes) = minutes {
        controller.set_duration(minutes.saturating_mul(60))?;
    }
    controller.start()?;
    println!("commands: /bold /italic /list /title <text> /ambient /finish /quit");
    print_events(&mut controller);

    let input = spawn_stdin_reader();
    let mut last_pump = Instant::now();

    while !controller.state().is_terminal() {
        let wait = controller
            .next_deadline_ms()
            .map(|due| Duration::from_millis(due.saturating_sub(controller.elapsed_ms())))
            .map_or(MAX_IDLE_WAIT, |until_due| until_due.min(MAX_IDLE_WAIT));

        let received = input.recv_timeout(wait);

        let now = Instant::now();
        controller.advance(now.duration_since(last_pump));
        last_pump = now;

        match received {
            Ok(line) => handle_input(&mut controller, parse_input(&line))?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if controller.state() == FlowState::Writing && !controller.is_finishing() {
                    debug!("event=stdin_closed module=cli status=ok");
                    controller.dispose();
                } else if controller.pending_timers() == 0 {
                    break;
                } else {
                    thread::sleep(wait);
                }
            }
        }
        print_events(&mut controller);
    }

    print_events(&mut controller);
    Ok(())
}

fn handle_input<R: NoteRepository>(
    controller: &mut SessionController<'_, R, HtmlBufferEditor>,
    input: Input,
) -> Result<()> {
    // Input typed during the completion overlay is dropped.
    if controller.state() != FlowState::Writing || controller.is_finishing() {
        return Ok(());
    }
    match input {
        Input::Text(text) => controller.editor_mut().append_line(&text),
        Input::Format(command) => {
            controller.apply_format_command(command)?;
            let active: Vec<&str> = controller
                .editor()
                .active_formats()
                .into_iter()
                .map(FormatCommand::as_str)
                .collect();
            if active.is_empty() {
                println!("[format: plain]");
            } else {
                println!("[format: {}]", active.join(", "));
            }
        }
        Input::Title(title) => {
            controller.set_title(title)?;
            if controller.title().is_empty() {
                println!("[title cleared]");
            } else {
                println!("[title: {}]", controller.title());
            }
        }
        Input::Ambient => {
            controller.toggle_ambient()?;
        }
        Input::Finish => {
            if controller.editor().is_empty() {
                println!("[finishing with an empty page]");
            }
            controller.finish_session();
        }
        Input::Quit => controller.dispose(),
    }
    Ok(())
}

fn print_events<R: NoteRepository>(controller: &mut SessionController<'_, R, HtmlBufferEditor>) {
    for event in controller.drain_events() {
        match event {
            SessionEvent::Started {
                note_id,
                duration_seconds,
            } => println!(
                "[started {note_id}, {}]",
                format_remaining(duration_seconds)
            ),
            SessionEvent::Tick { remaining_seconds } => {
                if remaining_seconds % 60 == 0 || remaining_seconds <= 10 {
                    println!("[{} left]", format_remaining(remaining_seconds));
                }
            }
            SessionEvent::Saved { final_flush, .. } => {
                if final_flush {
                    println!("[saved]");
                } else {
                    debug!("event=autosave_seen module=cli status=ok");
                }
            }
            SessionEvent::SaveFailed { message, .. } => println!("[save failed: {message}]"),
            SessionEvent::AnimationPhaseChanged(AnimationPhase::Visible) => {
                println!("[session complete]")
            }
            SessionEvent::AnimationPhaseChanged(_) => {}
            SessionEvent::Completed { note_id, saved } => {
                if saved {
                    println!("[note {note_id} ready]");
                } else {
                    println!("[note {note_id} may be incomplete]");
                }
            }
            SessionEvent::Cancelled => println!("[session discarded]"),
            SessionEvent::AmbientChanged { playing } => {
                println!("[ambient {}]", if playing { "on" } else { "off" })
            }
            SessionEvent::AmbientFailed { message } => println!("[ambient unavailable: {message}]"),
        }
    }
}

fn format_remaining(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
