//! One-shot note management commands.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, TimeZone};
use mononote_core::{
    display_title, export_note, html_to_text, preview_text, Note, NoteId, NoteRepository,
    SettingsPatch, Theme,
};
use std::path::Path;
use uuid::Uuid;

pub fn list<R: NoteRepository>(store: &R) -> Result<()> {
    let notes = store.list_notes();
    if notes.is_empty() {
        println!("no notes yet");
        return Ok(());
    }
    for note in notes {
        println!(
            "{}  {}  {:>3} min  {}",
            note.id,
            format_created_at(note),
            note.duration_minutes(),
            display_title(note)
        );
        if let Some(preview) = preview_text(&note.content) {
            println!("    {preview}");
        }
    }
    Ok(())
}

pub fn show<R: NoteRepository>(store: &R, id: &str) -> Result<()> {
    let note = find(store, id)?;
    print!("{}", render_note(note, &format_created_at(note)));
    Ok(())
}

/// Terminal view of one note: date, title, body, then the session footer.
fn render_note(note: &Note, created_at: &str) -> String {
    let mut view = format!("{created_at}\n{}\n\n", display_title(note));
    let text = html_to_text(&note.content);
    if !text.is_empty() {
        view.push_str(&text);
        view.push_str("\n\n");
    }
    view.push_str(&format!("{} MIN SESSION\n", note.duration_minutes()));
    view
}

pub fn delete<R: NoteRepository>(store: &mut R, id: &str, strict: bool) -> Result<()> {
    let id = parse_id(id)?;
    if strict {
        store.try_delete_note(id)?;
    } else {
        store.delete_note(id)?;
    }
    println!("deleted {id}");
    Ok(())
}

pub fn export<R: NoteRepository>(store: &R, id: &str, out_dir: &Path) -> Result<()> {
    let note = find(store, id)?;
    let document = export_note(note, Local::now().fixed_offset());
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(&document.file_name);
    std::fs::write(&path, document.body)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

pub fn settings<R: NoteRepository>(
    store: &mut R,
    theme: Option<&str>,
    duration_minutes: Option<u32>,
) -> Result<()> {
    let mut patch = SettingsPatch::default();
    if let Some(value) = theme {
        patch.theme =
            Some(Theme::parse(value).ok_or_else(|| anyhow!("unknown theme `{value}`"))?);
    }
    if let Some(minutes) = duration_minutes {
        patch.timer_duration = Some(minutes.saturating_mul(60));
    }

    let settings = if patch.is_empty() {
        store.settings()
    } else {
        store.update_settings(patch)?
    };
    println!("theme={}", settings.theme);
    println!("timer_duration={}s", settings.timer_duration);
    Ok(())
}

fn find<'a, R: NoteRepository>(store: &'a R, id: &str) -> Result<&'a Note> {
    let id = parse_id(id)?;
    store
        .get_note(id)
        .ok_or_else(|| anyhow!("note {id} not found"))
}

fn parse_id(id: &str) -> Result<NoteId> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        bail!("note id cannot be empty");
    }
    Uuid::parse_str(trimmed).with_context(|| format!("invalid note id `{trimmed}`"))
}

fn format_created_at(note: &Note) -> String {
    Local
        .timestamp_millis_opt(note.created_at)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}
