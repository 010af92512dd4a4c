//! Mononote command-line front-end.
//!
//! # Responsibility
//! - Parse arguments, start logging and open the note store.
//! - Dispatch to note management commands or a live writing session.

mod cli;
mod commands;
mod live;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Command};
use log::info;
use mononote_core::{init_logging, LogTarget, NoteStore, SqliteSnapshotBackend};
use std::path::Path;

const DB_FILE_NAME: &str = "mononote.sqlite3";

fn main() -> Result<()> {
    let args = Args::parse();

    let target = match args.log_dir.as_deref() {
        Some(dir) => LogTarget::directory(dir)?,
        None => LogTarget::Stderr,
    };
    init_logging(&args.log_level, target).context("failed to start logging")?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        mononote_core::core_version()
    );

    let mut store = open_store(&args.data_dir)?;

    match args.command {
        Command::List => commands::list(&store),
        Command::Show { id } => commands::show(&store, &id),
        Command::Delete { id, strict } => commands::delete(&mut store, &id, strict),
        Command::Export { id, out } => commands::export(&store, &id, &out),
        Command::Settings {
            theme,
            duration_minutes,
        } => commands::settings(&mut store, theme.as_deref(), duration_minutes),
        Command::Write {
            minutes,
            autosave_ms,
        } => live::run(&mut store, minutes, autosave_ms),
    }
}

fn open_store(data_dir: &Path) -> Result<NoteStore<SqliteSnapshotBackend>> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    let db_path = data_dir.join(DB_FILE_NAME);
    let backend = SqliteSnapshotBackend::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    NoteStore::open(backend).context("failed to load notes")
}
