//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Timed free-writing notes from the terminal.
#[derive(Parser, Debug)]
#[command(name = "mononote")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the note database
    #[arg(short = 'd', long, env = "MONONOTE_DATA_DIR", value_name = "DIR", default_value = ".mononote")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(short = 'l', long, env = "MONONOTE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Absolute directory for rotated log files; logs go to stderr when unset
    #[arg(long, env = "MONONOTE_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List notes, newest first
    List,
    /// Print one note as plain text
    Show { id: String },
    /// Delete one note
    Delete {
        id: String,
        /// Fail when the note does not exist
        #[arg(long)]
        strict: bool,
    },
    /// Write one note to a text file
    Export {
        id: String,
        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },
    /// Show or change settings
    Settings {
        /// light or dark
        #[arg(long)]
        theme: Option<String>,
        /// Default session length in minutes
        #[arg(long, value_name = "MINUTES")]
        duration_minutes: Option<u32>,
    },
    /// Start a timed writing session reading lines from stdin
    Write {
        /// Session length in minutes (defaults to the settings value)
        #[arg(short, long, value_name = "MINUTES")]
        minutes: Option<u32>,
        /// Autosave cadence in milliseconds
        #[arg(long, env = "MONONOTE_AUTOSAVE_MS", value_name = "MS")]
        autosave_ms: Option<u64>,
    },
}
