//! Process-wide logger setup.
//!
//! # Responsibility
//! - Start one `flexi_logger` backend per process, writing size-rotated
//!   files or stderr.
//! - Record panics as single-line log entries before the default hook runs.
//!
//! # Invariants
//! - A second call with the same level and target is a no-op.
//! - A second call with another level or target fails with
//!   [`LoggingError::Conflict`] and leaves the running logger untouched.
//! - Records carry ids, counts and timings; note titles and bodies are never
//!   logged.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Once;

const FILE_BASENAME: &str = "mononote";
const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
const KEEP_FILES: usize = 3;
const PANIC_TEXT_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Destination for log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Rotated files under an absolute directory.
    Directory(PathBuf),
    Stderr,
}

impl LogTarget {
    /// Directory target; the path must be absolute.
    pub fn directory(dir: &str) -> Result<Self, LoggingError> {
        let trimmed = dir.trim();
        let path = Path::new(trimmed);
        if trimmed.is_empty() || !path.is_absolute() {
            return Err(LoggingError::InvalidDirectory(trimmed.to_string()));
        }
        Ok(Self::Directory(path.to_path_buf()))
    }
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    InvalidDirectory(String),
    CreateDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// Logging already runs with a different level or target.
    Conflict { active: String, requested: String },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected off|error|warn|info|debug|trace"
            ),
            Self::InvalidDirectory(dir) => {
                write!(f, "log directory must be a non-empty absolute path, got `{dir}`")
            }
            Self::CreateDirectory { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "logger backend failed to start: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging is already running as `{active}`; cannot switch to `{requested}`"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

struct ActiveLogger {
    level: LevelFilter,
    target: LogTarget,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn describe(level: LevelFilter, target: &LogTarget) -> String {
        format!("{} -> {target}", level.as_str().to_ascii_lowercase())
    }
}

/// Starts logging at `level` (case-insensitive) towards `target`.
pub fn init_logging(level: &str, target: LogTarget) -> Result<(), LoggingError> {
    let level = level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::InvalidLevel(level.trim().to_string()))?;

    let active = ACTIVE.get_or_try_init(|| -> Result<ActiveLogger, LoggingError> {
        let handle = start_backend(level, &target)?;
        PANIC_HOOK.call_once(install_panic_hook);
        info!(
            "event=logging_init module=core status=ok level={} target={} os={} version={}",
            level.as_str().to_ascii_lowercase(),
            target,
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );
        Ok(ActiveLogger {
            level,
            target: target.clone(),
            _handle: handle,
        })
    })?;

    if active.level != level || active.target != target {
        return Err(LoggingError::Conflict {
            active: ActiveLogger::describe(active.level, &active.target),
            requested: ActiveLogger::describe(level, &target),
        });
    }
    Ok(())
}

/// Level and target of the running logger, if one was started.
pub fn logging_status() -> Option<(LevelFilter, LogTarget)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.target.clone()))
}

fn start_backend(level: LevelFilter, target: &LogTarget) -> Result<LoggerHandle, LoggingError> {
    let logger = Logger::with(LogSpecification::builder().default(level).build());
    let logger = match target {
        LogTarget::Stderr => logger.format_for_stderr(flexi_logger::default_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDirectory {
                dir: dir.clone(),
                source,
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_FILES),
                )
                .append()
                .write_mode(WriteMode::BufferAndFlush)
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    Ok(logger.start()?)
}

fn install_panic_hook() {
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let at = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let text = info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string payload>".to_string());
        error!(
            "event=panic module=core status=error location={at} payload={}",
            single_line(&text, PANIC_TEXT_LIMIT)
        );
        chained(info);
    }));
}

/// Flattens line breaks and caps the length, marking a cut with `...`.
fn single_line(text: &str, limit: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, single_line, LogTarget, LoggingError};
    use log::LevelFilter;

    #[test]
    fn single_line_flattens_and_caps() {
        assert_eq!(single_line("a\nb\rc", 10), "a b c");
        assert_eq!(single_line("abcdefgh", 3), "abc...");
        assert_eq!(single_line("abc", 3), "abc");
    }

    #[test]
    fn directory_target_must_be_absolute() {
        assert!(matches!(
            LogTarget::directory("logs/dev"),
            Err(LoggingError::InvalidDirectory(_))
        ));
        assert!(LogTarget::directory("   ").is_err());
    }

    #[test]
    fn unknown_level_is_rejected_before_starting() {
        let err = init_logging("verbose", LogTarget::Stderr).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidLevel(level) if level == "verbose"));
    }

    #[test]
    fn repeated_init_is_idempotent_and_conflicts_fail() {
        let dir = tempfile::tempdir().unwrap();
        let target = LogTarget::directory(dir.path().to_str().unwrap()).unwrap();

        init_logging("info", target.clone()).unwrap();
        init_logging(" INFO ", target.clone()).unwrap();

        assert!(matches!(
            init_logging("debug", target.clone()),
            Err(LoggingError::Conflict { .. })
        ));
        assert!(matches!(
            init_logging("info", LogTarget::Stderr),
            Err(LoggingError::Conflict { .. })
        ));
        assert_eq!(logging_status(), Some((LevelFilter::Info, target)));
    }
}
