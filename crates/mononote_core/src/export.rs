//! Plain-text export and preview projections for finished notes.
//!
//! # Responsibility
//! - Render one note into a downloadable text document.
//! - Derive listing previews from HTML note bodies.
//!
//! # Invariants
//! - Export is read-only; it never touches the store or a session.
//! - Output never contains markup tags from the note body.

use crate::model::note::Note;
use chrono::{DateTime, FixedOffset, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

const PREVIEW_MAX_CHARS: usize = 100;
const UNTITLED: &str = "Untitled";

static BLOCK_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br\s*/?|/\s*(div|p|li|h[1-6]|ul|ol)\s*)>").expect("valid block regex")
});
static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*li(\s[^>]*)?>").expect("valid list item regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Rendered export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub body: String,
}

/// Renders a note as a plain-text document.
///
/// The creation timestamp is shown in the offset of `exported_at`.
pub fn export_note(note: &Note, exported_at: DateTime<FixedOffset>) -> ExportDocument {
    let offset = *exported_at.offset();
    let created = offset
        .timestamp_millis_opt(note.created_at)
        .single()
        .map(|created| created.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown date".to_string());

    let title = display_title(note);
    let text = html_to_text(&note.content);

    let mut body = format!("MONONOTE / {created}\n\n{title}\n\n");
    if !text.is_empty() {
        body.push_str(&text);
        body.push_str("\n\n");
    }
    body.push_str(&format!("{} MIN SESSION\n", note.duration_minutes()));

    ExportDocument {
        file_name: format!("note-{}.txt", note.id),
        body,
    }
}

/// Converts an HTML note body to plain text, one block per line.
pub fn html_to_text(html: &str) -> String {
    let with_bullets = LIST_ITEM_RE.replace_all(html, "- ");
    let with_breaks = BLOCK_BREAK_RE.replace_all(&with_bullets, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);
    let lines = decoded
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINES_RE
        .replace_all(lines.trim(), "\n\n")
        .into_owned()
}

/// Single-line plain-text preview, capped at 100 characters.
pub fn preview_text(html: &str) -> Option<String> {
    let text = html_to_text(html);
    let collapsed = WHITESPACE_RE.replace_all(&text, " ");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    }
}

/// Display title for listings and exports.
pub fn display_title(note: &Note) -> &str {
    let trimmed = note.title.trim();
    if trimmed.is_empty() {
        UNTITLED
    } else {
        trimmed
    }
}

fn decode_entities(text: &str) -> String {
    // `&amp;` goes last so `&amp;lt;` decodes to `&lt;`, not `<`.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::{html_to_text, preview_text};

    #[test]
    fn html_to_text_breaks_blocks_and_bullets_lists() {
        let text = html_to_text("<div>first</div><ul><li>one</li><li>two</li></ul><div>last</div>");
        assert_eq!(text, "first\n- one\n- two\n\nlast");
    }

    #[test]
    fn entities_are_decoded_once() {
        assert_eq!(html_to_text("a &amp;lt; b &lt; c"), "a &lt; b < c");
    }

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        let long = format!("<div>{}</div>", "word ".repeat(50));
        let preview = preview_text(&long).expect("preview exists");
        assert!(preview.chars().count() <= 100);
        assert!(!preview.contains('\n'));
        assert_eq!(preview_text("<div> </div>"), None);
    }
}
