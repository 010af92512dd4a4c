//! Capability seams for the editing surface and ambient playback.
//!
//! # Responsibility
//! - Keep the session controller independent of any rich-text engine.
//! - Provide a small HTML buffer editor for headless front-ends.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque formatting command forwarded to the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    BulletList,
}

impl FormatCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::BulletList => "bullet_list",
        }
    }
}

/// Rich-text editing surface owned by a writing session.
pub trait EditorSurface {
    fn apply_format_command(&mut self, command: FormatCommand);
    /// Current body serialized as markup.
    fn serialized_content(&self) -> String;
}

/// Ambient playback failure, e.g. blocked by an autoplay policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackError(pub String);

impl Display for PlaybackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ambient playback failed: {}", self.0)
    }
}

impl Error for PlaybackError {}

/// Ambient sound loop played while writing.
pub trait AmbientPlayer {
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
}

/// Player for front-ends without audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl AmbientPlayer for Silence {
    fn play(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn pause(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Paragraph(String),
    ListItem(String),
}

/// Line-oriented HTML editor: each appended line becomes a paragraph or a
/// list item, styled by the toggles active when it was appended.
#[derive(Debug, Clone, Default)]
pub struct HtmlBufferEditor {
    blocks: Vec<Block>,
    bold: bool,
    italic: bool,
    list: bool,
}

impl HtmlBufferEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one line of plain text. Markup characters are escaped.
    pub fn append_line(&mut self, text: &str) {
        let mut inline = escape_html(text);
        if self.italic {
            inline = format!("<i>{inline}</i>");
        }
        if self.bold {
            inline = format!("<b>{inline}</b>");
        }
        self.blocks.push(if self.list {
            Block::ListItem(inline)
        } else {
            Block::Paragraph(inline)
        });
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn active_formats(&self) -> Vec<FormatCommand> {
        [
            (self.bold, FormatCommand::Bold),
            (self.italic, FormatCommand::Italic),
            (self.list, FormatCommand::BulletList),
        ]
        .into_iter()
        .filter_map(|(active, command)| active.then_some(command))
        .collect()
    }
}

impl EditorSurface for HtmlBufferEditor {
    fn apply_format_command(&mut self, command: FormatCommand) {
        match command {
            FormatCommand::Bold => self.bold = !self.bold,
            FormatCommand::Italic => self.italic = !self.italic,
            FormatCommand::BulletList => self.list = !self.list,
        }
    }

    fn serialized_content(&self) -> String {
        let mut html = String::new();
        let mut in_list = false;
        for block in &self.blocks {
            match block {
                Block::ListItem(inline) => {
                    if !in_list {
                        html.push_str("<ul>");
                        in_list = true;
                    }
                    html.push_str(&format!("<li>{inline}</li>"));
                }
                Block::Paragraph(inline) => {
                    if in_list {
                        html.push_str("</ul>");
                        in_list = false;
                    }
                    html.push_str(&format!("<div>{inline}</div>"));
                }
            }
        }
        if in_list {
            html.push_str("</ul>");
        }
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
