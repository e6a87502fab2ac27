//! Transcript rendering surface.
//!
//! The session controller drives a [`TranscriptSink`] and never reads back from it;
//! the conversation store stays authoritative.

use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

/// Text shown for an assistant turn before its first fragment is rendered.
pub const ASSISTANT_PLACEHOLDER: &str = "…";

/// Identifies the open assistant turn on a sink. Only the sink that issued a handle
/// can interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssistantHandle(u64);

impl AssistantHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible dialog: warnings for rejected input, errors for failed operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

pub trait TranscriptSink {
    fn show_user_turn(&mut self, text: &str);

    /// Renders an empty assistant turn showing [`ASSISTANT_PLACEHOLDER`] and returns
    /// its handle.
    fn show_assistant_placeholder(&mut self) -> AssistantHandle;

    /// Replaces the whole displayed text of the open assistant turn.
    fn replace_assistant_display(&mut self, handle: AssistantHandle, text: &str);

    /// Marks the open assistant turn as complete. No further replacements follow.
    fn close_assistant_display(&mut self, _handle: AssistantHandle) {}

    /// Renders a finished assistant turn during replay.
    fn show_assistant_turn(&mut self, text: &str);

    fn show_image_turn(&mut self, path: &Path, caption: &str);

    fn clear(&mut self);

    fn notify(&mut self, notice: Notice);

    fn show_models(&mut self, models: &[String]);

    fn show_active_model(&mut self, model: &str);
}

#[derive(Debug)]
struct OpenAssistant {
    handle: AssistantHandle,
    shown: String,
    /// Other output was printed after the turn, so its line is no longer the last one.
    interrupted: bool,
}

/// Line-oriented sink for a plain terminal.
///
/// A terminal cannot rewrite earlier output, so a replacement that extends the shown
/// text prints only the new suffix. A replacement that diverges, or that follows other
/// output such as a notice, reprints the turn. Only closing the turn or clearing the
/// screen retires its handle.
pub struct ConsoleSink<W: Write> {
    out: W,
    next_handle: u64,
    open: Option<OpenAssistant>,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            next_handle: 1,
            open: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(error) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            warn!(%error, "failed to write transcript output");
        }
    }

    /// Moves output below the open assistant line while keeping the turn open.
    fn interrupt_open_line(&mut self) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if !open.interrupted {
            open.interrupted = true;
            self.write("\n");
        }
    }

    fn end_open_line(&mut self) {
        if let Some(open) = self.open.take() {
            if !open.interrupted {
                self.write("\n");
            }
        }
    }
}

impl<W: Write> TranscriptSink for ConsoleSink<W> {
    fn show_user_turn(&mut self, text: &str) {
        self.interrupt_open_line();
        self.write(&format!("\nYou: {text}\n"));
    }

    fn show_assistant_placeholder(&mut self) -> AssistantHandle {
        self.end_open_line();
        let handle = AssistantHandle::new(self.next_handle);
        self.next_handle += 1;
        self.write(&format!("\nAssistant: {ASSISTANT_PLACEHOLDER}"));
        self.open = Some(OpenAssistant {
            handle,
            shown: ASSISTANT_PLACEHOLDER.to_string(),
            interrupted: false,
        });
        handle
    }

    fn replace_assistant_display(&mut self, handle: AssistantHandle, text: &str) {
        let Some(open) = self.open.as_mut().filter(|open| open.handle == handle) else {
            return;
        };

        let output = if open.interrupted {
            format!("Assistant: {text}")
        } else if open.shown == ASSISTANT_PLACEHOLDER {
            // Backspace over the placeholder glyph.
            format!("\u{8} \u{8}{text}")
        } else if let Some(suffix) = text.strip_prefix(open.shown.as_str()) {
            suffix.to_string()
        } else {
            format!("\nAssistant: {text}")
        };
        open.shown = text.to_string();
        open.interrupted = false;

        self.write(&output);
    }

    fn close_assistant_display(&mut self, handle: AssistantHandle) {
        if self.open.as_ref().is_some_and(|open| open.handle == handle) {
            self.end_open_line();
        }
    }

    fn show_assistant_turn(&mut self, text: &str) {
        self.interrupt_open_line();
        self.write(&format!("\nAssistant: {text}\n"));
    }

    fn show_image_turn(&mut self, path: &Path, caption: &str) {
        self.interrupt_open_line();
        self.write(&format!("\n[{caption}: {}]\n", path.display()));
    }

    fn clear(&mut self) {
        self.open = None;
        self.write("\x1b[2J\x1b[H");
    }

    fn notify(&mut self, notice: Notice) {
        self.interrupt_open_line();
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        self.write(&format!("[{tag}] {}: {}\n", notice.title, notice.message));
    }

    fn show_models(&mut self, models: &[String]) {
        self.interrupt_open_line();
        let mut listing = String::from("Models:\n");
        for model in models {
            listing.push_str("  ");
            listing.push_str(model);
            listing.push('\n');
        }
        self.write(&listing);
    }

    fn show_active_model(&mut self, model: &str) {
        self.interrupt_open_line();
        self.write(&format!("Model: {model}\n"));
    }
}
