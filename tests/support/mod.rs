#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chat_provider::{PromptMessage, StreamId};
use ollama_chat::app::HostOps;
use ollama_chat::sink::{AssistantHandle, Notice, NoticeLevel, TranscriptSink, ASSISTANT_PLACEHOLDER};

/// One call observed by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOp {
    User(String),
    Placeholder(AssistantHandle),
    Replace(AssistantHandle, String),
    Close(AssistantHandle),
    Assistant(String),
    Image(PathBuf, String),
    Clear,
    Notice(Notice),
    Models(Vec<String>),
    ActiveModel(String),
}

/// Records every sink call and keeps a rendered view of the visible transcript.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub ops: Vec<SinkOp>,
    pub lines: Vec<String>,
    next_handle: u64,
    open: Option<(AssistantHandle, usize)>,
}

impl RecordingSink {
    pub fn notices(&self) -> Vec<&Notice> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SinkOp::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices().last().copied()
    }

    pub fn notice_count(&self, level: NoticeLevel) -> usize {
        self.notices()
            .iter()
            .filter(|notice| notice.level == level)
            .count()
    }

    pub fn replacements(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SinkOp::Replace(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn placeholder_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SinkOp::Placeholder(_)))
            .count()
    }
}

impl TranscriptSink for RecordingSink {
    fn show_user_turn(&mut self, text: &str) {
        self.ops.push(SinkOp::User(text.to_string()));
        self.lines.push(format!("user: {text}"));
    }

    fn show_assistant_placeholder(&mut self) -> AssistantHandle {
        self.next_handle += 1;
        let handle = AssistantHandle::new(self.next_handle);
        self.ops.push(SinkOp::Placeholder(handle));
        self.lines
            .push(format!("assistant: {ASSISTANT_PLACEHOLDER}"));
        self.open = Some((handle, self.lines.len() - 1));
        handle
    }

    fn replace_assistant_display(&mut self, handle: AssistantHandle, text: &str) {
        self.ops.push(SinkOp::Replace(handle, text.to_string()));
        if let Some((open, index)) = self.open {
            if open == handle {
                self.lines[index] = format!("assistant: {text}");
            }
        }
    }

    fn close_assistant_display(&mut self, handle: AssistantHandle) {
        self.ops.push(SinkOp::Close(handle));
        if self.open.is_some_and(|(open, _)| open == handle) {
            self.open = None;
        }
    }

    fn show_assistant_turn(&mut self, text: &str) {
        self.ops.push(SinkOp::Assistant(text.to_string()));
        self.lines.push(format!("assistant: {text}"));
    }

    fn show_image_turn(&mut self, path: &Path, caption: &str) {
        self.ops
            .push(SinkOp::Image(path.to_path_buf(), caption.to_string()));
        self.lines
            .push(format!("image: {caption} ({})", path.display()));
    }

    fn clear(&mut self) {
        self.ops.push(SinkOp::Clear);
        self.lines.clear();
        self.open = None;
    }

    fn notify(&mut self, notice: Notice) {
        self.ops.push(SinkOp::Notice(notice));
    }

    fn show_models(&mut self, models: &[String]) {
        self.ops.push(SinkOp::Models(models.to_vec()));
    }

    fn show_active_model(&mut self, model: &str) {
        self.ops.push(SinkOp::ActiveModel(model.to_string()));
    }
}

/// Host that records requests instead of starting workers.
#[derive(Default)]
pub struct HostSpy {
    pub next_stream_id: StreamId,
    pub started_streams: Vec<(String, Vec<PromptMessage>)>,
    pub list_requests: usize,
    pub uploads: Vec<(PathBuf, Vec<u8>)>,
    pub stop_requests: usize,
    pub fail_start: Option<String>,
}

impl HostSpy {
    pub fn with_next_stream_id(stream_id: StreamId) -> Self {
        Self {
            next_stream_id: stream_id,
            ..Self::default()
        }
    }
}

impl HostOps for HostSpy {
    fn start_stream(
        &mut self,
        model: String,
        messages: Vec<PromptMessage>,
    ) -> Result<StreamId, String> {
        if let Some(error) = self.fail_start.clone() {
            return Err(error);
        }

        self.started_streams.push((model, messages));
        let stream_id = self.next_stream_id;
        self.next_stream_id += 1;
        Ok(stream_id)
    }

    fn list_models(&mut self) -> Result<(), String> {
        self.list_requests += 1;
        Ok(())
    }

    fn upload_blob(&mut self, path: PathBuf, bytes: Vec<u8>) -> Result<(), String> {
        self.uploads.push((path, bytes));
        Ok(())
    }

    fn request_stop(&mut self) {
        self.stop_requests += 1;
    }
}
