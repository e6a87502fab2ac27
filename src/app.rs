use std::path::{Path, PathBuf};

use chat_provider::{PromptMessage, StreamEvent, StreamId};
use tracing::{debug, info, warn};

use crate::attachment::{encode_attachment, read_attachment};
use crate::commands::{parse_control_token, parse_slash_command, ControlToken, SlashCommand};
use crate::config::DEFAULT_SYSTEM_INSTRUCTIONS;
use crate::sink::{AssistantHandle, Notice, TranscriptSink};
use crate::store::{ConversationStore, Turn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Sending,
    Streaming { stream_id: StreamId },
    Exiting,
}

/// Send gate toggled by the start/stop control tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Started,
    Stopped,
}

/// Everything the controller owns about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub run_state: RunState,
    pub active_model: Option<String>,
    pub conversations: ConversationStore,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            run_state: RunState::Started,
            active_model: None,
            conversations: ConversationStore::new(),
        }
    }
}

/// The assistant reply currently being received.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenStream {
    stream_id: StreamId,
    model: String,
    accumulated: String,
    handle: Option<AssistantHandle>,
}

pub trait HostOps {
    fn start_stream(
        &mut self,
        model: String,
        messages: Vec<PromptMessage>,
    ) -> Result<StreamId, String>;
    fn list_models(&mut self) -> Result<(), String>;
    fn upload_blob(&mut self, path: PathBuf, bytes: Vec<u8>) -> Result<(), String>;
    /// Called once on quit. Later host calls fail and pending worker results are dropped.
    fn request_stop(&mut self);
}

const HELP_TEXT: &str = "Commands: /help, /models, /model <name>, /attach <path>, /upload <path>, /quit. \
     Send § to clear the conversation, ■ to stop the model and ▶ to start it again.";
const IMAGE_ATTACHED_CAPTION: &str = "Image attached";
const IMAGE_ONLY_USER_TEXT: &str = "Sent an image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub mode: Mode,
    pub input: String,
    pub should_exit: bool,
    state: SessionState,
    models: Vec<String>,
    attachment: Option<PathBuf>,
    open_stream: Option<OpenStream>,
    system_instructions: String,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_system_instructions(None)
    }

    pub fn with_system_instructions(system_instructions: Option<String>) -> Self {
        let system_instructions = system_instructions
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTIONS.to_string());

        Self {
            mode: Mode::Idle,
            input: String::new(),
            should_exit: false,
            state: SessionState::default(),
            models: Vec::new(),
            attachment: None,
            open_stream: None,
            system_instructions,
        }
    }

    pub fn system_instructions(&self) -> &str {
        &self.system_instructions
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    pub fn active_model(&self) -> Option<&str> {
        self.state.active_model.as_deref()
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.state.conversations
    }

    /// Model identifiers from the most recent successful listing.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn pending_attachment(&self) -> Option<&Path> {
        self.attachment.as_deref()
    }

    /// Text received so far for the stream in flight, if any.
    pub fn streaming_text(&self) -> Option<&str> {
        self.open_stream
            .as_ref()
            .map(|stream| stream.accumulated.as_str())
    }

    pub fn on_input_replace(&mut self, text: String) {
        self.input = text;
    }

    pub fn on_submit(&mut self, host: &mut dyn HostOps, sink: &mut dyn TranscriptSink) {
        if let Some(command) = parse_slash_command(&self.input) {
            self.input.clear();
            self.on_slash_command(command, host, sink);
            return;
        }

        let Some(model) = self.state.active_model.clone() else {
            sink.notify(Notice::warning(
                "No model",
                "Select a model with /model <name> before sending.",
            ));
            return;
        };

        let text = self.input.trim().to_string();
        let has_attachment = self.attachment.is_some();

        if text.is_empty() && !has_attachment {
            sink.notify(Notice::warning("Empty", "Write a message or attach an image."));
            return;
        }

        if !has_attachment {
            if let Some(token) = parse_control_token(&text) {
                self.input.clear();
                self.on_control_token(token, sink);
                return;
            }
        }

        if self.state.run_state == RunState::Stopped {
            sink.notify(Notice::warning(
                "Model stopped",
                "Model is stopped. Send ▶ to start it.",
            ));
            return;
        }

        if matches!(self.mode, Mode::Streaming { .. }) {
            sink.notify(Notice::info(
                "Busy",
                "A reply is still streaming. Wait for it to finish before sending.",
            ));
            return;
        }

        self.mode = Mode::Sending;

        let images = match self.attachment.as_deref().map(encode_attachment) {
            Some(Ok(encoded)) => vec![encoded],
            Some(Err(error)) => {
                self.mode = Mode::Idle;
                sink.notify(Notice::error("Image error", error.to_string()));
                return;
            }
            None => Vec::new(),
        };

        let messages = self.request_messages(&text, images);
        let shown = if text.is_empty() {
            IMAGE_ONLY_USER_TEXT.to_string()
        } else {
            text
        };

        self.state
            .conversations
            .append(&model, Turn::User(shown.clone()));
        sink.show_user_turn(&shown);
        self.input.clear();
        self.attachment = None;

        match host.start_stream(model.clone(), messages) {
            Ok(stream_id) => {
                debug!(stream_id, %model, "stream started");
                self.mode = Mode::Streaming { stream_id };
                self.open_stream = Some(OpenStream {
                    stream_id,
                    model,
                    accumulated: String::new(),
                    handle: None,
                });
            }
            Err(error) => {
                self.mode = Mode::Idle;
                sink.notify(Notice::error(
                    "Chat failed",
                    format!("Failed to start stream: {error}"),
                ));
            }
        }
    }

    /// Makes `model` active and replays its stored conversation into the sink.
    ///
    /// A stream in flight keeps accumulating for the model it was started for and is
    /// displayed again once that model is active.
    pub fn select_model(&mut self, model: &str, sink: &mut dyn TranscriptSink) {
        let model = model.trim();
        if model.is_empty() {
            sink.notify(Notice::warning("No model", "Model name must not be empty."));
            return;
        }

        info!(%model, "model selected");
        if !self.models().is_empty() && !self.models().iter().any(|listed| listed == model) {
            warn!(%model, "selected model is not in the last server listing");
        }
        self.state.active_model = Some(model.to_string());
        sink.clear();
        sink.show_active_model(model);

        for turn in self.state.conversations.turns_for(model) {
            match turn {
                Turn::User(text) => sink.show_user_turn(text),
                Turn::Assistant(text) => sink.show_assistant_turn(text),
                Turn::Image { path, caption } => sink.show_image_turn(path, caption),
            }
        }

        if let Some(stream) = self.open_stream.as_mut() {
            stream.handle = None;
            if stream.model == model && !stream.accumulated.is_empty() {
                let handle = sink.show_assistant_placeholder();
                sink.replace_assistant_display(handle, &stream.accumulated);
                stream.handle = Some(handle);
            }
        }
    }

    /// Records `path` as the pending attachment for the next send.
    pub fn attach_image(&mut self, path: PathBuf, sink: &mut dyn TranscriptSink) {
        match self.state.active_model.as_deref() {
            Some(model) => {
                self.state.conversations.append(
                    model,
                    Turn::Image {
                        path: path.clone(),
                        caption: IMAGE_ATTACHED_CAPTION.to_string(),
                    },
                );
                sink.show_image_turn(&path, IMAGE_ATTACHED_CAPTION);
            }
            None => sink.notify(Notice::info(
                "Attached",
                format!("Image selected: {}", path.display()),
            )),
        }

        self.attachment = Some(path);
    }

    pub fn refresh_models(&mut self, host: &mut dyn HostOps, sink: &mut dyn TranscriptSink) {
        if let Err(error) = host.list_models() {
            sink.notify(Notice::error(
                "Error",
                format!("Failed to list models: {error}"),
            ));
        }
    }

    pub fn upload_blob(
        &mut self,
        path: PathBuf,
        host: &mut dyn HostOps,
        sink: &mut dyn TranscriptSink,
    ) {
        let bytes = match read_attachment(&path) {
            Ok(bytes) => bytes,
            Err(error) => {
                sink.notify(Notice::error("Upload failed", error.to_string()));
                return;
            }
        };

        if let Err(error) = host.upload_blob(path, bytes) {
            sink.notify(Notice::error("Upload failed", error));
        }
    }

    pub fn on_models_listed(
        &mut self,
        result: Result<Vec<String>, String>,
        sink: &mut dyn TranscriptSink,
    ) {
        match result {
            Ok(models) => {
                if models.is_empty() {
                    sink.notify(Notice::info("Models", "The server reported no models."));
                } else {
                    sink.show_models(&models);
                }
                self.models = models;
            }
            Err(error) => sink.notify(Notice::error(
                "Error",
                format!("Failed to list models: {error}"),
            )),
        }
    }

    pub fn on_blob_uploaded(
        &mut self,
        path: &Path,
        result: Result<String, String>,
        sink: &mut dyn TranscriptSink,
    ) {
        match result {
            Ok(digest) => sink.notify(Notice::info(
                "Uploaded",
                format!("{} stored as {digest}", path.display()),
            )),
            Err(error) => sink.notify(Notice::error(
                "Upload failed",
                format!("{}: {error}", path.display()),
            )),
        }
    }

    pub fn on_stream_event(&mut self, event: StreamEvent, sink: &mut dyn TranscriptSink) {
        if self.should_exit || !self.is_open_stream(event.stream_id()) {
            debug!(stream_id = event.stream_id(), "ignoring event for inactive stream");
            return;
        }

        match event {
            StreamEvent::Fragment { text, .. } => self.on_stream_fragment(&text, sink),
            StreamEvent::Ended { .. } => self.on_stream_ended(sink),
            StreamEvent::Failed { error, .. } => self.on_stream_failed(&error, sink),
        }
    }

    pub fn on_quit(&mut self, host: &mut dyn HostOps) {
        self.mode = Mode::Exiting;
        self.should_exit = true;
        host.request_stop();
    }

    fn on_stream_fragment(&mut self, fragment: &str, sink: &mut dyn TranscriptSink) {
        let active_model = self.state.active_model.as_deref();
        let Some(stream) = self.open_stream.as_mut() else {
            return;
        };

        stream.accumulated.push_str(fragment);

        if active_model != Some(stream.model.as_str()) {
            return;
        }

        let handle = *stream
            .handle
            .get_or_insert_with(|| sink.show_assistant_placeholder());
        sink.replace_assistant_display(handle, &stream.accumulated);
    }

    fn on_stream_ended(&mut self, sink: &mut dyn TranscriptSink) {
        let Some(stream) = self.open_stream.take() else {
            return;
        };
        self.mode = Mode::Idle;

        if let Some(handle) = stream.handle {
            sink.close_assistant_display(handle);
        }

        let final_text = stream.accumulated.trim();
        if final_text.is_empty() {
            debug!(stream_id = stream.stream_id, "stream ended without text");
            return;
        }

        self.state
            .conversations
            .append(&stream.model, Turn::Assistant(final_text.to_string()));
        debug!(stream_id = stream.stream_id, model = %stream.model, "assistant turn committed");
    }

    fn on_stream_failed(&mut self, error: &str, sink: &mut dyn TranscriptSink) {
        let Some(stream) = self.open_stream.take() else {
            return;
        };
        self.mode = Mode::Idle;

        if let Some(handle) = stream.handle {
            sink.close_assistant_display(handle);
        }

        sink.notify(Notice::error("Chat failed", error));
    }

    fn on_slash_command(
        &mut self,
        command: SlashCommand,
        host: &mut dyn HostOps,
        sink: &mut dyn TranscriptSink,
    ) {
        match command {
            SlashCommand::Help => sink.notify(Notice::info("Help", HELP_TEXT)),
            SlashCommand::Models => self.refresh_models(host, sink),
            SlashCommand::Model(model) => self.select_model(&model, sink),
            SlashCommand::Attach(path) => self.attach_image(path, sink),
            SlashCommand::Upload(path) => self.upload_blob(path, host, sink),
            SlashCommand::Quit => self.on_quit(host),
            SlashCommand::MissingArgument(command) => sink.notify(Notice::warning(
                "Missing argument",
                format!("{command} needs an argument. Type /help for usage."),
            )),
            SlashCommand::Unknown(command) => sink.notify(Notice::warning(
                "Unknown command",
                format!("Unknown command: {command}"),
            )),
        }
    }

    fn on_control_token(&mut self, token: ControlToken, sink: &mut dyn TranscriptSink) {
        match token {
            ControlToken::Clear => {
                let Some(model) = self.state.active_model.clone() else {
                    return;
                };
                self.state.conversations.clear(&model);
                if let Some(stream) = self.open_stream.as_mut() {
                    stream.handle = None;
                }
                sink.clear();
                info!(%model, "conversation cleared");
                sink.notify(Notice::info(
                    "Clear",
                    format!("Cleared history for model: {model}"),
                ));
            }
            ControlToken::Start => {
                if self.state.run_state == RunState::Started {
                    sink.notify(Notice::info("Model", "Model already running."));
                    return;
                }
                self.state.run_state = RunState::Started;
                info!("model started");
                sink.notify(Notice::info("Model", "Model started."));
            }
            ControlToken::Stop => {
                if self.state.run_state == RunState::Stopped {
                    sink.notify(Notice::info("Model", "Model already stopped."));
                    return;
                }
                self.state.run_state = RunState::Stopped;
                info!("model stopped");
                sink.notify(Notice::info(
                    "Model",
                    "Model stopped. Sending is disabled until ▶ starts it again.",
                ));
            }
        }
    }

    /// Each request stands alone: the system instruction, then the new user message.
    /// Stored turns are for display only and are never replayed to the server.
    fn request_messages(&self, text: &str, images: Vec<String>) -> Vec<PromptMessage> {
        vec![
            PromptMessage::system(self.system_instructions.clone()),
            PromptMessage::user(text).with_images(images),
        ]
    }

    fn is_open_stream(&self, stream_id: StreamId) -> bool {
        self.open_stream
            .as_ref()
            .is_some_and(|stream| stream.stream_id == stream_id)
    }
}
