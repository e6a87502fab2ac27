use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chat_provider::{ChatProvider, ChatStreamRequest, PromptMessage, StreamEvent, StreamId};
use serde_json::Map;
use tracing::{debug, info, warn};

use crate::app::{App, HostOps};
use crate::sink::TranscriptSink;

/// Everything the single consumer applies to the session, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    Stream(StreamEvent),
    ModelsListed(Result<Vec<String>, String>),
    BlobUploaded {
        path: PathBuf,
        result: Result<String, String>,
    },
    Input(String),
    InputClosed,
}

const ERROR_STREAM_ALREADY_ACTIVE: &str = "Stream already active";
const ERROR_SHUTTING_DOWN: &str = "Session is shutting down";

struct ActiveStream {
    stream_id: StreamId,
    join_handle: Option<JoinHandle<()>>,
}

/// Runs provider calls on short-lived worker threads and marshals their outcomes back
/// to the consumer as [`RuntimeEvent`]s.
///
/// Workers never touch `App`; only the thread that owns the event receiver does, via
/// [`RuntimeController::apply_event`]. Once a stop is requested no new worker starts and
/// results from running workers are discarded instead of queued.
pub struct RuntimeController {
    provider: Arc<dyn ChatProvider>,
    events: Sender<RuntimeEvent>,
    next_stream_id: AtomicU64,
    active_stream: Mutex<Option<ActiveStream>>,
    stop_requested: AtomicBool,
}

impl RuntimeController {
    pub fn new(provider: Arc<dyn ChatProvider>) -> (Arc<Self>, Receiver<RuntimeEvent>) {
        let (events, receiver) = mpsc::channel();
        let controller = Arc::new(Self {
            provider,
            events,
            next_stream_id: AtomicU64::new(1),
            active_stream: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
        });

        (controller, receiver)
    }

    /// Returns a sender for producers outside the controller, such as an input reader.
    pub fn sender(&self) -> Sender<RuntimeEvent> {
        self.events.clone()
    }

    /// Applies one event on the consumer thread.
    pub fn apply_event(
        self: &Arc<Self>,
        app: &mut App,
        sink: &mut dyn TranscriptSink,
        event: RuntimeEvent,
    ) {
        let mut host = Arc::clone(self);

        match event {
            RuntimeEvent::Stream(event) => {
                let stream_id = event.stream_id();
                let terminal = event.is_terminal();
                app.on_stream_event(event, sink);
                if terminal {
                    self.clear_active_stream_if_matching(stream_id);
                }
            }
            RuntimeEvent::ModelsListed(result) => app.on_models_listed(result, sink),
            RuntimeEvent::BlobUploaded { path, result } => {
                app.on_blob_uploaded(&path, result, sink);
            }
            RuntimeEvent::Input(line) => {
                app.on_input_replace(line);
                app.on_submit(&mut host, sink);
            }
            RuntimeEvent::InputClosed => app.on_quit(&mut host),
        }
    }

    /// Applies events until the app exits or every sender is gone.
    pub fn run_until_exit(
        self: &Arc<Self>,
        receiver: &Receiver<RuntimeEvent>,
        app: &mut App,
        sink: &mut dyn TranscriptSink,
    ) {
        while !app.should_exit {
            match receiver.recv() {
                Ok(event) => self.apply_event(app, sink, event),
                Err(_) => break,
            }
        }
    }

    /// Applies events until `done` holds or `timeout` elapses. Returns whether `done`
    /// was reached.
    ///
    /// Use this in headless callers and tests that need worker results applied
    /// without running the full event loop.
    pub fn pump_until(
        self: &Arc<Self>,
        receiver: &Receiver<RuntimeEvent>,
        app: &mut App,
        sink: &mut dyn TranscriptSink,
        timeout: Duration,
        done: impl Fn(&App) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;

        while !done(app) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok(event) => self.apply_event(app, sink, event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return done(app);
                }
            }
        }

        true
    }

    fn start_stream_internal(
        self: &Arc<Self>,
        model: String,
        messages: Vec<PromptMessage>,
    ) -> Result<StreamId, String> {
        self.ensure_running()?;
        let mut active_stream = self.lock_active_stream();
        if active_stream.is_some() {
            return Err(ERROR_STREAM_ALREADY_ACTIVE.to_string());
        }

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let request = ChatStreamRequest {
            stream_id,
            model,
            messages,
            params: Map::new(),
        };

        let controller = Arc::clone(self);
        let join_handle = spawn_worker(format!("ollama-chat-stream-{stream_id}"), move || {
            controller.run_stream_worker(request)
        })?;

        *active_stream = Some(ActiveStream {
            stream_id,
            join_handle: Some(join_handle),
        });

        Ok(stream_id)
    }

    fn run_stream_worker(self: Arc<Self>, request: ChatStreamRequest) {
        let stream_id = request.stream_id;
        let terminal_emitted = Arc::new(AtomicBool::new(false));
        let terminal_emitted_for_emit = Arc::clone(&terminal_emitted);
        let controller = Arc::clone(&self);
        let provider = Arc::clone(&self.provider);

        let mut emit = move |event: StreamEvent| {
            if terminal_emitted_for_emit.load(Ordering::SeqCst) {
                warn!(stream_id = event.stream_id(), "dropping event after terminal event");
                return;
            }
            if event.is_terminal() {
                terminal_emitted_for_emit.store(true, Ordering::SeqCst);
            }

            controller.send(RuntimeEvent::Stream(event));
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| provider.chat(request, &mut emit)));

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error.message().to_string()),
            Err(_) => Some("Chat provider panicked".to_string()),
        };

        if terminal_emitted.load(Ordering::SeqCst) {
            return;
        }

        emit(StreamEvent::Failed {
            stream_id,
            error: failure
                .unwrap_or_else(|| "Chat provider exited without terminal event".to_string()),
        });
    }

    fn list_models_internal(self: &Arc<Self>) -> Result<(), String> {
        self.ensure_running()?;
        let controller = Arc::clone(self);
        spawn_worker("ollama-chat-list-models".to_string(), move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| controller.provider.list_models()));
            let result = match outcome {
                Ok(Ok(models)) => Ok(models),
                Ok(Err(error)) => Err(error.message().to_string()),
                Err(_) => Err("Chat provider panicked".to_string()),
            };
            controller.send(RuntimeEvent::ModelsListed(result));
        })
        .map(|_| ())
    }

    fn upload_blob_internal(self: &Arc<Self>, path: PathBuf, bytes: Vec<u8>) -> Result<(), String> {
        self.ensure_running()?;
        let controller = Arc::clone(self);
        spawn_worker("ollama-chat-upload-blob".to_string(), move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| controller.provider.upload_blob(&bytes)));
            let result = match outcome {
                Ok(Ok(digest)) => Ok(digest),
                Ok(Err(error)) => Err(error.message().to_string()),
                Err(_) => Err("Chat provider panicked".to_string()),
            };
            controller.send(RuntimeEvent::BlobUploaded { path, result });
        })
        .map(|_| ())
    }

    fn is_stopping(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), String> {
        if self.is_stopping() {
            return Err(ERROR_SHUTTING_DOWN.to_string());
        }
        Ok(())
    }

    fn send(&self, event: RuntimeEvent) {
        if self.is_stopping() {
            debug!("stop requested; discarding worker event");
            return;
        }
        if self.events.send(event).is_err() {
            debug!("event receiver dropped; discarding worker event");
        }
    }

    fn clear_active_stream_if_matching(&self, stream_id: StreamId) {
        let mut active_stream = self.lock_active_stream();
        let matches = active_stream.as_ref().map(|active| active.stream_id) == Some(stream_id);
        if !matches {
            return;
        }

        let Some(mut completed) = active_stream.take() else {
            return;
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn lock_active_stream(&self) -> MutexGuard<'_, Option<ActiveStream>> {
        lock_unpoisoned(&self.active_stream)
    }
}

impl HostOps for Arc<RuntimeController> {
    fn start_stream(
        &mut self,
        model: String,
        messages: Vec<PromptMessage>,
    ) -> Result<StreamId, String> {
        self.start_stream_internal(model, messages)
    }

    fn list_models(&mut self) -> Result<(), String> {
        self.list_models_internal()
    }

    fn upload_blob(&mut self, path: PathBuf, bytes: Vec<u8>) -> Result<(), String> {
        self.upload_blob_internal(path, bytes)
    }

    fn request_stop(&mut self) {
        info!("stop requested");
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}

fn spawn_worker(
    name: String,
    work: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, String> {
    debug!(worker = %name, "spawning worker");
    thread::Builder::new()
        .name(name)
        .spawn(work)
        .map_err(|error| format!("Failed to spawn worker: {error}"))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
