use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread;

use ollama_chat::app::App;
use ollama_chat::config::ChatConfig;
use ollama_chat::providers;
use ollama_chat::runtime::{RuntimeController, RuntimeEvent};
use ollama_chat::sink::{ConsoleSink, Notice, TranscriptSink};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ollama_chat=info,ollama_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = ChatConfig::from_env().map_err(io::Error::other)?;
    let provider = providers::provider_for_config(&config).map_err(io::Error::other)?;
    let profile = provider.profile();
    info!(provider = %profile.provider_id, endpoint = %profile.endpoint, "provider ready");

    let (controller, events) = RuntimeController::new(provider);
    spawn_input_reader(controller.sender())?;

    let mut app = App::with_system_instructions(Some(config.system_instructions));
    let mut sink = ConsoleSink::stdout();
    let mut host = controller.clone();

    sink.notify(Notice::info(
        "ollama_chat",
        format!(
            "Using {} at {}. Type /help for commands.",
            profile.provider_id, profile.endpoint
        ),
    ));
    app.refresh_models(&mut host, &mut sink);

    controller.run_until_exit(&events, &mut app, &mut sink);
    Ok(())
}

fn spawn_input_reader(events: Sender<RuntimeEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("ollama-chat-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        warn!(%error, "failed to read input");
                        break;
                    }
                };
                if events.send(RuntimeEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = events.send(RuntimeEvent::InputClosed);
        })
        .map(|_| ())
}
