mod support;

use chat_provider::StreamEvent;
use ollama_chat::app::{App, Mode};
use ollama_chat::sink::ConsoleSink;
use ollama_chat::store::Turn;
use pretty_assertions::assert_eq;
use support::HostSpy;

fn fragment(text: &str) -> StreamEvent {
    StreamEvent::Fragment {
        stream_id: 1,
        text: text.to_string(),
    }
}

#[test]
fn reply_keeps_rendering_after_a_busy_notice_mid_stream() {
    let mut sink = ConsoleSink::new(Vec::new());
    let mut host = HostSpy::with_next_stream_id(1);
    let mut app = App::new();

    app.select_model("m1", &mut sink);
    app.on_input_replace("hi".to_string());
    app.on_submit(&mut host, &mut sink);
    app.on_stream_event(fragment("Hel"), &mut sink);

    app.on_input_replace("again".to_string());
    app.on_submit(&mut host, &mut sink);
    assert_eq!(app.mode, Mode::Streaming { stream_id: 1 });

    app.on_stream_event(fragment("lo WORLD"), &mut sink);
    app.on_stream_event(StreamEvent::Ended { stream_id: 1 }, &mut sink);

    let out = String::from_utf8(sink.into_inner()).expect("console output is UTF-8");
    let busy = out.find("[info] Busy:").expect("busy notice rendered");
    let reprinted = out.rfind("Assistant: Hello WORLD").expect("reply reprinted");
    assert!(reprinted > busy, "reply continues below the notice: {out:?}");
    assert!(out.ends_with("Assistant: Hello WORLD\n"));
    assert_eq!(
        app.conversations().turns_for("m1"),
        &[
            Turn::User("hi".to_string()),
            Turn::Assistant("Hello WORLD".to_string()),
        ]
    );
}

#[test]
fn listing_mid_stream_does_not_freeze_the_reply() {
    let mut sink = ConsoleSink::new(Vec::new());
    let mut host = HostSpy::with_next_stream_id(1);
    let mut app = App::new();

    app.select_model("m1", &mut sink);
    app.on_input_replace("hi".to_string());
    app.on_submit(&mut host, &mut sink);
    app.on_stream_event(fragment("one "), &mut sink);
    app.on_models_listed(Ok(vec!["m1".to_string(), "m2".to_string()]), &mut sink);
    app.on_stream_event(fragment("two "), &mut sink);
    app.on_stream_event(fragment("three"), &mut sink);
    app.on_stream_event(StreamEvent::Ended { stream_id: 1 }, &mut sink);

    let out = String::from_utf8(sink.into_inner()).expect("console output is UTF-8");
    assert!(
        out.ends_with("Models:\n  m1\n  m2\nAssistant: one two three\n"),
        "unexpected transcript: {out:?}"
    );
}
