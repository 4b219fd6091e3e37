//! Unit tests for the bounded, non-blocking event sink.

use agent_switchboard::adapter::EventSink;
use agent_switchboard::models::event::{AgentEvent, EventType};

#[tokio::test]
async fn emitted_events_arrive_in_order() {
    let (sink, mut rx) = EventSink::channel(4);

    assert!(sink.emit(AgentEvent::message_chunk("s", "a")));
    assert!(sink.emit(AgentEvent::message_chunk("s", "b")));

    let first = rx.recv().await.expect("first");
    let second = rx.recv().await.expect("second");
    assert_eq!(first.text.as_deref(), Some("a"));
    assert_eq!(second.text.as_deref(), Some("b"));
}

#[tokio::test]
async fn full_channel_drops_without_blocking() {
    let (sink, mut rx) = EventSink::channel(1);

    assert!(sink.emit(AgentEvent::message_chunk("s", "kept")));
    assert!(!sink.emit(AgentEvent::message_chunk("s", "dropped")));

    let kept = rx.recv().await.expect("kept event");
    assert_eq!(kept.text.as_deref(), Some("kept"));
    assert!(rx.try_recv().is_err(), "dropped event must not be queued");
}

#[tokio::test]
async fn close_is_idempotent_and_ends_the_stream() {
    let (mut sink, mut rx) = EventSink::channel(4);
    assert!(sink.emit(AgentEvent::complete("s")));

    assert!(sink.close());
    assert!(!sink.close(), "second close reports nothing to do");
    assert!(sink.is_closed());
    assert!(!sink.emit(AgentEvent::complete("s")));

    let queued = rx.recv().await.expect("queued before close");
    assert_eq!(queued.event_type, EventType::Complete);
    assert!(rx.recv().await.is_none(), "stream ends after close");
}

#[test]
fn dropped_receiver_discards_quietly() {
    let (sink, rx) = EventSink::channel(4);
    drop(rx);

    assert!(!sink.emit(AgentEvent::complete("s")));
}
