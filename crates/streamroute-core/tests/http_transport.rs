mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{recording_notifier, recording_registry, set, Journal};
use streamroute_core::protocol::{done_event, ServerSentEvent};
use streamroute_core::transport::HttpTransport;
use streamroute_core::{
    Connection, Envelope, HttpSettings, PropsUpdate, SessionController, SessionProps, StreamOptions,
    Transport, TransportError, TransportEvent,
};

fn event_stream(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn collect(mut rx: mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        let end = matches!(event, TransportEvent::Error(_));
        events.push(event);
        if end {
            break;
        }
    }
    events
}

#[tokio::test]
async fn test_delivers_messages_in_order() {
    let server = MockServer::start().await;
    let body = [
        ": comment\n\n".to_string(),
        ServerSentEvent::new("one").encode(),
        ServerSentEvent::new("two").with_event("progress").encode(),
        ServerSentEvent::new("three\nlines").with_id("3").encode(),
        done_event().encode(),
    ]
    .concat();
    Mock::given(method("GET"))
        .and(path("/stream"))
        .and(header("accept", "text/event-stream"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpSettings::default()).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let _connection = transport
        .open(
            &format!("{}/stream", server.uri()),
            &StreamOptions::default(),
            tx,
        )
        .unwrap();

    assert_eq!(
        collect(rx).await,
        vec![
            TransportEvent::Message("one".to_string()),
            TransportEvent::Message("three\nlines".to_string()),
            TransportEvent::Message("[DONE]".to_string()),
            TransportEvent::Error(TransportError::Closed),
        ]
    );
}

#[tokio::test]
async fn test_sends_method_headers_and_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash_update_component_sse"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#"{"content":{"n":1}}"#))
        .respond_with(event_stream(ServerSentEvent::new("ok").encode()))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpSettings {
        base_url: Some(server.uri()),
        ..Default::default()
    })
    .unwrap();
    let options = StreamOptions::default()
        .with_method("post")
        .with_header("Content-Type", "application/json")
        .with_payload(r#"{"content":{"n":1}}"#);
    let (tx, rx) = mpsc::unbounded_channel();
    let _connection = transport
        .open("/dash_update_component_sse", &options, tx)
        .unwrap();

    assert_eq!(
        collect(rx).await.first(),
        Some(&TransportEvent::Message("ok".to_string()))
    );
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(path("/stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpSettings::default()).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let _connection = transport
        .open(
            &format!("{}/stream", server.uri()),
            &StreamOptions::default(),
            tx,
        )
        .unwrap();

    assert_eq!(
        collect(rx).await,
        vec![TransportEvent::Error(TransportError::Status { status: 503 })]
    );
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(path("/stream"))
        .respond_with(event_stream(ServerSentEvent::new("x").encode()))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpSettings::default()).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut connection = transport
        .open(
            &format!("{}/stream", server.uri()),
            &StreamOptions::default(),
            tx,
        )
        .unwrap();
    assert!(!connection.is_closed());
    connection.close();
    connection.close();
    assert!(connection.is_closed());
}

#[tokio::test]
async fn test_session_routes_updates_from_http_stream() {
    let server = MockServer::start().await;
    let patch = |value: serde_json::Value| value.as_object().cloned().unwrap();
    let body = [
        Envelope::single("status", patch(json!({"children": "working"}))).to_event(),
        ServerSentEvent::new("not json"),
        Envelope::batch([
            PropsUpdate::new("progress", patch(json!({"value": 50}))),
            PropsUpdate::new("status", patch(json!({"children": "half way"}))),
        ])
        .to_event(),
        done_event(),
    ]
    .iter()
    .map(ServerSentEvent::encode)
    .collect::<String>();
    Mock::given(path("/stream"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;

    let journal = Journal::default();
    let controller = SessionController::new(
        Arc::new(HttpTransport::new(&HttpSettings::default()).unwrap()),
        Arc::new(recording_registry(journal.clone())),
        Arc::new(recording_notifier(journal.clone())),
    );
    let mut output = controller.subscribe();
    let (props_tx, props_rx) = watch::channel(
        SessionProps::new(format!("{}/stream", server.uri()))
            .with_routing(true)
            .with_concat(false),
    );
    let task = tokio::spawn(controller.run(props_rx));

    let state = tokio::time::timeout(Duration::from_secs(5), output.wait_for(|s| s.done))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert!(state.value.starts_with(r#"["[BATCH]""#));

    assert_eq!(
        journal.set_props_calls(),
        vec![
            set("status", json!({"children": "working"})),
            set("progress", json!({"value": 50})),
            set("status", json!({"children": "half way"})),
        ]
    );

    drop(props_tx);
    task.await.unwrap();
}
