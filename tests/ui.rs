//! UI server endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use jarvis_desk::ReadinessGate;
use jarvis_desk::ui::{UiServer, UiServerBuilder};
use tower::ServiceExt;

mod common;
use common::setup_test_store;

fn build_test_server(gate: &Arc<ReadinessGate>) -> UiServer {
    let (requests, _rx) = crossbeam_channel::unbounded();
    UiServerBuilder::new(0, Arc::clone(gate), requests, setup_test_store())
        .assistant_name("jarvis")
        .build()
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let gate = Arc::new(ReadinessGate::new());
    let app = build_test_server(&gate).router();

    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_waits_for_frontend() {
    let gate = Arc::new(ReadinessGate::new());
    let server = build_test_server(&gate);

    let (status, json) = get_json(server.router(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "waiting");
    assert_eq!(json["is_ready"], false);
    assert_eq!(json["database"]["status"], "ok");

    gate.signal_ready();

    let (status, json) = get_json(server.router(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["is_ready"], true);
    assert_eq!(json["is_listening"], false);
    assert_eq!(json["voice_enabled"], false);
}

#[tokio::test]
async fn test_ready_signal_opens_gate_once() {
    let gate = Arc::new(ReadinessGate::new());
    let server = build_test_server(&gate);

    let post = || {
        Request::builder()
            .method("POST")
            .uri("/api/ready")
            .body(Body::empty())
            .unwrap()
    };

    let response = server.router().oneshot(post()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["opened"], true);
    assert!(gate.is_ready());

    let response = server.router().oneshot(post()).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["opened"], false);
}

#[tokio::test]
async fn test_static_files_fall_back_to_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>jarvis</h1>").unwrap();
    std::fs::write(dir.path().join("main.js"), "connect();").unwrap();

    let gate = Arc::new(ReadinessGate::new());
    let (requests, _rx) = crossbeam_channel::unbounded();
    let server = UiServerBuilder::new(0, gate, requests, setup_test_store())
        .static_dir(dir.path().to_path_buf())
        .build();

    let response = server
        .router()
        .oneshot(Request::builder().uri("/main.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"connect();");

    let response = server
        .router()
        .oneshot(
            Request::builder()
                .uri("/some/client/route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<h1>jarvis</h1>");
}

#[test]
fn test_presenter_events_reach_subscribers() {
    use jarvis_desk::Presenter;
    use jarvis_desk::ui::WsOutgoing;

    let gate = Arc::new(ReadinessGate::new());
    let server = build_test_server(&gate);
    let state = server.state();
    let mut events = state.events.subscribe();

    // Presenter calls come from the listener thread, outside any runtime
    let presenter = state.presenter();
    presenter.notify_listening();
    presenter.display_message("Opening notepad");
    presenter.show_idle();

    tokio_test::block_on(async {
        assert_eq!(events.recv().await.unwrap(), WsOutgoing::Listening);
        assert_eq!(
            events.recv().await.unwrap(),
            WsOutgoing::DisplayMessage {
                text: "Opening notepad".to_string()
            }
        );
        assert_eq!(events.recv().await.unwrap(), WsOutgoing::ShowIdle);
    });
}
