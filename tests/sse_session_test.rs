//! SSE Transport Integration Tests
//!
//! Spawns a real server on a dynamic port and drives it over HTTP: one SSE
//! handshake per session, POSTed tool invocations, responses read back off
//! the event stream.

use advisor_mcp::{SessionTable, SseServer, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    base_url: String,
    sessions: Arc<SessionTable>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");

        let server = SseServer::new(Arc::new(ToolRegistry::new()));
        let sessions = server.sessions();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.serve_with_listener(listener).await {
                eprintln!("Test server error: {e}");
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            sessions,
            handle,
        }
    }

    async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// A connected SSE session: the open response stream plus the endpoint the
/// server handed back in its first event.
struct SseSession {
    response: reqwest::Response,
    buffer: String,
    session_id: String,
}

impl SseSession {
    async fn connect(base_url: &str) -> Self {
        let response = reqwest::Client::new()
            .get(format!("{base_url}/sse"))
            .send()
            .await
            .expect("open sse stream");
        assert!(response.status().is_success());

        let mut session = Self {
            response,
            buffer: String::new(),
            session_id: String::new(),
        };

        let (event, data) = session.next_event().await;
        assert_eq!(event, "endpoint");
        let session_id = data
            .split("sessionId=")
            .nth(1)
            .expect("endpoint event carries sessionId")
            .to_string();
        session.session_id = session_id;
        session
    }

    /// Read the next (event, data) pair off the stream, skipping keep-alive
    /// comments.
    async fn next_event(&mut self) -> (String, String) {
        loop {
            if let Some(frame) = self.take_frame() {
                if let Some(parsed) = parse_event(&frame) {
                    return parsed;
                }
                continue;
            }
            let chunk = timeout(EVENT_TIMEOUT, self.response.chunk())
                .await
                .expect("timed out waiting for sse event")
                .expect("read sse chunk")
                .expect("sse stream ended unexpectedly");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    fn take_frame(&mut self) -> Option<String> {
        let end = self.buffer.find("\n\n")?;
        let frame = self.buffer[..end].to_string();
        self.buffer = self.buffer[end + 2..].to_string();
        Some(frame)
    }
}

/// Parse one SSE frame; comment-only frames (keep-alives) yield None.
fn parse_event(frame: &str) -> Option<(String, String)> {
    let mut event = String::new();
    let mut data = String::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = rest.trim().to_string();
        }
    }
    if event.is_empty() && data.is_empty() {
        None
    } else {
        Some((event, data))
    }
}

async fn post_message(base_url: &str, session_id: &str, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base_url}/messages?sessionId={session_id}"))
        .json(body)
        .send()
        .await
        .expect("post message")
}

#[tokio::test]
async fn handshake_post_and_response_round_trip() {
    let server = TestServer::start().await;
    let mut session = SseSession::connect(&server.base_url).await;
    assert_eq!(server.sessions.len(), 1);

    let status = post_message(
        &server.base_url,
        &session.session_id,
        &json!({
            "name": "stack_advisor",
            "arguments": {
                "question": "What is your primary workload?",
                "questionNumber": 1,
                "totalQuestions": 8,
                "nextQuestionNeeded": true,
                "state": {}
            }
        }),
    )
    .await
    .status();
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let (event, data) = session.next_event().await;
    assert_eq!(event, "message");
    let envelope: Value = serde_json::from_str(&data).unwrap();
    assert!(envelope.get("isError").is_none());
    let payload: Value =
        serde_json::from_str(envelope["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(payload["display_text"], "What is your primary workload?");
    assert_eq!(payload["questionNumber"], 1);
    assert_eq!(payload["state"], json!({}));

    server.stop().await;
}

#[tokio::test]
async fn concurrent_sessions_are_isolated() {
    let server = TestServer::start().await;
    let mut session_a = SseSession::connect(&server.base_url).await;
    let mut session_b = SseSession::connect(&server.base_url).await;

    assert_ne!(session_a.session_id, session_b.session_id);
    assert_eq!(server.sessions.len(), 2);

    // A POST tagged with a bogus id is rejected and mutates nothing.
    let response = post_message(
        &server.base_url,
        "zzzz",
        &json!({"name": "stack_advisor", "arguments": {}}),
    )
    .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("zzzz"));
    assert_eq!(server.sessions.len(), 2);

    // Each session receives exactly its own response.
    for (session, tag) in [(&mut session_a, "a"), (&mut session_b, "b")] {
        let status = post_message(
            &server.base_url,
            &session.session_id.clone(),
            &json!({
                "name": "stack_advisor",
                "arguments": {
                    "question": format!("question for {tag}"),
                    "questionNumber": 1,
                    "totalQuestions": 2,
                    "nextQuestionNeeded": true,
                    "state": {"owner": tag}
                }
            }),
        )
        .await
        .status();
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    }

    let (_, data_a) = session_a.next_event().await;
    let envelope_a: Value = serde_json::from_str(&data_a).unwrap();
    let payload_a: Value =
        serde_json::from_str(envelope_a["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(payload_a["display_text"], "question for a");
    assert_eq!(payload_a["state"], json!({"owner": "a"}));

    let (_, data_b) = session_b.next_event().await;
    let envelope_b: Value = serde_json::from_str(&data_b).unwrap();
    let payload_b: Value =
        serde_json::from_str(envelope_b["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(payload_b["display_text"], "question for b");
    assert_eq!(payload_b["state"], json!({"owner": "b"}));

    server.stop().await;
}

#[tokio::test]
async fn disconnect_removes_exactly_that_session() {
    let server = TestServer::start().await;
    let session_a = SseSession::connect(&server.base_url).await;
    let session_b = SseSession::connect(&server.base_url).await;
    assert_eq!(server.sessions.len(), 2);

    let closed_id = session_b.session_id.clone();
    drop(session_b);

    // Cleanup happens when warp drops the stream; give it a moment.
    let mut remaining = server.sessions.len();
    for _ in 0..50 {
        if remaining == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        remaining = server.sessions.len();
    }
    assert_eq!(remaining, 1);
    assert!(server.sessions.lookup(&closed_id).is_none());
    assert!(server.sessions.lookup(&session_a.session_id).is_some());

    // A POST to the closed id is now unroutable.
    let response = post_message(
        &server.base_url,
        &closed_id,
        &json!({"name": "stack_advisor", "arguments": {}}),
    )
    .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn unknown_tool_reaches_caller_as_error_envelope() {
    let server = TestServer::start().await;
    let mut session = SseSession::connect(&server.base_url).await;

    let status = post_message(
        &server.base_url,
        &session.session_id.clone(),
        &json!({"name": "nonexistent_tool", "arguments": {}}),
    )
    .await
    .status();
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let (event, data) = session.next_event().await;
    assert_eq!(event, "message");
    let envelope: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(envelope["isError"], json!(true));
    assert!(envelope["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Unknown tool: nonexistent_tool"));

    server.stop().await;
}

#[tokio::test]
async fn health_endpoint_is_alive() {
    let server = TestServer::start().await;
    let response = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
    server.stop().await;
}
