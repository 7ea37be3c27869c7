//! SSE Transport
//!
//! The network channel: a long-lived Server-Sent-Event stream per session,
//! paired with out-of-band POSTed tool invocations.
//!
//! `GET /sse` performs the handshake: it allocates a session, registers its
//! output channel in the [`SessionTable`], and opens the event stream. The
//! first event (`event: endpoint`) tells the caller where to POST, carrying
//! the session id; every response envelope then arrives as an
//! `event: message` frame on the same stream. Dropping the stream closes the
//! session and removes exactly its table entry.

use {
    crate::dispatch::RequestDispatcher,
    crate::error::{AdvisorError, AdvisorResult},
    crate::logging,
    crate::session::SessionTable,
    crate::tools::ToolRegistry,
    crate::types::{RequestEnvelope, ResponseEnvelope},
    futures_util::Stream,
    serde::Deserialize,
    serde_json::json,
    std::convert::Infallible,
    std::net::SocketAddr,
    std::pin::Pin,
    std::sync::Arc,
    std::task::{Context, Poll},
    tokio_stream::wrappers::{TcpListenerStream, UnboundedReceiverStream},
    tracing::{debug, info},
    warp::http::StatusCode,
    warp::sse::Event,
    warp::{reply, Filter, Rejection, Reply},
};

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

pub struct SseServer {
    dispatcher: Arc<RequestDispatcher>,
    sessions: Arc<SessionTable>,
}

impl SseServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            dispatcher: Arc::new(RequestDispatcher::new(registry)),
            sessions: Arc::new(SessionTable::new()),
        }
    }

    pub fn sessions(&self) -> Arc<SessionTable> {
        self.sessions.clone()
    }

    /// Bind the port and serve until the process is terminated. A failed
    /// bind is the one unrecoverable startup error and is reported as
    /// [`AdvisorError::Bind`].
    pub async fn serve(&self, port: u16) -> AdvisorResult<()> {
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| AdvisorError::Bind { addr, source })?;
        self.serve_with_listener(listener).await
    }

    /// Serve on an already-bound listener. Integration tests use this with a
    /// port-zero listener.
    pub async fn serve_with_listener(
        &self,
        listener: tokio::net::TcpListener,
    ) -> AdvisorResult<()> {
        let addr = listener.local_addr()?;
        logging::log_server_ready(&addr.to_string());
        info!(
            tools = self.dispatcher.registry().list_tools().len(),
            "Serving GET /sse, POST /messages, GET /health on http://{addr}"
        );

        warp::serve(self.routes())
            .run_incoming(TcpListenerStream::new(listener))
            .await;
        Ok(())
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let sse_route = warp::path!("sse")
            .and(warp::get())
            .and(with_sessions(self.sessions.clone()))
            .map(handle_sse_handshake);

        let messages_route = warp::path!("messages")
            .and(warp::post())
            .and(warp::query::<MessagesQuery>())
            .and(warp::body::json())
            .and(with_dispatcher(self.dispatcher.clone()))
            .and(with_sessions(self.sessions.clone()))
            .and_then(handle_message_post);

        let health_route = warp::path!("health")
            .and(warp::get())
            .map(|| reply::with_status("OK", StatusCode::OK));

        sse_route.or(messages_route).or(health_route)
    }
}

fn with_sessions(
    sessions: Arc<SessionTable>,
) -> impl Filter<Extract = (Arc<SessionTable>,), Error = Infallible> + Clone {
    warp::any().map(move || sessions.clone())
}

fn with_dispatcher(
    dispatcher: Arc<RequestDispatcher>,
) -> impl Filter<Extract = (Arc<RequestDispatcher>,), Error = Infallible> + Clone {
    warp::any().map(move || dispatcher.clone())
}

/// INIT -> OPEN: allocate a session and answer with its event stream.
fn handle_sse_handshake(sessions: Arc<SessionTable>) -> impl Reply {
    let connection_id = logging::ConnectionId::new();
    let (session_id, receiver) = sessions.open();
    logging::log_session_opened(&connection_id, &session_id);

    let stream = SessionStream {
        sessions,
        session_id,
        receiver: UnboundedReceiverStream::new(receiver),
        endpoint_sent: false,
    };

    warp::sse::reply(warp::sse::keep_alive().stream(stream))
}

/// Route one POSTed invocation to its session. The response envelope goes
/// out on the session's event stream; the POST itself gets a 202. An unknown
/// id is rejected with 400 and no table mutation.
async fn handle_message_post(
    query: MessagesQuery,
    request: RequestEnvelope,
    dispatcher: Arc<RequestDispatcher>,
    sessions: Arc<SessionTable>,
) -> Result<warp::reply::Response, Rejection> {
    let Some(sender) = sessions.lookup(&query.session_id) else {
        logging::log_unroutable_session(&query.session_id);
        let body = json!({
            "error": AdvisorError::UnknownSession(query.session_id).to_string()
        });
        return Ok(
            reply::with_status(reply::json(&body), StatusCode::BAD_REQUEST).into_response(),
        );
    };

    let response = dispatcher.dispatch_envelope(request).await;

    if sender.send(response).is_err() {
        // Receiver already dropped: the stream closed between lookup and
        // send. The stream's drop guard owns the table cleanup.
        debug!(
            session_id = %query.session_id,
            event = "send_after_close",
            "Response dropped, session stream already closed"
        );
        let body = json!({
            "error": AdvisorError::SessionClosed(query.session_id).to_string()
        });
        return Ok(reply::with_status(reply::json(&body), StatusCode::GONE).into_response());
    }

    Ok(
        reply::with_status(reply::json(&json!({"status": "accepted"})), StatusCode::ACCEPTED)
            .into_response(),
    )
}

/// Per-session event stream. Yields the endpoint event first, then one
/// `message` event per response envelope. OPEN -> CLOSED happens in Drop:
/// warp drops the stream when the client disconnects, which removes exactly
/// this session's table entry.
struct SessionStream {
    sessions: Arc<SessionTable>,
    session_id: String,
    receiver: UnboundedReceiverStream<ResponseEnvelope>,
    endpoint_sent: bool,
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if !this.endpoint_sent {
            this.endpoint_sent = true;
            let endpoint = format!("/messages?sessionId={}", this.session_id);
            return Poll::Ready(Some(Ok(Event::default().event("endpoint").data(endpoint))));
        }

        match Pin::new(&mut this.receiver).poll_next(cx) {
            Poll::Ready(Some(envelope)) => Poll::Ready(Some(Ok(envelope_event(&envelope)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.sessions.remove(&self.session_id);
        logging::log_session_closed(&self.session_id);
    }
}

fn envelope_event(envelope: &ResponseEnvelope) -> Event {
    let data = match serde_json::to_string(envelope) {
        Ok(data) => data,
        Err(e) => json!({
            "content": [{"type": "text", "text": e.to_string()}],
            "isError": true
        })
        .to_string(),
    };
    Event::default().event("message").data(data)
}
