//! Stdio Channel
//!
//! The single-session transport: one implicit session for the whole process,
//! newline-delimited JSON request envelopes on stdin, response envelopes on
//! stdout. Responses are emitted strictly in request arrival order; each
//! response is flushed before the next line is read.

use {
    crate::dispatch::RequestDispatcher,
    crate::error::AdvisorResult,
    crate::types::{RequestEnvelope, ResponseEnvelope},
    serde_json::json,
    std::sync::Arc,
    tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    tracing::{debug, info},
};

pub struct StdioChannel {
    dispatcher: Arc<RequestDispatcher>,
}

impl StdioChannel {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run on the process's standard streams until EOF on stdin.
    pub async fn run(&self) -> AdvisorResult<()> {
        info!(event = "stdio_started", "Stdio channel started");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run_streams(stdin, stdout).await
    }

    /// Transport loop over arbitrary streams, so tests can drive it with an
    /// in-memory duplex pipe.
    pub async fn run_streams<R, W>(&self, reader: R, mut writer: W) -> AdvisorResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<RequestEnvelope>(line) {
                Ok(request) => self.dispatcher.dispatch_envelope(request).await,
                Err(e) => {
                    debug!(error = %e, event = "frame_decode_error", "Undecodable input line");
                    ResponseEnvelope::error(
                        json!({
                            "error": format!("Invalid request: {e}"),
                            "status": "failed"
                        })
                        .to_string(),
                    )
                }
            };

            let mut frame = serde_json::to_vec(&response)?;
            frame.push(b'\n');
            writer.write_all(&frame).await?;
            writer.flush().await?;
        }

        info!(event = "stdio_closed", "Stdio channel closed");
        Ok(())
    }
}
