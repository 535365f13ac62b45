//! Client protocol: one JSON object per line in each direction.
//!
//! ```text
//! -> {"id": "42", "text": "def main(", "top_p": 0.9}
//! <- {"event": "receive_completions", "id": "42", "hints": [{"text": "...", "score": 0.0}, ...]}
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use kamado::{CompletionEngine, CompletionRequest, SamplingParams, ServeError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::config::GatewayOption;

const QUEUE_FULL: &str = "queue full, try again later";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientRequest {
    pub id: String,
    pub text: String,
    pub top_p: Option<f32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hint {
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveCompletions {
        id: String,
        hints: Vec<Hint>,
    },
    Error {
        /// `None` when the request line could not be parsed.
        id: Option<String>,
        error: String,
    },
}

impl ServerEvent {
    fn error(id: impl Into<Option<String>>, error: impl ToString) -> Self {
        Self::Error { id: id.into(), error: error.to_string() }
    }
}

pub struct Gateway {
    engine: Arc<CompletionEngine>,
    options: GatewayOption,
}

impl Gateway {
    pub fn new(engine: Arc<CompletionEngine>, options: GatewayOption) -> Self {
        Self { engine, options }
    }

    fn sampling_params(&self, request: &ClientRequest) -> SamplingParams {
        SamplingParams::new(
            request.top_p.unwrap_or(self.options.default_top_p),
            request.temperature.unwrap_or(self.options.default_temperature),
        )
    }

    /// Submits `request` for `samples_per_request` samples and waits for all of them.
    pub async fn answer(&self, request: ClientRequest) -> ServerEvent {
        let params = self.sampling_params(&request);
        let ClientRequest { id, text, .. } = request;

        let submitted = self.engine.submit_samples(
            CompletionRequest::new(text, params),
            self.options.samples_per_request,
        );
        let handle = match submitted {
            Ok(handle) => handle,
            Err(ServeError::QueueFull { .. }) => return ServerEvent::error(id, QUEUE_FULL),
            Err(err) => return ServerEvent::error(id, err),
        };

        let completions = match self.options.response_timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), handle.collect()).await {
                Ok(completions) => completions,
                Err(_) => {
                    log::warn!("request {id} timed out after {secs}s");
                    return ServerEvent::error(id, format!("no completion within {secs}s"));
                }
            },
            None => handle.collect().await,
        };

        if completions.len() < self.options.samples_per_request {
            return ServerEvent::error(id, ServeError::Shutdown);
        }
        let mut hints = Vec::with_capacity(completions.len());
        for completion in completions {
            match completion {
                Ok(text) => hints.push(Hint { text, score: 0.0 }),
                Err(err) => return ServerEvent::error(id, err),
            }
        }
        ServerEvent::ReceiveCompletions { id, hints }
    }

    async fn answer_line(&self, line: String, peer: SocketAddr) -> ServerEvent {
        match serde_json::from_str::<ClientRequest>(&line) {
            Ok(request) => {
                log::debug!("{peer} sent request {}", request.id);
                self.answer(request).await
            }
            Err(err) => {
                log::warn!("{peer} sent malformed request: {err}");
                ServerEvent::error(None::<String>, format!("malformed request: {err}"))
            }
        }
    }

    /// Serves one connection until the peer hangs up and every request it
    /// sent has been answered.
    ///
    /// Requests are answered concurrently, so several requests pipelined on
    /// one connection can share a batch. Replies are written as they
    /// complete and may arrive out of order; clients match them by `id`.
    pub async fn serve_connection<S>(&self, stream: S, peer: SocketAddr) -> Result<()>
    where S: AsyncRead + AsyncWrite + Unpin
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();
        let mut pending = FuturesUnordered::new();
        let mut reading = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if reading => match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => pending.push(self.answer_line(line, peer)),
                    None => reading = false,
                },
                Some(event) = pending.next(), if !pending.is_empty() => {
                    let mut payload = serde_json::to_vec(&event)?;
                    payload.push(b'\n');
                    writer.write_all(&payload).await?;
                    writer.flush().await?;
                }
                else => break,
            }
        }
        Ok(())
    }
}

/// Accepts connections until the task is cancelled, one task per connection.
pub async fn accept_loop(listener: TcpListener, gateway: Arc<Gateway>) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("client connected: {peer}");
        let gateway = gateway.clone();
        tokio::spawn(async move {
            if let Err(err) = gateway.serve_connection(stream, peer).await {
                log::warn!("connection {peer} failed: {err}");
            }
            log::info!("client disconnected: {peer}");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kamado::codec::ByteCodec;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use kamado::compute::{BatchInput, ComputeError, ComputeResource, Echo};
    use kamado::{BatchShape, EngineConfig};

    /// Echoes and remembers the valid lengths of every batch it runs.
    #[derive(Clone, Default)]
    struct RecordingEcho {
        lengths: Arc<Mutex<Vec<Vec<usize>>>>,
    }

    #[async_trait]
    impl ComputeResource for RecordingEcho {
        async fn run_batch(&self, batch: &BatchInput) -> Result<Vec<Vec<u32>>, ComputeError> {
            self.lengths.lock().unwrap().push(batch.lengths.clone());
            Echo::default().run_batch(batch).await
        }
    }

    fn config(queue_capacity: usize) -> EngineConfig {
        EngineConfig {
            queue_capacity,
            batch: BatchShape::fixed(4),
            context_length: 16,
            continuation_length: 8,
            ..EngineConfig::default()
        }
    }

    fn engine(queue_capacity: usize) -> Arc<CompletionEngine> {
        Arc::new(CompletionEngine::new(config(queue_capacity), ByteCodec::new(), Echo::default()).unwrap())
    }

    fn request(id: &str, text: &str) -> ClientRequest {
        ClientRequest {
            id: id.into(),
            text: text.into(),
            top_p: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_default_sampling_params() {
        let gateway = Gateway::new(engine(8), GatewayOption::default());
        let params = gateway.sampling_params(&ClientRequest { temperature: Some(0.5), ..request("1", "x") });
        assert_eq!(params, SamplingParams::new(0.9, 0.5));
    }

    #[test]
    fn test_event_wire_format() {
        let event = ServerEvent::ReceiveCompletions {
            id: "7".into(),
            hints: vec![Hint { text: "ab".into(), score: 0.0 }],
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"receive_completions","id":"7","hints":[{"text":"ab","score":0.0}]}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerEvent::error("7".to_string(), QUEUE_FULL)).unwrap(),
            r#"{"event":"error","id":"7","error":"queue full, try again later"}"#
        );
    }

    #[tokio::test]
    async fn test_answer_returns_one_hint_per_sample() {
        let gateway = Gateway::new(engine(8), GatewayOption::default());
        let event = gateway.answer(request("a", "hello")).await;
        assert_eq!(event, ServerEvent::ReceiveCompletions {
            id: "a".into(),
            hints: vec![
                Hint { text: "hello".into(), score: 0.0 },
                Hint { text: "hello".into(), score: 0.0 },
            ],
        });
    }

    #[tokio::test]
    async fn test_answer_reports_queue_full() {
        // the second sample does not fit
        let gateway = Gateway::new(engine(1), GatewayOption::default());
        let event = gateway.answer(request("b", "hello")).await;
        assert_eq!(event, ServerEvent::error("b".to_string(), QUEUE_FULL));
    }

    #[tokio::test]
    async fn test_serve_connection_over_duplex() {
        let gateway = Gateway::new(engine(8), GatewayOption { samples_per_request: 1, ..GatewayOption::default() });
        let (client, server) = tokio::io::duplex(1024);
        let peer: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let serving = tokio::spawn(async move { gateway.serve_connection(server, peer).await });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"{\"id\": \"1\", \"text\": \"hi\"}\n").await.unwrap();
        let reply: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["event"], "receive_completions");
        assert_eq!(reply["id"], "1");
        assert_eq!(reply["hints"][0]["text"], "hi");

        writer.write_all(b"not json\n").await.unwrap();
        let reply: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["event"], "error");
        assert!(reply["id"].is_null());

        drop(writer);
        drop(lines);
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_pipelined_requests_share_a_batch() {
        let compute = RecordingEcho::default();
        let engine = CompletionEngine::new(config(8), ByteCodec::new(), compute.clone()).unwrap();
        let gateway = Gateway::new(
            Arc::new(engine),
            GatewayOption { samples_per_request: 1, ..GatewayOption::default() },
        );
        let (client, server) = tokio::io::duplex(1024);
        let peer: SocketAddr = "127.0.0.1:2".parse().unwrap();
        let serving = tokio::spawn(async move { gateway.serve_connection(server, peer).await });

        let (reader, mut writer) = tokio::io::split(client);
        let mut lines = BufReader::new(reader).lines();
        writer
            .write_all(b"{\"id\": \"a\", \"text\": \"ab\"}\n{\"id\": \"b\", \"text\": \"cd\"}\n")
            .await
            .unwrap();

        let mut answered = Vec::new();
        for _ in 0..2 {
            let reply: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            assert_eq!(reply["event"], "receive_completions");
            answered.push((
                reply["id"].as_str().unwrap().to_string(),
                reply["hints"][0]["text"].as_str().unwrap().to_string(),
            ));
        }
        answered.sort();
        assert_eq!(answered, vec![
            ("a".to_string(), "ab".to_string()),
            ("b".to_string(), "cd".to_string()),
        ]);
        assert_eq!(*compute.lengths.lock().unwrap(), vec![vec![2, 2, 0, 0]]);

        drop(writer);
        drop(lines);
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_hangup_waits_for_pending_answers() {
        let gateway = Gateway::new(engine(8), GatewayOption { samples_per_request: 1, ..GatewayOption::default() });
        let (client, server) = tokio::io::duplex(1024);
        let peer: SocketAddr = "127.0.0.1:3".parse().unwrap();
        let serving = tokio::spawn(async move { gateway.serve_connection(server, peer).await });

        let (reader, mut writer) = tokio::io::split(client);
        writer.write_all(b"{\"id\": \"z\", \"text\": \"bye\"}\n").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut lines = BufReader::new(reader).lines();
        let reply: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["id"], "z");
        assert_eq!(reply["hints"][0]["text"], "bye");
        drop(lines);
        drop(writer);
        serving.await.unwrap().unwrap();
    }
}
