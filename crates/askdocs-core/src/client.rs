use std::collections::VecDeque;

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, Endpoint};
use crate::error::{ChatError, Result};
use crate::stream::{SseDecoder, SseEvent};

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub faiss_index: Option<Value>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Client for the document Q&A API
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    base_url: String,
    endpoint: Endpoint,
    temperature: Option<f32>,
}

impl AskClient {
    pub fn new(base_url: &str, endpoint: Endpoint) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoint,
            temperature: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_url, config.endpoint).with_temperature(config.temperature)
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn ask_url(&self) -> String {
        format!("{}/{}", self.base_url, self.endpoint.path())
    }

    /// Post a question and stream the answer back as text deltas.
    ///
    /// The returned stream yields deltas in arrival order and ends at `[DONE]`
    /// or at the end of the body. An error payload from the server ends it
    /// with [`ChatError::Server`].
    pub async fn ask_stream(&self, question: &str) -> Result<BoxStream<'static, Result<String>>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ChatError::InvalidTemperature(temperature));
            }
        }

        let url = self.ask_url();
        let request = AskRequest {
            question,
            temperature: self.temperature,
        };

        info!(%url, chars = question.chars().count(), "asking question");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "ask request rejected");
            return Err(ChatError::Status(status.as_u16()));
        }

        Ok(decode_deltas(response.bytes_stream()).boxed())
    }

    /// Ask a question and wait for the whole answer.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut deltas = self.ask_stream(question).await?;
        let mut answer = String::new();
        while let Some(delta) = deltas.next().await {
            answer.push_str(&delta?);
        }
        Ok(answer)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ChatError::Status(response.status().as_u16()));
        }

        let health: HealthStatus = response.json().await?;
        debug!(status = %health.status, "health check");
        Ok(health)
    }
}

struct DeltaState<S> {
    body: S,
    decoder: SseDecoder,
    queue: VecDeque<SseEvent>,
    finished: bool,
}

/// Turn a chunked response body into a stream of text deltas.
fn decode_deltas<S, B>(body: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = DeltaState {
        body,
        decoder: SseDecoder::new(),
        queue: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queue.pop_front() {
                match event {
                    SseEvent::Delta(delta) => return Some((Ok(delta), state)),
                    SseEvent::Done => {
                        debug!("answer stream signalled completion");
                        return None;
                    }
                    SseEvent::Error(message) => {
                        warn!(%message, "server reported an error mid-stream");
                        state.queue.clear();
                        state.finished = true;
                        return Some((Err(ChatError::Server(message)), state));
                    }
                }
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.queue.extend(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(ChatError::from(err)), state));
                }
                None => {
                    state.finished = true;
                    let events = state.decoder.finish();
                    state.queue.extend(events);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    const STREAM_BODY: &str = "data: {\"content\": \"Check the \"}\n\n\
                               data: {\"content\": \"hydraulic seals.\"}\n\n\
                               data: [DONE]\n\n";

    #[tokio::test]
    async fn test_ask_concatenates_deltas() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ask")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "question": "How do I service the tester?"
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(STREAM_BODY)
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        let answer = client.ask("  How do I service the tester?  ").await.unwrap();

        assert_eq!(answer, "Check the hydraulic seals.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_endpoint_and_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ask-stream")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "question": "hi",
                "temperature": 0.5
            })))
            .with_status(200)
            .with_body("data: {\"choices\": [{\"delta\": {\"content\": \"hello\"}}]}\n\ndata: [DONE]\n\n")
            .create_async()
            .await;

        let client = AskClient::new(&format!("{}/", server.url()), Endpoint::AskStream)
            .with_temperature(Some(0.5));
        let deltas: Vec<String> = client.ask_stream("hi").await.unwrap().try_collect().await.unwrap();

        assert_eq!(deltas, vec!["hello".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask")
            .with_status(503)
            .with_body("{\"detail\": \"FAISS index not loaded\"}")
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        let err = client.ask("anything").await.unwrap_err();

        assert!(matches!(err, ChatError::Status(503)));
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[tokio::test]
    async fn test_server_error_payload_ends_stream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask")
            .with_status(200)
            .with_body("data: {\"content\": \"partial\"}\n\ndata: {\"error\": \"model unavailable\"}\n\ndata: {\"content\": \"ignored\"}\n\n")
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        let items: Vec<Result<String>> = client.ask_stream("q").await.unwrap().collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        match &items[1] {
            Err(ChatError::Server(message)) => assert_eq!(message, "model unavailable"),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_body_without_done_marker() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask")
            .with_status(200)
            .with_body("data: {\"text\": \"no \"}\n\ndata: {\"text\": \"marker\"}")
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        assert_eq!(client.ask("q").await.unwrap(), "no marker");
    }

    #[tokio::test]
    async fn test_empty_question_is_not_sent() {
        let client = AskClient::new("http://127.0.0.1:9", Endpoint::Ask);
        assert!(matches!(client.ask("   ").await, Err(ChatError::EmptyQuestion)));
    }

    #[tokio::test]
    async fn test_invalid_temperature_is_not_sent() {
        let client = AskClient::new("http://127.0.0.1:9", Endpoint::Ask).with_temperature(Some(2.5));
        assert!(matches!(client.ask("q").await, Err(ChatError::InvalidTemperature(_))));
    }

    #[tokio::test]
    async fn test_decoder_handles_arbitrary_chunking() {
        let body = "data: {\"content\": \"\u{e9}t\u{e9}\"}\n\ndata: [DONE]\n\n".as_bytes();
        let chunks: Vec<std::result::Result<Vec<u8>, reqwest::Error>> =
            body.chunks(3).map(|c| Ok(c.to_vec())).collect();

        let deltas: Vec<String> = decode_deltas(stream::iter(chunks)).try_collect().await.unwrap();
        assert_eq!(deltas.concat(), "\u{e9}t\u{e9}");
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "ok", "faiss_index": {"loaded": true, "chunks": 120}}"#)
            .create_async()
            .await;

        let client = AskClient::new(&server.url(), Endpoint::Ask);
        let health = client.health().await.unwrap();
        assert!(health.is_ok());
        assert_eq!(health.faiss_index.unwrap()["chunks"], 120);
    }
}
