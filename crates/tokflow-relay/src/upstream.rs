//! Streaming client for the upstream OpenAI-compatible completion API.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tokflow_models::{DONE_SENTINEL, DataFrames, StreamEvent, WireTurn};

use crate::error::RelayError;

/// Fixed generation parameters for relayed completions.
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, RelayError>> + Send>>;

/// Upstream completion client, one streaming request per relay call.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    model: String,
}

// Incremental chunk of an OpenAI-style streamed completion. Fields the relay
// does not forward (usage, finish_reason) are ignored during parsing.
#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Open a streaming completion request for the given turn list.
    ///
    /// Errors raised while opening the request map to the relay taxonomy and
    /// produce a terminal response; faults after the stream is open surface
    /// as an `Err` item mid-stream.
    pub async fn open_stream(
        &self,
        api_key: &str,
        turns: Vec<WireTurn>,
    ) -> Result<TokenStream, RelayError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": turns,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "stream": true,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("upstream request failed: {err}");
                RelayError::Unknown("An error occurred while processing your request".to_string())
            })?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let mut bytes = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut frames = DataFrames::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        tracing::warn!("upstream stream fault: {err}");
                        yield Err(RelayError::UpstreamUnavailable);
                        return;
                    }
                };

                for payload in frames.feed(&chunk) {
                    if payload.trim() == DONE_SENTINEL {
                        break 'read;
                    }

                    let parsed: ChatChunk = match serde_json::from_str(&payload) {
                        Ok(parsed) => parsed,
                        Err(_) => continue,
                    };

                    for choice in parsed.choices {
                        if let Some(content) = choice.delta.content
                            && !content.is_empty()
                        {
                            yield Ok(StreamEvent::Token { text: content });
                        }
                    }
                }
            }

            // [DONE] sentinel or upstream EOF both signal end-of-stream.
            yield Ok(StreamEvent::Done);
        }))
    }
}

async fn error_for_status(response: reqwest::Response) -> RelayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    // Truncate the upstream body to keep logs bounded.
    const MAX_ERROR_BODY: usize = 512;
    let detail: String = if body.len() > MAX_ERROR_BODY {
        format!("{}... [truncated]", body.chars().take(MAX_ERROR_BODY).collect::<String>())
    } else {
        body
    };
    tracing::warn!(status = %status, "upstream rejected completion request: {detail}");

    match status.as_u16() {
        401 => RelayError::AuthInvalid,
        429 => RelayError::RateLimited,
        500..=599 => RelayError::UpstreamUnavailable,
        _ => RelayError::Unknown("An error occurred while processing your request".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream_sse(deltas: &[&str], done: bool) -> String {
        let mut body = String::new();
        for delta in deltas {
            body.push_str(&format!(
                "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{delta}\"}}}}]}}\n\n"
            ));
        }
        if done {
            body.push_str("data: [DONE]\n\n");
        }
        body
    }

    async fn collect(stream: TokenStream) -> Vec<Result<StreamEvent, RelayError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_deltas_become_token_events_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(upstream_sse(&["Hel", "lo"], true), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = UpstreamClient::new(server.uri(), "gpt-test");
        let stream = client
            .open_stream("sk-test", vec![WireTurn::user("hi")])
            .await
            .unwrap();

        let events: Vec<_> = collect(stream).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Token { text: "Hel".into() },
                StreamEvent::Token { text: "lo".into() },
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_eof_without_sentinel_still_ends_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(upstream_sse(&["hi"], false), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = UpstreamClient::new(server.uri(), "gpt-test");
        let stream = client
            .open_stream("sk-test", vec![WireTurn::user("hi")])
            .await
            .unwrap();

        let events: Vec<_> = collect(stream).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_unparseable_chunks_are_skipped() {
        let server = MockServer::start().await;
        let body = format!("data: not-json\n\n{}", upstream_sse(&["ok"], true));
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = UpstreamClient::new(server.uri(), "gpt-test");
        let stream = client
            .open_stream("sk-test", vec![WireTurn::user("hi")])
            .await
            .unwrap();

        let events: Vec<_> = collect(stream).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![StreamEvent::Token { text: "ok".into() }, StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_status_mapping_before_stream() {
        for (upstream_status, expected) in [
            (401, RelayError::AuthInvalid.status()),
            (429, RelayError::RateLimited.status()),
            (503, RelayError::UpstreamUnavailable.status()),
            (400, RelayError::Unknown(String::new()).status()),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(upstream_status))
                .mount(&server)
                .await;

            let client = UpstreamClient::new(server.uri(), "gpt-test");
            let err = client
                .open_stream("sk-test", vec![WireTurn::user("hi")])
                .await
                .err()
                .expect("request should be rejected");
            assert_eq!(err.status(), expected, "upstream status {upstream_status}");
        }
    }
}
