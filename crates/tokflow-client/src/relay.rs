//! HTTP access to the relay's chat endpoint.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokflow_models::{ChatRequest, EventDecoder, StreamEvent, WireTurn};

use crate::error::{ClientError, Result};

/// Decoded event stream of one relay call.
///
/// Yields events strictly in emission order; nothing follows `Done` or
/// `Error`. A stream that ends without `Done` closed on a fault.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the relay's `POST /api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Use a preconfigured HTTP client (proxies, timeouts).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// POST the conversation and open the relay's event stream.
    ///
    /// Terminal error responses are mapped to [`ClientError::Relay`] before
    /// any stream is returned.
    pub async fn send(&self, messages: Vec<WireTurn>, api_key: &str) -> Result<EventStream> {
        let request = ChatRequest {
            messages,
            api_key: api_key.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "Failed to process the response".to_string());
            return Err(ClientError::Relay {
                status: status.as_u16(),
                message,
            });
        }

        let mut bytes = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut decoder = EventDecoder::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield StreamEvent::Error {
                            message: err.to_string(),
                        };
                        break 'read;
                    }
                };

                for event in decoder.feed(&chunk) {
                    let done = matches!(event, StreamEvent::Done);
                    yield event;
                    if done {
                        break 'read;
                    }
                }
            }
        }))
    }
}
