//! The relay endpoint: forwards a conversation upstream and re-emits the
//! provider's token stream as normalized `data:` records.

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use tokflow_models::{ChatRequest, DONE_SENTINEL, StreamEvent, TokenRecord, WireTurn};

use crate::api::AppState;
use crate::error::RelayError;

/// Persona prepended to every relayed conversation.
const SYSTEM_PROMPT: &str = "You are a helpful and friendly AI assistant. \
    Answer clearly and concisely. You can help with a wide range of topics \
    including programming, writing, analysis, mathematics, and general \
    conversation.";

// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, RelayError>>>, RelayError> {
    if request.api_key.trim().is_empty() {
        return Err(RelayError::AuthMissing);
    }
    if request.messages.is_empty() {
        return Err(RelayError::InvalidInput(
            "Messages array is required".to_string(),
        ));
    }

    let mut turns = Vec::with_capacity(request.messages.len() + 1);
    turns.push(WireTurn::system(SYSTEM_PROMPT));
    turns.extend(request.messages);

    tracing::debug!(turns = turns.len(), "opening upstream completion stream");

    // Pre-stream failures become terminal JSON responses via RelayError.
    let mut upstream = state.upstream.open_stream(&request.api_key, turns).await?;

    let stream = async_stream::stream! {
        while let Some(event) = upstream.next().await {
            match event {
                Ok(StreamEvent::Token { text }) => {
                    match Event::default().json_data(TokenRecord { content: text }) {
                        Ok(record) => yield Ok(record),
                        Err(err) => tracing::warn!("failed to encode token record: {err}"),
                    }
                }
                Ok(StreamEvent::Done) => {
                    yield Ok(Event::default().data(DONE_SENTINEL));
                    return;
                }
                Ok(StreamEvent::Error { message }) => {
                    yield Err(RelayError::Unknown(message));
                    return;
                }
                Err(err) => {
                    // Mid-stream fault: nothing further is emitted and the
                    // channel closes without the Done sentinel.
                    yield Err(err);
                    return;
                }
            }
        }
    };

    Ok(Sse::new(stream))
}
