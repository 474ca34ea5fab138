//! Conversation ownership and the turn-exchange state machine.

use futures::StreamExt;
use tokflow_models::{Conversation, StreamEvent, Turn};

use crate::error::{ClientError, Result};
use crate::relay::RelayClient;

/// Greeting opening every fresh conversation.
pub const GREETING: &str = "Hi! I'm your AI assistant. How can I help you today?";

/// Observer of session progress, implemented by the presentation layer.
///
/// Default implementations ignore every notification, so observers override
/// only what they render.
pub trait SessionObserver: Send {
    /// Loading state flipped; collaborators disable submission while true.
    fn loading_changed(&mut self, _loading: bool) {}

    /// The in-flight assistant turn grew; re-render its content.
    fn turn_updated(&mut self, _turn: &Turn) {}
}

/// Observer that ignores every notification.
pub struct NullObserver;

impl SessionObserver for NullObserver {}

/// How a `send_turn` call that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The exchange completed and the assistant turn is finalized.
    Completed,
    /// Blank input, missing credential or an in-flight exchange made the
    /// call a no-op; nothing was sent and nothing was mutated.
    Skipped,
}

/// The stream consumer: owns the conversation and drives one relay call per
/// user turn.
pub struct ChatSession {
    relay: RelayClient,
    credential: Option<String>,
    conversation: Conversation,
    observer: Box<dyn SessionObserver>,
    loading: bool,
}

impl ChatSession {
    pub fn new(relay: RelayClient) -> Self {
        let mut conversation = Conversation::new();
        conversation.push_assistant(GREETING);
        Self {
            relay,
            credential: None,
            conversation,
            observer: Box::new(NullObserver),
            loading: false,
        }
    }

    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Install the credential supplied by the configuration collaborator.
    /// A blank key counts as no credential.
    pub fn set_credential(&mut self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        self.credential = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn turns(&self) -> &[Turn] {
        self.conversation.turns()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Send one user turn and stream the assistant's reply into the
    /// conversation.
    ///
    /// Appends the user turn synchronously before any network activity, then
    /// fills a placeholder assistant turn token by token in arrival order.
    /// On any failure before the stream completes the conversation is rolled
    /// back to its prior state, so a failed exchange leaves no partial trace.
    pub async fn send_turn(&mut self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        let Some(api_key) = self.credential.clone() else {
            return Ok(SendOutcome::Skipped);
        };
        if text.is_empty() || self.loading {
            return Ok(SendOutcome::Skipped);
        }

        let baseline = self.conversation.len();
        self.conversation.push_user(text);
        self.set_loading(true);

        match self.stream_exchange(&api_key).await {
            Ok(()) => {
                self.set_loading(false);
                Ok(SendOutcome::Completed)
            }
            Err(err) => {
                self.conversation.truncate_to(baseline);
                self.set_loading(false);
                tracing::warn!("exchange failed, conversation rolled back: {err}");
                Err(err)
            }
        }
    }

    async fn stream_exchange(&mut self, api_key: &str) -> Result<()> {
        let mut stream = self
            .relay
            .send(self.conversation.wire_turns(), api_key)
            .await?;

        self.conversation.begin_assistant();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Token { text } => {
                    if let Some(turn) = self.conversation.append_streaming(&text) {
                        self.observer.turn_updated(turn);
                    }
                }
                StreamEvent::Done => {
                    self.conversation.finalize_streaming();
                    return Ok(());
                }
                StreamEvent::Error { message } => {
                    return Err(ClientError::Stream(message));
                }
            }
        }

        // Closed without the Done sentinel.
        Err(ClientError::StreamFault)
    }

    /// Reset the conversation to a single fresh greeting turn.
    ///
    /// Refused while an exchange is in flight so an active stream never has
    /// the conversation mutated out from under it. Returns whether the reset
    /// happened.
    pub fn clear_messages(&mut self) -> bool {
        if self.loading || self.conversation.is_streaming() {
            return false;
        }

        let mut conversation = Conversation::new();
        conversation.push_assistant(GREETING);
        self.conversation = conversation;
        true
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.observer.loading_changed(loading);
    }
}
