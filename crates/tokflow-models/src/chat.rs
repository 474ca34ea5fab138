//! Conversation model shared by the relay and the stream consumer.

use serde::{Deserialize, Serialize};

/// Identifier of a turn, unique and monotonically assigned per conversation.
pub type TurnId = u64;

/// Author of a turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    pub created_at: i64,
}

/// The `{role, content}` pair sent over the wire to the relay and upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireTurn {
    pub role: Role,
    pub content: String,
}

impl WireTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Request body for `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<WireTurn>,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

/// Ordered history of turns for one session.
///
/// Insertion order is chronological order. At most one assistant turn is
/// "in flight" (receiving streamed content) at any time; only that turn's
/// content is mutable.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    next_id: TurnId,
    in_flight: Option<TurnId>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, role: Role, content: impl Into<String>) -> TurnId {
        let id = self.next_id;
        self.next_id += 1;
        self.turns.push(Turn {
            id,
            role,
            content: content.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        });
        id
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> TurnId {
        self.push(Role::User, content)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> TurnId {
        self.push(Role::Assistant, content)
    }

    pub fn push_system(&mut self, content: impl Into<String>) -> TurnId {
        self.push(Role::System, content)
    }

    /// Append an empty assistant turn and mark it as the streaming target.
    pub fn begin_assistant(&mut self) -> TurnId {
        let id = self.push(Role::Assistant, "");
        self.in_flight = Some(id);
        id
    }

    /// Append text to the in-flight turn, returning it for re-render.
    pub fn append_streaming(&mut self, text: &str) -> Option<&Turn> {
        let id = self.in_flight?;
        let turn = self.turns.iter_mut().find(|turn| turn.id == id)?;
        turn.content.push_str(text);
        Some(turn)
    }

    /// Seal the in-flight turn; its content is immutable afterwards.
    pub fn finalize_streaming(&mut self) -> Option<TurnId> {
        self.in_flight.take()
    }

    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Roll the conversation back to a previous length, dropping the
    /// in-flight marker if the streaming turn is removed.
    pub fn truncate_to(&mut self, len: usize) {
        self.turns.truncate(len);
        if let Some(id) = self.in_flight
            && !self.turns.iter().any(|turn| turn.id == id)
        {
            self.in_flight = None;
        }
    }

    /// Map the history to the `{role, content}` pairs the relay expects.
    pub fn wire_turns(&self) -> Vec<WireTurn> {
        self.turns
            .iter()
            .map(|turn| WireTurn::new(turn.role.clone(), turn.content.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut conversation = Conversation::new();
        let a = conversation.push_assistant("hi");
        let b = conversation.push_user("hello");
        let c = conversation.begin_assistant();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_append_streaming_targets_in_flight_turn() {
        let mut conversation = Conversation::new();
        conversation.push_user("question");
        let id = conversation.begin_assistant();

        conversation.append_streaming("Hel");
        let turn = conversation.append_streaming("lo").unwrap();
        assert_eq!(turn.id, id);
        assert_eq!(turn.content, "Hello");

        conversation.finalize_streaming();
        assert!(!conversation.is_streaming());
        assert!(conversation.append_streaming("more").is_none());
    }

    #[test]
    fn test_truncate_rolls_back_in_flight_marker() {
        let mut conversation = Conversation::new();
        conversation.push_assistant("greeting");
        let baseline = conversation.len();
        conversation.push_user("hi");
        conversation.begin_assistant();

        conversation.truncate_to(baseline);
        assert_eq!(conversation.len(), 1);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_wire_turns_preserve_order_and_roles() {
        let mut conversation = Conversation::new();
        conversation.push_assistant("hello there");
        conversation.push_user("hi");

        let wire = conversation.wire_turns();
        assert_eq!(
            wire,
            vec![
                WireTurn::new(Role::Assistant, "hello there"),
                WireTurn::user("hi"),
            ]
        );
    }

    #[test]
    fn test_chat_request_uses_camel_case_key() {
        let request = ChatRequest {
            messages: vec![WireTurn::user("hi")],
            api_key: "sk-test".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["apiKey"], "sk-test");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
