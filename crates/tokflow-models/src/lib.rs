//! Shared data model and wire codec for the tokflow relay and client.

pub mod chat;
pub mod event;
pub mod sse;

pub use chat::{ChatRequest, Conversation, Role, Turn, TurnId, WireTurn};
pub use event::{EventDecoder, StreamEvent, TokenRecord, decode_payload, encode_record};
pub use sse::{DONE_SENTINEL, DataFrames};
