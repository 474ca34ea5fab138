//! Stream consumer for the tokflow relay.
//!
//! Owns the canonical conversation and drives one relay call per user turn,
//! applying token events in arrival order to the single in-flight assistant
//! turn and rolling the conversation back whenever an exchange fails before
//! completion.

mod error;
mod relay;
mod session;

pub use error::{ClientError, Result};
pub use relay::{EventStream, RelayClient};
pub use session::{ChatSession, GREETING, NullObserver, SendOutcome, SessionObserver};
