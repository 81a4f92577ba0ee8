use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network-level address of a conversation partner (chat id, JID, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SenderId(pub String);

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque authentication/state blob owned by the connection supervisor.
///
/// The core never looks inside; only the network adapter that produced it does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session(pub serde_json::Value);

/// One inbound chat message, consumed once by the dispatcher.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub sender: SenderId,
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub from_self: bool,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: SenderId(sender.into()),
            text: text.into(),
            received_at: Utc::now(),
            from_self: false,
        }
    }
}
