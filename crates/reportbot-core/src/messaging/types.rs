use crate::{
    domain::{InboundMessage, Session},
    utils::truncate_chars,
};

/// MIME type used for monthly spreadsheet reports.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Outbound payload accepted by every messenger implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    Image {
        url: String,
        caption: Option<String>,
    },
    Document {
        url: String,
        file_name: String,
        mime_type: String,
        caption: Option<String>,
    },
}

impl OutboundMessage {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image { .. } => "image",
            Self::Document { .. } => "document",
        }
    }

    /// Adapt the message to what a messenger can deliver.
    ///
    /// Unsupported media degrades to a text carrying the caption and the link;
    /// text is cut to `max_message_len` characters.
    pub fn fit(self, caps: &MessagingCapabilities) -> Self {
        let msg = match self {
            Self::Image { url, caption } if !caps.supports_images => link_text(caption, &url),
            Self::Document { url, caption, .. } if !caps.supports_documents => {
                link_text(caption, &url)
            }
            other => other,
        };
        match msg {
            Self::Text(s) => Self::Text(truncate_chars(&s, caps.max_message_len)),
            other => other,
        }
    }
}

fn link_text(caption: Option<String>, url: &str) -> OutboundMessage {
    match caption {
        Some(c) => OutboundMessage::Text(format!("{c}\n{url}")),
        None => OutboundMessage::Text(url.to_string()),
    }
}

/// Why the network closed a session.
///
/// Adapters translate their protocol-specific status codes into one of these;
/// the supervisor only ever reasons about this enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The remote party revoked the session. Credentials are stale.
    LoggedOut,
    /// The network refuses the session outright (version/capability mismatch, conflict).
    Rejected(String),
    /// Network blip, reset, or any unexplained drop.
    ConnectionLost(String),
    TimedOut,
    /// The adapter's event stream ended without an explicit close.
    StreamEnded,
}

/// Events a live connection surfaces to the supervisor.
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    /// The network wants the operator to pair a device using this one-time code.
    PairingRequested(String),
    CredentialsUpdated(Session),
    Open,
    Message(InboundMessage),
    Closed(CloseReason),
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_images: bool,
    pub supports_documents: bool,
    pub max_message_len: usize,
}
