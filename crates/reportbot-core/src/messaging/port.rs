use async_trait::async_trait;

use crate::{
    domain::SenderId,
    messaging::types::{MessagingCapabilities, OutboundMessage},
    Result,
};

/// Cross-messenger outbound port.
///
/// Telegram is the shipped implementation; any network whose client library can
/// address a sender and attach a URL-referenced image or document fits behind it.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send(&self, to: &SenderId, message: OutboundMessage) -> Result<()>;
}
