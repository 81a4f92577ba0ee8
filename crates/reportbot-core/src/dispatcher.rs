//! Per-message routing: classify, run exactly one handler, send exactly one reply.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    ai::AiResponder,
    commands::{classify, CommandMatch},
    domain::InboundMessage,
    messaging::port::MessagingPort,
    replies::{Outcome, ReplyTexts},
    reports::ReportResolver,
    supervisor::InboundHandler,
    utils::preview,
};

/// What happened to one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Self-originated; nothing was done.
    Ignored,
    /// One reply was sent; carries the outcome label.
    Sent(&'static str),
    /// Cooldown hit under the silent-drop policy.
    Dropped,
    /// The reply was produced but the send itself failed.
    SendFailed(&'static str),
}

pub struct Dispatcher {
    reports: ReportResolver,
    ai: AiResponder,
    texts: ReplyTexts,
}

impl Dispatcher {
    pub fn new(reports: ReportResolver, ai: AiResponder, texts: ReplyTexts) -> Self {
        Self { reports, ai, texts }
    }

    /// Run the matching handler for `msg` and produce its typed outcome.
    pub async fn route(&self, msg: &InboundMessage) -> Outcome {
        match classify(&msg.text) {
            CommandMatch::MonthlyReport { month, year } => self.reports.monthly(month, year).await,
            CommandMatch::DailyReport(key) => self.reports.daily(&key).await,
            CommandMatch::Malformed(kind) => Outcome::Usage(kind),
            CommandMatch::AiQuery(text) => self.ai.respond(&text).await,
            CommandMatch::Unrecognized => Outcome::Help,
        }
    }

    /// Handle one inbound message end to end.
    ///
    /// Never fails: handler and send errors are logged and contained here so a
    /// bad message cannot reach the connection loop.
    pub async fn handle(&self, msg: &InboundMessage, out: &dyn MessagingPort) -> Dispatched {
        if msg.from_self {
            return Dispatched::Ignored;
        }

        debug!(sender = %msg.sender, text = %preview(&msg.text, 80), "inbound message");
        let outcome = self.route(msg).await;
        let label = outcome.label();

        let Some(reply) = self.texts.render(outcome) else {
            debug!(sender = %msg.sender, "reply dropped by cooldown policy");
            return Dispatched::Dropped;
        };

        let reply = reply.fit(&out.capabilities());
        let kind = reply.kind();
        match out.send(&msg.sender, reply).await {
            Ok(()) => {
                info!(sender = %msg.sender, outcome = label, kind, "reply sent");
                Dispatched::Sent(label)
            }
            Err(e) => {
                warn!(sender = %msg.sender, outcome = label, error = %e, "reply send failed");
                Dispatched::SendFailed(label)
            }
        }
    }
}

#[async_trait]
impl InboundHandler for Dispatcher {
    async fn on_message(&self, msg: InboundMessage, out: Arc<dyn MessagingPort>) {
        self.handle(&msg, out.as_ref()).await;
    }
}
