//! getUpdates long-polling as a [`NetworkConnector`].
//!
//! One polling task per connection. The persisted [`Session`] is the update
//! cursor, so a restart neither replays nor skips messages that were already
//! acknowledged.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teloxide::{
    prelude::*,
    types::{AllowedUpdate, UpdateKind, UserId},
    ApiError, RequestError,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use reportbot_core::{
    domain::{InboundMessage, SenderId, Session},
    messaging::{
        port::MessagingPort,
        types::{CloseReason, ConnectionEvent},
    },
    supervisor::{Connection, NetworkConnector},
    Result,
};

const EVENT_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PollCursor {
    offset: i32,
}

impl PollCursor {
    fn from_session(session: Option<Session>) -> Self {
        match session.map(|s| serde_json::from_value::<PollCursor>(s.0)) {
            Some(Ok(cursor)) => cursor,
            Some(Err(e)) => {
                warn!(error = %e, "stored session is not a telegram cursor; starting fresh");
                Self::default()
            }
            None => Self::default(),
        }
    }

    fn to_session(self) -> Session {
        Session(serde_json::json!({ "offset": self.offset }))
    }
}

pub struct TelegramConnector {
    bot: Bot,
    outbound: Arc<dyn MessagingPort>,
    poll_timeout: Duration,
}

impl TelegramConnector {
    /// `outbound` is handed to every connection; usually a throttled [`crate::TelegramMessenger`].
    pub fn new(bot: Bot, outbound: Arc<dyn MessagingPort>, poll_timeout: Duration) -> Self {
        Self {
            bot,
            outbound,
            poll_timeout,
        }
    }
}

#[async_trait]
impl NetworkConnector for TelegramConnector {
    async fn connect(&self, session: Option<Session>) -> Result<Connection> {
        let cursor = PollCursor::from_session(session);
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(poll(self.bot.clone(), cursor, self.poll_timeout, tx));
        Ok(Connection {
            events: rx,
            outbound: self.outbound.clone(),
        })
    }
}

/// Map a Bot API failure to a closure reason. `None` means "wait and poll again".
pub fn close_reason(err: &RequestError) -> Option<CloseReason> {
    match err {
        RequestError::RetryAfter(_) => None,
        RequestError::Api(ApiError::NotFound) => Some(CloseReason::LoggedOut),
        RequestError::Api(ApiError::TerminatedByOtherGetUpdates) => Some(CloseReason::Rejected(
            "another client is polling with this token".to_string(),
        )),
        RequestError::Network(e) if e.is_timeout() => Some(CloseReason::TimedOut),
        other => Some(CloseReason::ConnectionLost(other.to_string())),
    }
}

/// Inbound view of a message update. Non-message updates yield `None`.
fn to_inbound(update: &Update, me: UserId) -> Option<InboundMessage> {
    let UpdateKind::Message(msg) = &update.kind else {
        return None;
    };
    let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
    Some(InboundMessage {
        sender: SenderId(msg.chat.id.0.to_string()),
        text: text.to_string(),
        received_at: msg.date,
        from_self: msg.from().map(|u| u.id == me).unwrap_or(false),
    })
}

async fn emit(tx: &mpsc::Sender<ConnectionEvent>, ev: ConnectionEvent) -> bool {
    tx.send(ev).await.is_ok()
}

async fn poll(
    bot: Bot,
    mut cursor: PollCursor,
    poll_timeout: Duration,
    tx: mpsc::Sender<ConnectionEvent>,
) {
    let me = tokio::select! {
        _ = tx.closed() => return,
        res = bot.get_me().send() => res,
    };
    let me = match me {
        Ok(me) => me,
        Err(e) => {
            let reason = close_reason(&e)
                .unwrap_or_else(|| CloseReason::ConnectionLost(e.to_string()));
            emit(&tx, ConnectionEvent::Closed(reason)).await;
            return;
        }
    };
    info!(bot = me.username(), offset = cursor.offset, "telegram polling started");
    if !emit(&tx, ConnectionEvent::Open).await {
        return;
    }

    let timeout_secs = u32::try_from(poll_timeout.as_secs()).unwrap_or(u32::MAX);
    loop {
        let res = tokio::select! {
            _ = tx.closed() => return,
            res = bot
                .get_updates()
                .offset(cursor.offset)
                .timeout(timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => res,
        };

        let updates = match res {
            Ok(updates) => updates,
            Err(e) => match close_reason(&e) {
                None => {
                    if let RequestError::RetryAfter(d) = e {
                        debug!(?d, "getUpdates throttled");
                        tokio::time::sleep(d).await;
                    }
                    continue;
                }
                Some(reason) => {
                    emit(&tx, ConnectionEvent::Closed(reason)).await;
                    return;
                }
            },
        };
        if updates.is_empty() {
            continue;
        }

        let mut inbound = Vec::with_capacity(updates.len());
        for update in &updates {
            cursor.offset = cursor.offset.max(update.id + 1);
            inbound.extend(to_inbound(update, me.id));
        }

        // The cursor is persisted before delivery: a crash loses at most this batch.
        if !emit(&tx, ConnectionEvent::CredentialsUpdated(cursor.to_session())).await {
            return;
        }
        for msg in inbound {
            if !emit(&tx, ConnectionEvent::Message(msg)).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(from_id: u64, text: &str) -> Update {
        serde_json::from_str(&json!({
            "update_id": 7,
            "message": {
                "message_id": 11,
                "date": 1_766_800_000,
                "chat": { "id": 42, "type": "private", "first_name": "Ali" },
                "from": { "id": from_id, "is_bot": false, "first_name": "Ali" },
                "text": text
            }
        })
        .to_string())
        .unwrap()
    }

    #[test]
    fn token_revocation_is_a_logout() {
        assert_eq!(
            close_reason(&RequestError::Api(ApiError::NotFound)),
            Some(CloseReason::LoggedOut)
        );
    }

    #[test]
    fn competing_poller_is_a_rejection() {
        assert!(matches!(
            close_reason(&RequestError::Api(ApiError::TerminatedByOtherGetUpdates)),
            Some(CloseReason::Rejected(_))
        ));
    }

    #[test]
    fn other_api_errors_are_transient() {
        assert!(matches!(
            close_reason(&RequestError::Api(ApiError::Unknown("Bad Gateway".to_string()))),
            Some(CloseReason::ConnectionLost(_))
        ));
    }

    #[test]
    fn cursor_round_trips_through_session() {
        let s = PollCursor { offset: 901 }.to_session();
        assert_eq!(PollCursor::from_session(Some(s)), PollCursor { offset: 901 });
    }

    #[test]
    fn missing_or_foreign_session_starts_at_zero() {
        assert_eq!(PollCursor::from_session(None), PollCursor::default());
        let foreign = Session(json!({ "creds": { "me": "x" } }));
        assert_eq!(PollCursor::from_session(Some(foreign)), PollCursor::default());
    }

    #[test]
    fn message_update_maps_to_inbound() {
        let msg = to_inbound(&update(42, "report 27122025"), UserId(999)).unwrap();
        assert_eq!(msg.sender, SenderId("42".to_string()));
        assert_eq!(msg.text, "report 27122025");
        assert!(!msg.from_self);
        assert_eq!(msg.received_at.timestamp(), 1_766_800_000);
    }

    #[test]
    fn own_messages_are_flagged() {
        let msg = to_inbound(&update(999, "hello"), UserId(999)).unwrap();
        assert!(msg.from_self);
    }
}
