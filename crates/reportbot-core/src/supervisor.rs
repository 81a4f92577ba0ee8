//! Connection supervisor: one logical session, an explicit reconnect state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Closed(reason) -> Connecting ...
//!                     |                      |
//!                     +--> Closed(reason) ---+--> Disconnected (terminal)
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use crate::{
    credentials::CredentialStore,
    domain::{InboundMessage, Session},
    messaging::{
        port::MessagingPort,
        types::{CloseReason, ConnectionEvent},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed(CloseReason),
}

/// A live connection handed out by a [`NetworkConnector`].
pub struct Connection {
    pub events: mpsc::Receiver<ConnectionEvent>,
    pub outbound: Arc<dyn MessagingPort>,
}

/// Hexagonal port for the messaging-network client library.
#[async_trait]
pub trait NetworkConnector: Send + Sync {
    /// Open a session, resuming from `session` when available.
    async fn connect(&self, session: Option<Session>) -> Result<Connection>;
}

/// Receives every inbound message of an open session, one task per message.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn on_message(&self, msg: InboundMessage, out: Arc<dyn MessagingPort>);
}

/// Renders an out-of-band pairing code for the operator.
pub trait PairingPresenter: Send + Sync {
    fn present(&self, token: &str);
}

/// Default presenter: writes the code to the log.
pub struct LogPairingPresenter;

impl PairingPresenter for LogPairingPresenter {
    fn present(&self, token: &str) {
        warn!(token, "pairing requested: scan or enter this code on the account device");
    }
}

/// What to do after a closure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    RetryAfter(Duration),
    Terminal,
}

#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    /// Delay before retrying a transient closure.
    pub transient_delay: Duration,
    /// Wait before the single retry allowed after a rejection.
    pub rejected_cooldown: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            transient_delay: Duration::from_secs(5),
            rejected_cooldown: Duration::from_secs(60 * 60),
        }
    }
}

impl ReconnectPolicy {
    /// Classify a closure. `rejections` counts rejections since the session was last open.
    pub fn decide(&self, reason: &CloseReason, rejections: u32) -> Recovery {
        match reason {
            CloseReason::LoggedOut => Recovery::Terminal,
            CloseReason::Rejected(_) if rejections == 0 => {
                Recovery::RetryAfter(self.rejected_cooldown)
            }
            CloseReason::Rejected(_) => Recovery::Terminal,
            CloseReason::ConnectionLost(_) | CloseReason::TimedOut | CloseReason::StreamEnded => {
                Recovery::RetryAfter(self.transient_delay)
            }
        }
    }
}

/// Why [`Supervisor::run`] returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorExit {
    Shutdown,
    LoggedOut,
    Rejected(String),
}

pub struct Supervisor {
    connector: Arc<dyn NetworkConnector>,
    store: Arc<dyn CredentialStore>,
    handler: Arc<dyn InboundHandler>,
    pairing: Arc<dyn PairingPresenter>,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    tasks: TaskTracker,
}

impl Supervisor {
    pub fn new(
        connector: Arc<dyn NetworkConnector>,
        store: Arc<dyn CredentialStore>,
        handler: Arc<dyn InboundHandler>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            store,
            handler,
            pairing: Arc::new(LogPairingPresenter),
            policy,
            state,
            tasks: TaskTracker::new(),
        }
    }

    pub fn with_pairing_presenter(mut self, pairing: Arc<dyn PairingPresenter>) -> Self {
        self.pairing = pairing;
        self
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    fn set_state(&self, next: ConnectionState) {
        debug!(state = ?next, "connection state");
        self.state.send_replace(next);
    }

    /// Keep the session alive until shutdown or an unrecoverable closure.
    ///
    /// In-flight message handlers are awaited before returning.
    pub async fn run(&self, shutdown: CancellationToken) -> SupervisorExit {
        let exit = self.supervise(&shutdown).await;
        self.set_state(ConnectionState::Disconnected);

        self.tasks.close();
        self.tasks.wait().await;
        info!(?exit, "supervisor stopped");
        exit
    }

    async fn supervise(&self, shutdown: &CancellationToken) -> SupervisorExit {
        let mut rejections = 0u32;

        loop {
            self.set_state(ConnectionState::Connecting);
            let session = match self.store.load().await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to load stored credentials; starting fresh");
                    None
                }
            };
            if session.is_none() {
                info!("no stored session; the network may request pairing");
            }

            let mut opened = false;
            let reason = match self.connector.connect(session).await {
                Ok(conn) => match self.drive(conn, shutdown, &mut opened).await {
                    Some(reason) => reason,
                    None => return SupervisorExit::Shutdown,
                },
                Err(e) => CloseReason::ConnectionLost(format!("connect failed: {e}")),
            };

            if opened {
                rejections = 0;
            }
            self.set_state(ConnectionState::Closed(reason.clone()));

            let delay = match self.policy.decide(&reason, rejections) {
                Recovery::Terminal => return self.terminal(reason).await,
                Recovery::RetryAfter(delay) => delay,
            };
            if matches!(reason, CloseReason::Rejected(_)) {
                rejections += 1;
            }
            warn!(?reason, retry_in_secs = delay.as_secs_f64(), "connection closed; reconnecting");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SupervisorExit::Shutdown,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn terminal(&self, reason: CloseReason) -> SupervisorExit {
        match reason {
            CloseReason::LoggedOut => {
                error!("session logged out by the network; re-authentication required");
                if let Err(e) = self.store.clear().await {
                    error!(error = %e, "failed to clear stale credentials");
                }
                SupervisorExit::LoggedOut
            }
            other => {
                let detail = match other {
                    CloseReason::Rejected(detail) => detail,
                    o => format!("{o:?}"),
                };
                error!(%detail, "session rejected again after cooldown; giving up");
                SupervisorExit::Rejected(detail)
            }
        }
    }

    /// Pump one connection's events. Returns `None` on shutdown.
    async fn drive(
        &self,
        mut conn: Connection,
        shutdown: &CancellationToken,
        opened: &mut bool,
    ) -> Option<CloseReason> {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                ev = conn.events.recv() => ev,
            };

            match event {
                None => return Some(CloseReason::StreamEnded),
                Some(ConnectionEvent::Closed(reason)) => return Some(reason),
                Some(ConnectionEvent::PairingRequested(token)) => self.pairing.present(&token),
                Some(ConnectionEvent::CredentialsUpdated(session)) => {
                    // Saved inline, before the next event is read.
                    if let Err(e) = self.store.save(&session).await {
                        error!(error = %e, "failed to persist credentials");
                    }
                }
                Some(ConnectionEvent::Open) => {
                    *opened = true;
                    self.set_state(ConnectionState::Open);
                    info!("session open");
                }
                Some(ConnectionEvent::Message(msg)) => {
                    if !*opened {
                        warn!(sender = %msg.sender, "message before session open; dropped");
                        continue;
                    }
                    let handler = self.handler.clone();
                    let out = conn.outbound.clone();
                    self.tasks.spawn(async move {
                        handler.on_message(msg, out).await;
                    });
                }
            }
        }
    }
}
