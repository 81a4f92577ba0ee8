use std::sync::Arc;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use reportbot_core::{
    ai::AiResponder,
    config::Config,
    credentials::FileCredentialStore,
    dispatcher::Dispatcher,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    replies::ReplyTexts,
    reports::ReportResolver,
    supervisor::{ConnectionState, ReconnectPolicy, Supervisor, SupervisorExit},
};
use reportbot_drive::{DriveAuth, DriveClient};
use reportbot_gemini::GeminiClient;

use crate::{connector::TelegramConnector, TelegramMessenger};

/// Extra headroom on the HTTP client beyond the long-poll window.
const POLL_SLACK: std::time::Duration = std::time::Duration::from_secs(10);

fn build_bot(cfg: &Config) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(cfg.telegram_poll_timeout + POLL_SLACK)
        .build()?;
    Ok(Bot::with_client(cfg.telegram_bot_token.clone(), client))
}

fn build_dispatcher(cfg: &Config) -> anyhow::Result<Dispatcher> {
    let drive = Arc::new(DriveClient::new(
        DriveAuth::from_credentials(&cfg.drive_credentials)?,
        cfg.external_timeout,
    )?);
    let reports = ReportResolver::new(
        drive,
        cfg.reports_folder_id.clone(),
        cfg.report_title.clone(),
        cfg.external_timeout,
    );

    let gemini = Arc::new(GeminiClient::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
        cfg.external_timeout,
    )?);
    let ai = AiResponder::new(
        gemini,
        cfg.ai_cooldown,
        cfg.ai_cooldown_policy,
        cfg.external_timeout,
    );

    Ok(Dispatcher::new(reports, ai, ReplyTexts::new(cfg.locale)))
}

/// Wire adapters into the supervisor and run until shutdown or a terminal closure.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<SupervisorExit> {
    let bot = build_bot(&cfg)?;

    // Replies are throttled; the Telegram adapter still retries a single 429 RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let connector = Arc::new(TelegramConnector::new(
        bot,
        messenger,
        cfg.telegram_poll_timeout,
    ));
    let store = Arc::new(FileCredentialStore::new(cfg.credentials_file.clone()));
    info!(
        folder = %cfg.reports_folder_id,
        model = %cfg.gemini_model,
        credentials = %store.path().display(),
        "reportbot starting"
    );
    let dispatcher = Arc::new(build_dispatcher(&cfg)?);

    let supervisor = Supervisor::new(
        connector,
        store,
        dispatcher,
        ReconnectPolicy {
            transient_delay: cfg.reconnect_delay,
            rejected_cooldown: cfg.rejected_cooldown,
        },
    );

    let mut states = supervisor.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if state == ConnectionState::Open {
                info!("bot is online");
            }
        }
    });

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
            }
        });
    }

    Ok(supervisor.run(shutdown).await)
}
