use std::sync::Arc;

use reportbot_core::{config::Config, supervisor::SupervisorExit};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), reportbot_core::Error> {
    reportbot_core::logging::init("reportbot")?;

    let cfg = Arc::new(Config::load()?);

    let exit = reportbot_telegram::router::run(cfg.clone())
        .await
        .map_err(|e| reportbot_core::Error::External(format!("reportbot failed: {e}")))?;

    // Terminal closures exit cleanly: an automatic restart would only repeat them.
    match exit {
        SupervisorExit::Shutdown => info!("stopped"),
        SupervisorExit::LoggedOut => error!(
            credentials = %cfg.credentials_file.display(),
            "session was logged out; stored credentials were cleared, check TELEGRAM_BOT_TOKEN and restart"
        ),
        SupervisorExit::Rejected(reason) => error!(
            %reason,
            "network rejected the session twice; stop other clients using this token and restart"
        ),
    }
    Ok(())
}
