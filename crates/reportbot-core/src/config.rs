use std::{env, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

use crate::{errors::Error, Result};

/// What to do with an AI query that arrives inside the cooldown window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownPolicy {
    /// Reply with a "please wait" notice.
    Notify,
    /// Send nothing.
    Drop,
}

impl FromStr for CooldownPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "notify" | "wait" | "reply" => Ok(Self::Notify),
            "drop" | "silent" | "ignore" => Ok(Self::Drop),
            other => Err(Error::Config(format!(
                "AI_COOLDOWN_POLICY must be 'notify' or 'drop', got '{other}'"
            ))),
        }
    }
}

/// Language of user-facing reply texts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locale {
    En,
    Ur,
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ur" | "urdu" => Ok(Self::Ur),
            other => Err(Error::Config(format!(
                "BOT_LOCALE must be 'en' or 'ur', got '{other}'"
            ))),
        }
    }
}

/// How the report storage authenticates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriveCredentials {
    /// Service-account key JSON (`GOOGLE_DRIVE_KEY`), read-only scope.
    ServiceAccount(String),
    /// Plain API key (`GOOGLE_DRIVE_API_KEY`); the folder must be link-shared.
    ApiKey(String),
}

/// Typed configuration, read from the process environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Messaging network
    pub telegram_bot_token: String,
    pub telegram_poll_timeout: Duration,
    pub credentials_file: PathBuf,

    // Storage
    pub drive_credentials: DriveCredentials,
    pub reports_folder_id: String,

    // AI
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub ai_cooldown: Duration,
    pub ai_cooldown_policy: CooldownPolicy,

    // Connection supervision
    pub reconnect_delay: Duration,
    pub rejected_cooldown: Duration,

    // Runtime constants
    pub external_timeout: Duration,
    pub locale: Locale,
    pub report_title: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get_str = |key: &str| get(key).and_then(non_empty);
        let required = |key: &str| {
            get_str(key)
                .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
        };

        // Required env vars
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let gemini_api_key = required("GEMINI_API_KEY")?;
        let drive_credentials = match (get_str("GOOGLE_DRIVE_KEY"), get_str("GOOGLE_DRIVE_API_KEY")) {
            (Some(json), _) => DriveCredentials::ServiceAccount(json),
            (None, Some(key)) => DriveCredentials::ApiKey(key),
            (None, None) => {
                return Err(Error::Config(
                    "GOOGLE_DRIVE_KEY or GOOGLE_DRIVE_API_KEY environment variable is required"
                        .to_string(),
                ))
            }
        };
        let reports_folder_id = required("REPORTS_FOLDER_ID")?;

        let gemini_model =
            get_str("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string());
        let credentials_file = PathBuf::from(
            get_str("CREDENTIALS_FILE").unwrap_or_else(|| "auth_info/session.json".to_string()),
        );

        let ai_cooldown =
            Duration::from_millis(parse_num(&get_str, "AI_COOLDOWN_MS")?.unwrap_or(5_000));
        let ai_cooldown_policy = match get_str("AI_COOLDOWN_POLICY") {
            Some(s) => s.parse()?,
            None => CooldownPolicy::Drop,
        };

        let reconnect_delay =
            Duration::from_millis(parse_num(&get_str, "RECONNECT_DELAY_MS")?.unwrap_or(5_000));
        let rejected_cooldown =
            Duration::from_secs(parse_num(&get_str, "REJECTED_COOLDOWN_SECS")?.unwrap_or(3_600));
        let external_timeout =
            Duration::from_millis(parse_num(&get_str, "EXTERNAL_TIMEOUT_MS")?.unwrap_or(30_000));
        let telegram_poll_timeout =
            Duration::from_secs(parse_num(&get_str, "TELEGRAM_POLL_TIMEOUT_SECS")?.unwrap_or(30));

        let locale = match get_str("BOT_LOCALE") {
            Some(s) => s.parse()?,
            None => Locale::En,
        };
        let report_title = get_str("REPORT_TITLE").unwrap_or_else(|| "Surgery Report".to_string());

        if external_timeout.is_zero() {
            return Err(Error::Config(
                "EXTERNAL_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            telegram_bot_token,
            telegram_poll_timeout,
            credentials_file,
            drive_credentials,
            reports_folder_id,
            gemini_api_key,
            gemini_model,
            ai_cooldown,
            ai_cooldown_policy,
            reconnect_delay,
            rejected_cooldown,
            external_timeout,
            locale,
            report_title,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_num(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match get(key) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{s}'"))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
