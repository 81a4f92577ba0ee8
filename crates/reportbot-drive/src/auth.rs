//! Drive credentials: API key or service-account bearer tokens.
//!
//! Service accounts use the OAuth 2.0 JWT-bearer grant: an RS256 assertion signed
//! with the account key is exchanged for a short-lived access token, cached until
//! shortly before it expires.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use reportbot_core::{config::DriveCredentials, errors::Error, Result};

const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn fresh_at(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccount {
    /// Parse a service-account key file (the JSON downloaded from the cloud console).
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("GOOGLE_DRIVE_KEY is not a service-account key: {e}")))?;
        let key = EncodingKey::from_rsa_pem(parsed.private_key.as_bytes())
            .map_err(|e| Error::Config(format!("GOOGLE_DRIVE_KEY private_key is invalid: {e}")))?;
        Ok(Self {
            client_email: parsed.client_email,
            token_uri: parsed
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key,
            cached: Arc::new(Mutex::new(None)),
        })
    }

    fn claims(&self, issued_at: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: READONLY_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }

    /// A valid access token, fetching a new one when the cached one is stale.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.fresh_at(Instant::now())) {
            return Ok(token.value.clone());
        }

        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &self.claims(Utc::now().timestamp()),
            &self.key,
        )
        .map_err(|e| Error::External(format!("drive token signing failed: {e}")))?;

        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::External(format!("drive token request error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "drive token exchange failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("drive token json error: {e}")))?;

        debug!(expires_in = token.expires_in, "drive access token refreshed");
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }
}

/// How [`crate::DriveClient`] authenticates its requests.
pub enum DriveAuth {
    ApiKey(String),
    ServiceAccount(ServiceAccount),
}

impl DriveAuth {
    pub fn from_credentials(creds: &DriveCredentials) -> Result<Self> {
        match creds {
            DriveCredentials::ApiKey(key) => Ok(Self::ApiKey(key.clone())),
            DriveCredentials::ServiceAccount(json) => {
                Ok(Self::ServiceAccount(ServiceAccount::from_json(json)?))
            }
        }
    }
}
