//! Google Drive adapter (report storage).
//!
//! Looks files up with Drive v3 `files.list`, authenticated either with a
//! service-account key (read-only scope) or with an API key, which only works for
//! folders shared as "anyone with the link". Items are served through the public
//! `uc?export=download` URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

pub mod auth;

pub use auth::DriveAuth;

use reportbot_core::{
    errors::Error,
    reports::{ReportStorage, StoredItem},
    Result,
};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

pub struct DriveClient {
    auth: DriveAuth,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

impl DriveClient {
    pub fn new(auth: DriveAuth, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("drive client build error: {e}")))?;
        Ok(Self {
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }
}

/// Drive query for an exact, non-trashed name inside one folder.
fn exact_name_query(folder_id: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and trashed = false",
        escape_literal(folder_id),
        escape_literal(name)
    )
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn first_item(list: FileList) -> Option<StoredItem> {
    list.files.into_iter().next().map(|f| StoredItem {
        id: f.id,
        name: f.name,
    })
}

#[async_trait]
impl ReportStorage for DriveClient {
    async fn find(&self, scope: &str, exact_name: &str) -> Result<Option<StoredItem>> {
        let q = exact_name_query(scope, exact_name);
        let mut req = self.http.get(self.files_url()).query(&[
            ("q", q.as_str()),
            ("fields", "files(id,name)"),
            ("pageSize", "1"),
        ]);
        req = match &self.auth {
            DriveAuth::ApiKey(key) => req.query(&[("key", key.as_str())]),
            DriveAuth::ServiceAccount(sa) => req.bearer_auth(sa.access_token(&self.http).await?),
        };

        let resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("drive request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "drive files.list failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let list: FileList = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("drive json error: {e}")))?;
        Ok(first_item(list))
    }

    fn public_url(&self, item: &StoredItem) -> String {
        format!("https://drive.google.com/uc?export=download&id={}", item.id)
    }
}
