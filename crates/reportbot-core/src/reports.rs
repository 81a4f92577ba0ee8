//! Daily and monthly report lookups against the storage collaborator.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    commands::Month,
    messaging::types::{OutboundMessage, XLSX_MIME},
    replies::Outcome,
    utils::with_timeout,
    Result,
};

/// A stored file, as returned by an exact-name lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredItem {
    pub id: String,
    pub name: String,
}

/// Hexagonal port for the object storage that holds report files.
#[async_trait]
pub trait ReportStorage: Send + Sync {
    /// Find the item named exactly `exact_name` inside collection `scope`.
    async fn find(&self, scope: &str, exact_name: &str) -> Result<Option<StoredItem>>;

    /// Publicly fetchable URL the messenger can attach.
    fn public_url(&self, item: &StoredItem) -> String;
}

pub fn daily_file_name(date_key: &str) -> String {
    format!("{date_key}.png")
}

pub fn monthly_file_name(month: Month, year: u16) -> String {
    format!("Monthly_Report_{}_{year}.xlsx", month.name())
}

pub struct ReportResolver {
    storage: Arc<dyn ReportStorage>,
    scope: String,
    title: String,
    timeout: Duration,
}

impl ReportResolver {
    pub fn new(
        storage: Arc<dyn ReportStorage>,
        scope: impl Into<String>,
        title: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            storage,
            scope: scope.into(),
            title: title.into(),
            timeout,
        }
    }

    pub async fn daily(&self, date_key: &str) -> Outcome {
        let file_name = daily_file_name(date_key);
        self.resolve(file_name, |url, _item| OutboundMessage::Image {
            url,
            caption: Some(format!("📄 {}\n🗓 {date_key}", self.title)),
        })
        .await
    }

    pub async fn monthly(&self, month: Month, year: u16) -> Outcome {
        let file_name = monthly_file_name(month, year);
        self.resolve(file_name, |url, item| OutboundMessage::Document {
            url,
            file_name: item.name.clone(),
            mime_type: XLSX_MIME.to_string(),
            caption: Some(format!("📊 Monthly {}\n🗓 {} {year}", self.title, month.name())),
        })
        .await
    }

    async fn resolve(
        &self,
        file_name: String,
        build: impl FnOnce(String, &StoredItem) -> OutboundMessage,
    ) -> Outcome {
        let lookup = with_timeout(self.timeout, self.storage.find(&self.scope, &file_name)).await;
        match lookup {
            Ok(Some(item)) => {
                info!(file = %item.name, id = %item.id, "report found");
                let url = self.storage.public_url(&item);
                Outcome::Reply(build(url, &item))
            }
            Ok(None) => {
                info!(file = %file_name, "report not found");
                Outcome::NotFound { file_name }
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "report lookup failed");
                Outcome::Failed
            }
        }
    }
}
