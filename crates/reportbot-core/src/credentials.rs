use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{domain::Session, utils::iso_timestamp_utc, Result};

/// Persistence for session authentication material across restarts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    /// Invalidate stored material (explicit logout).
    async fn clear(&self) -> Result<()>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CredentialFileData {
    saved_at: String,
    session: Session,
}

/// JSON-file credential store.
///
/// Writes go to a sibling temp file first and are renamed into place, so a crash
/// mid-write leaves the previous session intact.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Session>> {
        let txt = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if txt.trim().is_empty() {
            return Ok(None);
        }
        let data: CredentialFileData = serde_json::from_str(&txt)?;
        Ok(Some(data.session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = CredentialFileData {
            saved_at: iso_timestamp_utc(),
            session: session.clone(),
        };
        let txt = serde_json::to_string_pretty(&data)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, txt).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
