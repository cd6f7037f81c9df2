use crate::error::Result;
use crate::workspace::Snapshot;
use chrono::{DateTime, Utc};
use okrfolio_common::types::UserProfile;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

/// What survives a client restart: the bearer token and the last snapshot.
///
/// Only used to paint something before the first fetch completes. The
/// server re-validates the token on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub snapshot: Snapshot,
    pub saved_at: Option<DateTime<Utc>>,
}

impl Session {
    /// `Ok(None)` when no session was saved. An unreadable file is logged
    /// and treated the same way.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable session file");
                Ok(None)
            }
        }
    }

    /// Writes a temporary sibling file, then renames it over `path`.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn clear(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
