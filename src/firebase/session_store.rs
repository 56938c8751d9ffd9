//! Refresh-token persistence so the operator stays signed in across runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Minimal persisted session data (`token.json`). Only the refresh token is
/// kept; id tokens are short-lived and re-minted on resume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedSession {
    pub refresh_token: String,
    pub email: String,
}

/// Stores the saved session in a local JSON file.
#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved session, if the file exists and parses.
    pub async fn load(&self) -> Option<SavedSession> {
        let data = fs::read(&self.path).await.ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Persist the session for the next run.
    pub async fn save(&self, session: &SavedSession) -> Result<()> {
        let data = serde_json::to_vec_pretty(session)?;
        fs::write(&self.path, data).await?;
        Ok(())
    }

    /// Remove the saved session (sign-out).
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
