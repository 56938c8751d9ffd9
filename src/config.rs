//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Firebase project identifiers used by the worker.
    pub firebase: FirebaseCfg,
    /// Synchronization tuning.
    pub sync: SyncCfg,
}

/// Firebase REST API identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseCfg {
    /// Web API key of the Firebase project.
    pub api_key: String,
    /// Firestore project id.
    pub project_id: String,
    /// Collection holding the job documents.
    pub jobs_collection: String,
}

/// Snapshot polling behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCfg {
    /// Seconds between full job-set refreshes.
    pub poll_secs: u64,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    /// Whether the Firebase identifiers required for sync are present.
    pub fn is_complete(&self) -> bool {
        !self.firebase.api_key.is_empty() && !self.firebase.project_id.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firebase: FirebaseCfg {
                api_key: "".into(),
                project_id: "".into(),
                jobs_collection: "servicos".into(),
            },
            sync: SyncCfg { poll_secs: 15 },
        }
    }
}
