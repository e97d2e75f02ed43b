//! Consent configuration: expiry window and storage location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Environment variable overriding [`ConsentConfig::expiry_days`].
pub const EXPIRY_DAYS_ENV: &str = "MOWFORCE_CONSENT_EXPIRY_DAYS";
/// Environment variable overriding [`ConsentConfig::storage_path`].
pub const STORE_PATH_ENV: &str = "MOWFORCE_CONSENT_STORE";

/// Top-level consent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentConfig {
    /// Days a consent decision stays valid before the visitor is asked again.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,
    /// File backing the persisted consent keys.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn default_expiry_days() -> u32 {
    365
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("data/consent.json")
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            storage_path: default_storage_path(),
        }
    }
}

impl ConsentConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Self {
        let expiry_days = std::env::var(EXPIRY_DAYS_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_expiry_days);

        let storage_path = std::env::var(STORE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_storage_path());

        Self {
            expiry_days,
            storage_path,
        }
    }

    /// Load config from a JSON file, or return defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring malformed consent config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Reject configurations that would expire consent immediately.
    pub fn validate(&self) -> Result<()> {
        if self.expiry_days == 0 {
            return Err(Error::Config("expiryDays must be at least 1".into()));
        }
        Ok(())
    }

    /// Expiry window as a duration.
    pub fn expiry_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }
}
