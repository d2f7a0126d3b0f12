//! Run configuration, loaded from environment variables at startup.

use crate::error::{BackupError, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// File-name format of the first backups; `%m` sits where the minutes belong.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%m%S";

/// Portal address and credentials used for sign-in.
#[derive(Clone)]
pub struct PortalConfig {
    /// Portal root (default: `"https://www.arcgis.com"`).
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub portal: PortalConfig,

    /// Directory the backup file is written to (default: `"."`).
    pub backup_dir: PathBuf,

    /// File-name prefix of the backup (default: `"parks"`).
    pub backup_prefix: String,

    /// Replay the legacy file-name timestamp.
    pub legacy_timestamp: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,reqwest=warn"`.
    pub log_level: String,
}

impl Config {
    /// Build [`Config`] from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from any key lookup; the credentials are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BackupError::Config(format!("{key} must be set")))
        };

        Ok(Self {
            portal: PortalConfig {
                url: env_or("AGOL_URL", "https://www.arcgis.com"),
                username: required("AGOL_USERNAME")?,
                password: required("AGOL_PASSWORD")?,
            },
            backup_dir: PathBuf::from(env_or("AGOL_BACKUP_DIR", ".")),
            backup_prefix: env_or("AGOL_BACKUP_PREFIX", "parks"),
            legacy_timestamp: lookup("AGOL_LEGACY_TIMESTAMP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_level: env_or("AGOL_LOG", "info"),
        })
    }

    /// Path of the backup file for a run started at `started`.
    pub fn output_path(&self, started: NaiveDateTime) -> PathBuf {
        let format = if self.legacy_timestamp {
            LEGACY_TIMESTAMP_FORMAT
        } else {
            TIMESTAMP_FORMAT
        };
        self.backup_dir.join(format!(
            "{}_{}.gpkg",
            self.backup_prefix,
            started.format(format)
        ))
    }
}
