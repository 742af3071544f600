//! JSON-file settings persistence.
//!
//! The document is an [`AppConfig`]. Secrets are stored in cleartext; protect
//! the file with filesystem permissions. Writes go to a sibling temp file
//! which is then renamed over the target.

use crate::error::ConfigResult;
use crate::provider::SettingsProvider;
use crate::settings::SyncSettings;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Current settings document version.
pub const CONFIG_VERSION: &str = "1.0.0";

/// Persisted settings document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Empty when absent, which forces a migration on load.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub sync: SyncSettings,
    /// Epoch milliseconds of the last save.
    #[serde(default)]
    pub last_updated: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            sync: SyncSettings::default(),
            last_updated: 0,
        }
    }
}

/// Settings store backed by one JSON file.
pub struct FileSettingsStore {
    path: PathBuf,
    config: Mutex<AppConfig>,
}

impl FileSettingsStore {
    /// Loads the document at `path`. A missing file yields defaults without
    /// writing anything; an outdated version is migrated and saved.
    pub async fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let config = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let mut config: AppConfig = serde_json::from_str(&raw)?;
                if config.version != CONFIG_VERSION {
                    info!(
                        "migrating settings from version {:?} to {CONFIG_VERSION}",
                        config.version
                    );
                    config.version = CONFIG_VERSION.to_string();
                    config.last_updated = Utc::now().timestamp_millis();
                    write_document(&path, &config).await?;
                }
                config
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no settings file at {}, using defaults", path.display());
                AppConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            config: Mutex::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the whole document.
    pub async fn config(&self) -> AppConfig {
        self.config.lock().await.clone()
    }

    /// Applies `f` to the sync settings and saves. The in-memory state only
    /// changes once the write succeeds.
    pub async fn update<F>(&self, f: F) -> ConfigResult<SyncSettings>
    where
        F: FnOnce(&mut SyncSettings),
    {
        let mut guard = self.config.lock().await;
        let mut next = guard.clone();
        f(&mut next.sync);
        next.last_updated = Utc::now().timestamp_millis();
        write_document(&self.path, &next).await?;
        *guard = next;
        Ok(guard.sync.clone())
    }

    pub async fn enable(&self) -> ConfigResult<()> {
        self.update(|s| s.enabled = true).await.map(|_| ())
    }

    pub async fn disable(&self) -> ConfigResult<()> {
        self.update(|s| s.enabled = false).await.map(|_| ())
    }

    /// Restores every sync field, credentials included, to its default.
    pub async fn reset(&self) -> ConfigResult<()> {
        self.update(|s| *s = SyncSettings::default()).await.map(|_| ())
    }

    /// Pretty JSON of the document with sensitive fields cleared.
    pub async fn export_redacted(&self) -> ConfigResult<String> {
        let mut export = self.config().await;
        export.sync = export.sync.redacted();
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Imports a previously exported document. Only non-sensitive fields are
    /// taken; local credentials are left untouched.
    pub async fn import_non_sensitive(&self, json: &str) -> ConfigResult<()> {
        let incoming: AppConfig = serde_json::from_str(json)?;
        self.update(|s| s.merge_non_sensitive(&incoming.sync)).await?;
        info!("imported settings from version {:?}", incoming.version);
        Ok(())
    }
}

#[async_trait]
impl SettingsProvider for FileSettingsStore {
    async fn sync_settings(&self) -> ConfigResult<SyncSettings> {
        Ok(self.config.lock().await.sync.clone())
    }

    async fn set_watermark(&self, timestamp_ms: i64) -> ConfigResult<()> {
        self.update(|s| s.last_sync_time = timestamp_ms).await?;
        debug!("watermark set to {timestamp_ms}");
        Ok(())
    }
}

async fn write_document(path: &Path, config: &AppConfig) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
