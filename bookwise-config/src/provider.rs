//! Settings access consumed by the sync engine.

use crate::error::ConfigResult;
use crate::settings::SyncSettings;
use async_trait::async_trait;

/// Source of sync credentials and owner of the watermark.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Current settings snapshot.
    async fn sync_settings(&self) -> ConfigResult<SyncSettings>;

    /// Persists a new watermark (epoch milliseconds).
    async fn set_watermark(&self, timestamp_ms: i64) -> ConfigResult<()>;
}
