//! Typed sync settings schema.
//!
//! Every field carries a sensitivity tag through [`SettingsField`]. Export
//! and `Debug` output clear the sensitive ones; import copies only the rest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials, enablement and watermark for note sync.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncSettings {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Replaces the account-derived endpoint (MinIO, tests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_override: Option<String>,
    #[serde(rename = "isEnabled")]
    pub enabled: bool,
    /// Watermark, epoch milliseconds.
    pub last_sync_time: i64,
}

/// Fields of [`SyncSettings`], in schema order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingsField {
    AccountId,
    AccessKeyId,
    SecretAccessKey,
    BucketName,
    EndpointOverride,
    Enabled,
    LastSyncTime,
}

impl SettingsField {
    pub const ALL: [SettingsField; 7] = [
        SettingsField::AccountId,
        SettingsField::AccessKeyId,
        SettingsField::SecretAccessKey,
        SettingsField::BucketName,
        SettingsField::EndpointOverride,
        SettingsField::Enabled,
        SettingsField::LastSyncTime,
    ];

    /// Key used in the persisted JSON document.
    pub fn json_key(self) -> &'static str {
        match self {
            SettingsField::AccountId => "accountId",
            SettingsField::AccessKeyId => "accessKeyId",
            SettingsField::SecretAccessKey => "secretAccessKey",
            SettingsField::BucketName => "bucketName",
            SettingsField::EndpointOverride => "endpointOverride",
            SettingsField::Enabled => "isEnabled",
            SettingsField::LastSyncTime => "lastSyncTime",
        }
    }

    pub fn is_sensitive(self) -> bool {
        matches!(
            self,
            SettingsField::AccountId | SettingsField::AccessKeyId | SettingsField::SecretAccessKey
        )
    }
}

impl SyncSettings {
    /// All four credential fields are non-empty.
    pub fn is_configured(&self) -> bool {
        [
            &self.account_id,
            &self.access_key_id,
            &self.secret_access_key,
            &self.bucket_name,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.is_configured()
    }

    /// Copy with every sensitive field cleared.
    pub fn redacted(&self) -> SyncSettings {
        let mut out = self.clone();
        for field in SettingsField::ALL.into_iter().filter(|f| f.is_sensitive()) {
            out.reset_field(field);
        }
        out
    }

    /// Copies the non-sensitive fields of `other` into `self`.
    pub fn merge_non_sensitive(&mut self, other: &SyncSettings) {
        for field in SettingsField::ALL.into_iter().filter(|f| !f.is_sensitive()) {
            self.copy_field(field, other);
        }
    }

    fn reset_field(&mut self, field: SettingsField) {
        self.copy_field(field, &SyncSettings::default());
    }

    fn copy_field(&mut self, field: SettingsField, from: &SyncSettings) {
        match field {
            SettingsField::AccountId => self.account_id = from.account_id.clone(),
            SettingsField::AccessKeyId => self.access_key_id = from.access_key_id.clone(),
            SettingsField::SecretAccessKey => {
                self.secret_access_key = from.secret_access_key.clone()
            }
            SettingsField::BucketName => self.bucket_name = from.bucket_name.clone(),
            SettingsField::EndpointOverride => {
                self.endpoint_override = from.endpoint_override.clone()
            }
            SettingsField::Enabled => self.enabled = from.enabled,
            SettingsField::LastSyncTime => self.last_sync_time = from.last_sync_time,
        }
    }
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &str| if v.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("SyncSettings")
            .field("account_id", &mask(&self.account_id))
            .field("access_key_id", &mask(&self.access_key_id))
            .field("secret_access_key", &mask(&self.secret_access_key))
            .field("bucket_name", &self.bucket_name)
            .field("endpoint_override", &self.endpoint_override)
            .field("enabled", &self.enabled)
            .field("last_sync_time", &self.last_sync_time)
            .finish()
    }
}
