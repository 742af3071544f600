//! Sync settings for Bookwise.
//!
//! - [`SyncSettings`]: typed schema with per-field sensitivity
//! - [`SettingsProvider`]: what the sync engine reads and writes
//! - [`FileSettingsStore`]: JSON-file backed provider

pub mod error;
pub mod file_store;
pub mod provider;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use file_store::{AppConfig, CONFIG_VERSION, FileSettingsStore};
pub use provider::SettingsProvider;
pub use settings::{SettingsField, SyncSettings};
