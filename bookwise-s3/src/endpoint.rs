//! Object store endpoint resolution.

use crate::error::{ObjectStoreError, S3Result};
use reqwest::Url;

/// Storage domain for account-derived R2 endpoints.
pub const R2_STORAGE_DOMAIN: &str = "r2.cloudflarestorage.com";

/// A validated object store endpoint.
///
/// Only the origin is kept. Request paths are always absolute
/// (`/<bucket>/<key>`), so any path on the configured URL is ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    origin: String,
    host: String,
}

impl Endpoint {
    /// Parses an endpoint URL. It must use `http://` or `https://`.
    pub fn parse(url: &str) -> S3Result<Self> {
        let trimmed = url.trim();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ObjectStoreError::Config(format!(
                "endpoint URL must start with http:// or https:// (got {trimmed:?})"
            )));
        }
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let parsed = Url::parse(trimmed)
            .map_err(|e| ObjectStoreError::Config(format!("invalid endpoint URL {trimmed:?}: {e}")))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ObjectStoreError::Config(format!("endpoint URL {trimmed:?} has no host")))?;

        // Url::port() is None for the scheme's default port, which is
        // exactly what the signed host header must omit.
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            origin: format!("{}://{host}", parsed.scheme()),
            host,
        })
    }

    /// Derives the R2 endpoint for an account id.
    pub fn for_account(account_id: &str) -> S3Result<Self> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(ObjectStoreError::Config("account id is empty".to_string()));
        }
        Self::parse(&format!("https://{account_id}.{R2_STORAGE_DOMAIN}"))
    }

    /// Uses `override_url` when set, otherwise the account-derived endpoint.
    pub fn resolve(account_id: &str, override_url: Option<&str>) -> S3Result<Self> {
        match override_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::parse(url),
            None => Self::for_account(account_id),
        }
    }

    /// `scheme://host[:port]`, no trailing slash.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Value for the signed `host` header.
    pub fn host(&self) -> &str {
        &self.host
    }
}
