//! Object store access for Bookwise note sync.
//!
//! Provides:
//! - AWS Signature Version 4 signing (header and presigned variants),
//!   implemented directly on HMAC-SHA256 with region `auto`
//! - An async client for PUT/GET/LIST/DELETE on R2/S3-compatible buckets
//! - Bucket listing XML parsing

pub mod client;
pub mod endpoint;
pub mod error;
pub mod listing;
pub mod signer;

pub use client::{DEFAULT_PRESIGN_EXPIRY_SECS, ObjectStoreClient, ObjectStoreConfig, build_http_client};
pub use endpoint::Endpoint;
pub use error::{ObjectStoreError, S3Result};
pub use listing::ObjectSummary;
pub use signer::{RequestSigner, SignedRequest};

/// HTTP client type accepted by [`ObjectStoreClient::new`].
pub use reqwest::Client as HttpClient;
