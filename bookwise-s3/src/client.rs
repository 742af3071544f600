//! Object store client: PUT/GET/LIST/DELETE against an R2/S3-compatible bucket.
//!
//! Mutating requests are header-signed; reads use presigned URLs.

use crate::endpoint::Endpoint;
use crate::error::{ObjectStoreError, S3Result};
use crate::listing::{ListPage, ObjectSummary, parse_list_response};
use crate::signer::{RequestSigner, UNSIGNED_PAYLOAD, encode_key, encode_query_value};
use reqwest::{Client, Method, Response, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default lifetime of presigned read URLs.
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client shared by object store clients.
pub fn build_http_client() -> S3Result<Client> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Connection details for one bucket.
#[derive(Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: Endpoint,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl ObjectStoreConfig {
    /// Validates that no credential field is blank.
    pub fn new(
        endpoint: Endpoint,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> S3Result<Self> {
        let config = Self {
            endpoint,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
        };
        for (name, value) in [
            ("access key id", &config.access_key_id),
            ("secret access key", &config.secret_access_key),
            ("bucket", &config.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(ObjectStoreError::Config(format!("{name} is empty")));
            }
        }
        Ok(config)
    }
}

impl fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("endpoint", &self.endpoint.origin())
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Client for a single bucket.
pub struct ObjectStoreClient {
    http: Client,
    signer: RequestSigner,
    bucket: String,
    presign_expiry_secs: u64,
}

impl ObjectStoreClient {
    pub fn new(config: ObjectStoreConfig, http: Client) -> Self {
        Self {
            http,
            signer: RequestSigner::new(
                config.endpoint,
                config.access_key_id,
                &config.secret_access_key,
            ),
            bucket: config.bucket,
            presign_expiry_secs: DEFAULT_PRESIGN_EXPIRY_SECS,
        }
    }

    pub fn with_presign_expiry(mut self, secs: u64) -> Self {
        self.presign_expiry_secs = secs;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_path(&self, key: &str) -> String {
        format!("/{}/{}", self.bucket, encode_key(key))
    }

    /// Uploads an object. Any non-2xx response is a transport error.
    pub async fn put_object(
        &self,
        key: &str,
        body: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> S3Result<()> {
        let body = body.into();
        let size = body.len();
        self.send_signed(
            Method::PUT,
            key,
            &[("content-type", content_type)],
            Some(body),
        )
        .await?;
        debug!("uploaded {size} bytes to {}/{key}", self.bucket);
        Ok(())
    }

    /// Deletes an object. Any non-2xx response is a transport error.
    pub async fn delete_object(&self, key: &str) -> S3Result<()> {
        self.send_signed(Method::DELETE, key, &[], None).await?;
        debug!("deleted {}/{key}", self.bucket);
        Ok(())
    }

    /// Fetches an object as text. HTTP 404 maps to [`ObjectStoreError::NotFound`].
    pub async fn get_object(&self, key: &str) -> S3Result<String> {
        let url = self
            .signer
            .presign("GET", &self.object_path(key), self.presign_expiry_secs, None);
        let resp = self.http.get(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let body = check_status(resp).await?.text().await?;
        debug!("downloaded {} bytes from {}/{key}", body.len(), self.bucket);
        Ok(body)
    }

    /// Lists every object under `prefix`, following truncated pages.
    pub async fn list_objects(&self, prefix: &str) -> S3Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self.list_page(prefix, marker.as_deref()).await?;
            let last_key = page.objects.last().map(|o| o.key.clone());
            objects.extend(page.objects);

            if !page.is_truncated {
                break;
            }
            let next = page.next_marker.or(last_key);
            if next.is_none() || next == marker {
                warn!("truncated listing for prefix {prefix:?} gave no usable marker, stopping");
                break;
            }
            marker = next;
        }

        debug!("listed {} objects under {prefix:?}", objects.len());
        Ok(objects)
    }

    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> S3Result<ListPage> {
        let mut params = Vec::new();
        if !prefix.is_empty() {
            params.push(format!("prefix={}", encode_query_value(prefix)));
        }
        if let Some(marker) = marker {
            params.push(format!("marker={}", encode_query_value(marker)));
        }
        let path = format!("/{}/?{}", self.bucket, params.join("&"));

        let url = self
            .signer
            .presign("GET", &path, self.presign_expiry_secs, None);
        let resp = self.http.get(&url).send().await?;
        let xml = check_status(resp).await?.text().await?;
        parse_list_response(&xml)
    }

    async fn send_signed(
        &self,
        method: Method,
        key: &str,
        headers: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> S3Result<()> {
        let path = self.object_path(key);
        let mut all_headers = headers.to_vec();
        all_headers.push(("x-amz-content-sha256", UNSIGNED_PAYLOAD));

        let signed = self.signer.sign(method.as_str(), &path, &all_headers, None);

        let url = format!("{}{path}", self.signer.endpoint().origin());
        let mut req = self
            .http
            .request(method, &url)
            .header("authorization", &signed.authorization);
        // reqwest derives Host from the URL, matching the signed value.
        for (name, value) in signed.headers.iter().filter(|(k, _)| k.as_str() != "host") {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        check_status(req.send().await?).await?;
        Ok(())
    }
}

/// Passes 2xx responses through; anything else becomes a transport error.
async fn check_status(resp: Response) -> S3Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ObjectStoreError::Transport {
        status: status.as_u16(),
        body,
    })
}
