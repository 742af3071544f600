//! Note sync engine.
//!
//! One cycle:
//! - uploads every local note changed since the watermark
//! - lists remote notes modified since the watermark, downloads them and
//!   applies last-write-wins against the local store
//! - advances the watermark once both phases have drained
//!
//! Per-item failures are recorded in the [`SyncReport`] and never abort the
//! rest of the cycle.

use crate::conflict::{self, Resolution};
use crate::error::{SyncError, SyncResult};
use crate::note::{JSON_CONTENT_TYPE, NOTE_KEY_SUFFIX, NOTES_PREFIX, Note, NoteEnvelope, note_id_from_key};
use crate::store::LocalNoteStore;

use bookwise_config::{SettingsProvider, SyncSettings};
use bookwise_s3::{
    DEFAULT_PRESIGN_EXPIRY_SECS, Endpoint, HttpClient, ObjectStoreClient, ObjectStoreConfig,
    ObjectStoreError, build_http_client,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

const DEFAULT_CONCURRENCY: usize = 4;

const NETWORK_FAILURE_HINT: &str = "Network connection failed. Please check: \
    1. Internet connection 2. Account ID format 3. Credentials 4. Firewall/proxy settings";

/// Tuning knobs for [`SyncEngine`].
#[derive(Clone, Debug)]
pub struct SyncOptions {
    /// Items in flight per phase. Values below 1 are treated as 1.
    pub concurrency: usize,
    /// Lifetime of presigned read URLs.
    pub presign_expiry_secs: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            presign_expiry_secs: DEFAULT_PRESIGN_EXPIRY_SECS,
        }
    }
}

/// Outcome of one full cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub downloaded: usize,
    /// One entry per failed item or phase.
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Holds the in-progress flag for the lifetime of a cycle.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Bidirectional last-write-wins sync between a local store and one bucket.
pub struct SyncEngine<S, P> {
    store: Arc<S>,
    settings: Arc<P>,
    options: SyncOptions,
    http: HttpClient,
    in_progress: AtomicBool,
}

impl<S, P> SyncEngine<S, P>
where
    S: LocalNoteStore,
    P: SettingsProvider,
{
    pub fn new(store: Arc<S>, settings: Arc<P>, options: SyncOptions) -> SyncResult<Self> {
        Ok(Self::with_http_client(store, settings, options, build_http_client()?))
    }

    /// Uses a caller-supplied HTTP client (shared connection pool, custom TLS).
    pub fn with_http_client(
        store: Arc<S>,
        settings: Arc<P>,
        options: SyncOptions,
        http: HttpClient,
    ) -> Self {
        Self {
            store,
            settings,
            options,
            http,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_sync_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Runs one full cycle.
    ///
    /// Fails without side effects when sync is disabled, the credentials are
    /// incomplete, or another cycle is running. Otherwise always returns a
    /// report, even if every item failed.
    pub async fn sync(&self) -> SyncResult<SyncReport> {
        let settings = self.settings.sync_settings().await?;
        if !settings.is_enabled() {
            return Err(SyncError::Config(
                "sync is disabled or credentials are incomplete".to_string(),
            ));
        }
        let _guard = CycleGuard::acquire(&self.in_progress).ok_or(SyncError::AlreadyInProgress)?;
        let client = self.client_for(&settings)?;

        let watermark = settings.last_sync_time;
        info!("sync started, watermark {watermark}");
        let mut report = SyncReport::default();

        match self.upload_changes(&client, watermark, &mut report.errors).await {
            Ok(count) => report.uploaded = count,
            Err(e) => {
                warn!("upload phase failed: {e}");
                report.errors.push(format!("upload failed: {e}"));
            }
        }

        match self.download_changes(&client, watermark, &mut report.errors).await {
            Ok(count) => report.downloaded = count,
            Err(e) => {
                warn!("download phase failed: {e}");
                report.errors.push(format!("download failed: {e}"));
            }
        }

        let next = now_ms().max(watermark);
        if let Err(e) = self.settings.set_watermark(next).await {
            warn!("failed to persist watermark {next}: {e}");
            report.errors.push(format!("watermark update failed: {e}"));
        }

        info!(
            "sync finished: {} uploaded, {} downloaded, {} errors",
            report.uploaded,
            report.downloaded,
            report.errors.len()
        );
        Ok(report)
    }

    /// Uploads a single note after a local create or update. No-op while
    /// sync is disabled.
    pub async fn sync_one(&self, note: &Note) -> SyncResult<()> {
        let settings = self.settings.sync_settings().await?;
        if !settings.is_enabled() {
            debug!("sync disabled, not uploading note {}", note.id);
            return Ok(());
        }
        let client = self.client_for(&settings)?;
        upload_note(&client, note).await
    }

    /// Tombstones a note locally, then mirrors the tombstone remotely when
    /// sync is enabled. A failed remote step restores the local note.
    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        let settings = self.settings.sync_settings().await?;
        let mut note = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SyncError::NoteNotFound(id.to_string()))?;

        let now = now_ms();
        note.tombstone(now);
        self.store.put(&note).await?;

        if !settings.is_enabled() {
            debug!("sync disabled, note {id} tombstoned locally only");
            return Ok(());
        }

        if let Err(e) = self.propagate_tombstone(&settings, &note, now).await {
            warn!("remote delete of note {id} failed, restoring local copy: {e}");
            // updateTime stays at the tombstone time so the restored note re-uploads.
            note.is_delete = None;
            if let Err(rollback) = self.store.put(&note).await {
                error!("failed to restore note {id} after failed remote delete: {rollback}");
            }
            return Err(e);
        }

        info!("note {id} deleted locally and remotely");
        Ok(())
    }

    /// Lists the bucket to check credentials and reachability.
    pub async fn test_connection(&self) -> SyncResult<bool> {
        let settings = self.settings.sync_settings().await?;
        if !settings.is_configured() {
            return Err(SyncError::Config(
                "Configuration incomplete. Please fill in all required fields.".to_string(),
            ));
        }
        let client = self.client_for(&settings)?;

        match client.list_objects("").await {
            Ok(objects) => {
                info!(
                    "connection test succeeded, {} objects in bucket {}",
                    objects.len(),
                    client.bucket()
                );
                Ok(true)
            }
            Err(e) => {
                warn!("connection test failed: {e}");
                Err(SyncError::ConnectionTest(connection_failure_message(&e)))
            }
        }
    }

    fn client_for(&self, settings: &SyncSettings) -> SyncResult<ObjectStoreClient> {
        let endpoint = Endpoint::resolve(&settings.account_id, settings.endpoint_override.as_deref())
            .map_err(config_error)?;
        let config = ObjectStoreConfig::new(
            endpoint,
            settings.access_key_id.as_str(),
            settings.secret_access_key.as_str(),
            settings.bucket_name.as_str(),
        )
        .map_err(config_error)?;
        Ok(ObjectStoreClient::new(config, self.http.clone())
            .with_presign_expiry(self.options.presign_expiry_secs))
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    async fn upload_changes(
        &self,
        client: &ObjectStoreClient,
        watermark: i64,
        errors: &mut Vec<String>,
    ) -> SyncResult<usize> {
        let changed = self.store.query_newer_than(watermark).await?;
        debug!("{} local notes changed since {watermark}", changed.len());

        let outcomes: Vec<(String, SyncResult<bool>)> = stream::iter(changed)
            .map(|note| async move {
                let result = upload_note(client, &note).await.map(|()| true);
                (note.id, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        Ok(tally("upload", outcomes, errors))
    }

    async fn download_changes(
        &self,
        client: &ObjectStoreClient,
        watermark: i64,
        errors: &mut Vec<String>,
    ) -> SyncResult<usize> {
        let candidates: Vec<String> = client
            .list_objects(NOTES_PREFIX)
            .await?
            .into_iter()
            .filter(|o| o.key.ends_with(NOTE_KEY_SUFFIX) && o.last_modified_millis() > watermark)
            .map(|o| o.key)
            .collect();
        debug!("{} remote notes modified since {watermark}", candidates.len());

        let outcomes: Vec<(String, SyncResult<bool>)> = stream::iter(candidates)
            .map(|key| async move {
                let result = self.apply_remote(client, &key).await;
                (key, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        Ok(tally("download", outcomes, errors))
    }

    /// Returns whether the local store changed.
    async fn apply_remote(&self, client: &ObjectStoreClient, key: &str) -> SyncResult<bool> {
        let id = note_id_from_key(key)
            .ok_or_else(|| SyncError::Parse(format!("{key} is not a note key")))?;
        let envelope = NoteEnvelope::decode(&client.get_object(key).await?)?;
        let remote = envelope.note;
        if remote.id != id {
            return Err(SyncError::Parse(format!("{key} holds note {}", remote.id)));
        }

        let local = self.store.get(id).await?;
        match conflict::resolve(local.as_ref(), &remote) {
            Resolution::KeepLocal => {
                debug!("note {id}: local copy is current");
                Ok(false)
            }
            Resolution::Upsert => {
                self.store.put(&remote).await?;
                debug!("note {id}: applied remote update {}", remote.update_time);
                Ok(true)
            }
            Resolution::Remove => {
                self.store.delete(id).await?;
                debug!("note {id}: removed by remote tombstone");
                Ok(true)
            }
        }
    }

    async fn propagate_tombstone(
        &self,
        settings: &SyncSettings,
        tombstone: &Note,
        now: i64,
    ) -> SyncResult<()> {
        let client = self.client_for(settings)?;
        let key = tombstone.key();

        let mut remote = match client.get_object(&key).await {
            Ok(body) => NoteEnvelope::decode(&body)?.note,
            Err(ObjectStoreError::NotFound(_)) => {
                debug!("note {} not on remote yet, uploading local tombstone", tombstone.id);
                tombstone.clone()
            }
            Err(e) => return Err(e.into()),
        };
        remote.tombstone(now);

        client
            .put_object(&key, NoteEnvelope::encode(&remote)?, JSON_CONTENT_TYPE)
            .await?;
        Ok(())
    }
}

async fn upload_note(client: &ObjectStoreClient, note: &Note) -> SyncResult<()> {
    let body = NoteEnvelope::encode(note)?;
    client.put_object(&note.key(), body, JSON_CONTENT_TYPE).await?;
    debug!("uploaded note {} (updateTime {})", note.id, note.update_time);
    Ok(())
}

/// Counts successes and records failures.
fn tally(phase: &str, outcomes: Vec<(String, SyncResult<bool>)>, errors: &mut Vec<String>) -> usize {
    let mut applied = 0;
    for (item, outcome) in outcomes {
        match outcome {
            Ok(true) => applied += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("{phase} of {item} failed: {e}");
                errors.push(format!("{phase} {item}: {e}"));
            }
        }
    }
    applied
}

fn config_error(err: ObjectStoreError) -> SyncError {
    SyncError::Config(err.to_string())
}

fn connection_failure_message(err: &ObjectStoreError) -> String {
    if err.is_network() {
        NETWORK_FAILURE_HINT.to_string()
    } else if let Some(status) = err.status() {
        format!("HTTP error: {status}")
    } else {
        format!("connection failed: {err}")
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
