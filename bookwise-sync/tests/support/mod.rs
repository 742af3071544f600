//! Shared fixtures for sync engine tests.
//!
//! `FakeBucket` answers S3-style requests on a wiremock server from an
//! in-memory object map, so two engines can sync against the same bucket.

#![allow(dead_code)]

use async_trait::async_trait;
use bookwise_config::{ConfigError, ConfigResult, SettingsProvider, SyncSettings};
use bookwise_sync::{
    LocalNoteStore, MemoryNoteStore, Note, NoteEnvelope, SyncEngine, SyncError, SyncOptions,
    SyncResult,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const BUCKET: &str = "bucket";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Lets wall-clock timestamps move past the previous watermark.
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn note(id: &str, update_time: i64) -> Note {
    Note {
        id: id.into(),
        source_id: format!("src-{id}"),
        ebook_id: "book-1".into(),
        ebook_name: "Dune".into(),
        notes: format!("note {id} at {update_time}"),
        chapter_name: "Book One".into(),
        dom_source: "[]".into(),
        create_time: update_time,
        update_time,
        tag: String::new(),
        is_delete: None,
    }
}

/// Enabled, fully configured settings pointing at `server`.
pub fn settings_for(server: &MockServer) -> SyncSettings {
    SyncSettings {
        account_id: "acct".into(),
        access_key_id: "test-access".into(),
        secret_access_key: "test-secret".into(),
        bucket_name: BUCKET.into(),
        endpoint_override: Some(server.uri()),
        enabled: true,
        last_sync_time: 0,
    }
}

pub fn engine<S: LocalNoteStore>(
    store: Arc<S>,
    settings: Arc<TestSettings>,
) -> SyncEngine<S, TestSettings> {
    SyncEngine::new(store, settings, SyncOptions::default()).unwrap()
}

// ── TestSettings ────────────────────────────────────────────────

/// In-memory settings provider with an optional failing watermark write.
pub struct TestSettings {
    settings: Mutex<SyncSettings>,
    fail_watermark: AtomicBool,
}

impl TestSettings {
    pub fn new(settings: SyncSettings) -> Arc<Self> {
        Arc::new(Self {
            settings: Mutex::new(settings),
            fail_watermark: AtomicBool::new(false),
        })
    }

    pub fn current(&self) -> SyncSettings {
        self.settings.lock().unwrap().clone()
    }

    pub fn watermark(&self) -> i64 {
        self.current().last_sync_time
    }

    pub fn set(&self, f: impl FnOnce(&mut SyncSettings)) {
        f(&mut *self.settings.lock().unwrap());
    }

    pub fn fail_watermark_writes(&self) {
        self.fail_watermark.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsProvider for TestSettings {
    async fn sync_settings(&self) -> ConfigResult<SyncSettings> {
        Ok(self.current())
    }

    async fn set_watermark(&self, timestamp_ms: i64) -> ConfigResult<()> {
        if self.fail_watermark.load(Ordering::SeqCst) {
            return Err(ConfigError::Io(std::io::Error::other("disk full")));
        }
        self.set(|s| s.last_sync_time = timestamp_ms);
        Ok(())
    }
}

// ── FlakyStore ──────────────────────────────────────────────────

/// Memory store whose queries or writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryNoteStore,
    fail_query: AtomicBool,
    puts_left: Mutex<Option<usize>>,
}

impl FlakyStore {
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        Self {
            inner: MemoryNoteStore::with_notes(notes),
            ..Default::default()
        }
    }

    pub fn fail_queries(&self) {
        self.fail_query.store(true, Ordering::SeqCst);
    }

    /// Allows `n` more successful puts, then fails every later one.
    pub fn allow_puts(&self, n: usize) {
        *self.puts_left.lock().unwrap() = Some(n);
    }
}

#[async_trait]
impl LocalNoteStore for FlakyStore {
    async fn get(&self, id: &str) -> SyncResult<Option<Note>> {
        self.inner.get(id).await
    }

    async fn put(&self, note: &Note) -> SyncResult<()> {
        {
            let mut left = self.puts_left.lock().unwrap();
            match left.as_mut() {
                Some(0) => return Err(SyncError::LocalStore("write rejected".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.inner.put(note).await
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        self.inner.delete(id).await
    }

    async fn query_newer_than(&self, timestamp_ms: i64) -> SyncResult<Vec<Note>> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(SyncError::LocalStore("database is locked".into()));
        }
        self.inner.query_newer_than(timestamp_ms).await
    }
}

// ── FakeBucket ──────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub body: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct BucketState {
    objects: BTreeMap<String, StoredObject>,
    failing_keys: HashSet<String>,
    list_failure: Option<u16>,
    delay: Option<Duration>,
    puts: usize,
}

/// In-memory bucket served over HTTP at `/bucket/...`.
#[derive(Clone, Default)]
pub struct FakeBucket {
    state: Arc<Mutex<BucketState>>,
    requests: Arc<AtomicUsize>,
}

impl FakeBucket {
    pub async fn mount(server: &MockServer) -> Self {
        let bucket = Self::default();
        Mock::given(any())
            .respond_with(bucket.clone())
            .mount(server)
            .await;
        bucket
    }

    pub fn insert_raw(&self, key: &str, body: &str) {
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            StoredObject {
                body: body.to_string(),
                last_modified: Utc::now(),
            },
        );
    }

    pub fn insert_note(&self, note: &Note) {
        self.insert_raw(&note.key(), &NoteEnvelope::encode(note).unwrap());
    }

    pub fn set_last_modified(&self, key: &str, at: DateTime<Utc>) {
        if let Some(obj) = self.state.lock().unwrap().objects.get_mut(key) {
            obj.last_modified = at;
        }
    }

    pub fn body(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(key)
            .map(|o| o.body.clone())
    }

    pub fn note(&self, id: &str) -> Option<Note> {
        self.body(&bookwise_sync::note_key(id))
            .map(|b| NoteEnvelope::decode(&b).unwrap().note)
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Every GET/PUT/DELETE on `key` answers 500.
    pub fn fail_key(&self, key: &str) {
        self.state.lock().unwrap().failing_keys.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_keys.clear();
        state.list_failure = None;
    }

    pub fn fail_listing(&self, status: u16) {
        self.state.lock().unwrap().list_failure = Some(status);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn put_count(&self) -> usize {
        self.state.lock().unwrap().puts
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn handle(&self, req: &Request) -> ResponseTemplate {
        let prefix = format!("/{BUCKET}/");
        let Some(key) = req.url.path().strip_prefix(prefix.as_str()) else {
            return ResponseTemplate::new(404);
        };
        let mut state = self.state.lock().unwrap();

        if state.failing_keys.contains(key) {
            return ResponseTemplate::new(500).set_body_string("<Error>InternalError</Error>");
        }

        match (req.method.as_str(), key) {
            ("GET", "") => {
                if let Some(status) = state.list_failure {
                    return ResponseTemplate::new(status);
                }
                let prefix = req
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "prefix")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                ResponseTemplate::new(200).set_body_string(listing_xml(&state.objects, &prefix))
            }
            ("GET", key) => match state.objects.get(key) {
                Some(obj) => ResponseTemplate::new(200).set_body_string(obj.body.clone()),
                None => ResponseTemplate::new(404).set_body_string("<Error>NoSuchKey</Error>"),
            },
            ("PUT", key) => {
                state.puts += 1;
                state.objects.insert(
                    key.to_string(),
                    StoredObject {
                        body: String::from_utf8_lossy(&req.body).into_owned(),
                        last_modified: Utc::now(),
                    },
                );
                ResponseTemplate::new(200)
            }
            ("DELETE", key) => {
                state.objects.remove(key);
                ResponseTemplate::new(204)
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

impl Respond for FakeBucket {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().unwrap().delay;
        let response = self.handle(request);
        match delay {
            Some(d) => response.set_delay(d),
            None => response,
        }
    }
}

fn listing_xml(objects: &BTreeMap<String, StoredObject>, prefix: &str) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
    );
    xml.push_str(&format!("<Name>{BUCKET}</Name><Prefix>{prefix}</Prefix><IsTruncated>false</IsTruncated>"));
    for (key, obj) in objects.range(prefix.to_string()..).take_while(|(k, _)| k.starts_with(prefix)) {
        xml.push_str(&format!(
            "<Contents><Key>{key}</Key><LastModified>{}</LastModified><Size>{}</Size></Contents>",
            obj.last_modified.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            obj.body.len()
        ));
    }
    xml.push_str("</ListBucketResult>");
    xml
}
