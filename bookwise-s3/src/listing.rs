//! Bucket listing (`ListObjects`) XML parsing.

use crate::error::S3Result;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

/// One listed object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    /// Store-assigned modification time. Not the note's `updateTime`.
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

impl ObjectSummary {
    pub fn last_modified_millis(&self) -> i64 {
        self.last_modified.timestamp_millis()
    }
}

/// One page of a bucket listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

#[derive(Default)]
struct PartialEntry {
    key: Option<String>,
    last_modified: Option<String>,
    size: Option<String>,
}

impl PartialEntry {
    /// Returns `None` when any field is missing or unparsable.
    fn finish(self) -> Option<ObjectSummary> {
        let key = self.key.filter(|k| !k.is_empty())?;
        let last_modified = DateTime::parse_from_rfc3339(self.last_modified.as_deref()?)
            .ok()?
            .with_timezone(&Utc);
        let size = self.size.as_deref()?.parse().ok()?;
        Some(ObjectSummary {
            key,
            last_modified,
            size,
        })
    }
}

/// Parses a `ListBucketResult` document.
///
/// Entries lacking `Key`, `LastModified` or `Size` are dropped; a malformed
/// document as a whole is an error.
pub fn parse_list_response(xml: &str) -> S3Result<ListPage> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut page = ListPage::default();
    let mut current: Option<PartialEntry> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                text.clear();
                if e.local_name().as_ref() == b"Contents" {
                    current = Some(PartialEntry::default());
                }
            }
            Event::Text(e) => {
                text.clear();
                text.push_str(&e.unescape()?);
            }
            Event::End(e) => {
                match (e.local_name().as_ref(), current.as_mut()) {
                    (b"Key", Some(entry)) => entry.key = Some(std::mem::take(&mut text)),
                    (b"LastModified", Some(entry)) => {
                        entry.last_modified = Some(std::mem::take(&mut text))
                    }
                    (b"Size", Some(entry)) => entry.size = Some(std::mem::take(&mut text)),
                    (b"Contents", _) => {
                        if let Some(entry) = current.take() {
                            let key = entry.key.clone();
                            match entry.finish() {
                                Some(obj) => page.objects.push(obj),
                                None => debug!("skipping incomplete listing entry {key:?}"),
                            }
                        }
                    }
                    (b"IsTruncated", None) => page.is_truncated = text.trim() == "true",
                    (b"NextMarker", None) => {
                        page.next_marker = Some(std::mem::take(&mut text)).filter(|m| !m.is_empty())
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}
