//! File-backed thought template store
//!
//! ```text
//! thought_templates/
//! ├── 0.json      # {"title": "...", "content": "..."}
//! ├── 1.json
//! └── ...
//! ```
//!
//! One record per file. Records that fail to decode are skipped on
//! enumeration. There is no locking: two processes saving at once can pick the
//! same fresh slot.

use std::fs;
use std::path::{Path, PathBuf};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{RecordError, StoreError};
use crate::template::{SlotId, TemplateRecord, ThoughtTemplate};

const RECORD_EXTENSION: &str = "json";

/// Decode one stored record
///
/// Only a JSON object is a record. serde would also accept a two-element
/// array as the sequence form of `TemplateRecord`, so the shape is checked on
/// the untyped value first.
pub fn decode_record(bytes: &[u8]) -> Result<TemplateRecord, RecordError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let kind = match &value {
        Value::Object(_) => None,
        Value::Array(_) => Some("array"),
        Value::String(_) => Some("string"),
        Value::Number(_) => Some("number"),
        Value::Bool(_) => Some("bool"),
        Value::Null => Some("null"),
    };
    if let Some(kind) = kind {
        return Err(RecordError::NotAnObject(kind));
    }
    let record: TemplateRecord = serde_json::from_value(value)?;
    if record.title.is_empty() {
        return Err(RecordError::EmptyField("title"));
    }
    if record.content.is_empty() {
        return Err(RecordError::EmptyField("content"));
    }
    Ok(record)
}

/// Directory of thought template records
#[derive(Debug, Clone)]
pub struct TemplateStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl TemplateStore {
    /// Open or create a template store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| StoreError::io(&base_path, e))?;
        debug!(?base_path, "TemplateStore::open: opened template store");
        Ok(Self { base_path })
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn slot_path(&self, slot: &SlotId) -> PathBuf {
        self.base_path.join(slot.as_str())
    }

    /// Enumerate every decodable template
    pub fn list_all(&self) -> Result<Vec<ThoughtTemplate>, StoreError> {
        debug!(base_path = ?self.base_path, "TemplateStore::list_all: called");
        fs::create_dir_all(&self.base_path).map_err(|e| StoreError::io(&self.base_path, e))?;

        let mut templates = Vec::new();
        let entries = fs::read_dir(&self.base_path).map_err(|e| StoreError::io(&self.base_path, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.base_path, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != RECORD_EXTENSION).unwrap_or(true) {
                debug!(?path, "TemplateStore::list_all: not a record file, skipping");
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(?path, "Skipping record with non UTF-8 file name");
                continue;
            };

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(?path, error = %e, "Skipping unreadable template record");
                    continue;
                }
            };

            match decode_record(&bytes) {
                Ok(record) => templates.push(record.into_template(SlotId::new(name))),
                Err(e) => warn!(?path, error = %e, "Skipping malformed template record"),
            }
        }

        templates.sort_by(|a, b| slot_order(a.slot.as_ref()).cmp(&slot_order(b.slot.as_ref())));
        debug!(count = templates.len(), "TemplateStore::list_all: done");
        Ok(templates)
    }

    /// Read a single slot, `None` if it is missing or malformed
    pub fn get(&self, slot: &SlotId) -> Result<Option<ThoughtTemplate>, StoreError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(decode_record(&bytes).ok().map(|r| r.into_template(slot.clone())))
    }

    /// Persist a template, overwriting `slot` if given, otherwise into a fresh slot
    pub fn save(&self, template: &ThoughtTemplate, slot: Option<&SlotId>) -> Result<SlotId, StoreError> {
        debug!(title = %template.title, ?slot, "TemplateStore::save: called");
        if template.title.is_empty() {
            return Err(StoreError::EmptyField("title"));
        }
        if template.content.is_empty() {
            return Err(StoreError::EmptyField("content"));
        }

        let slot = match slot {
            Some(slot) => slot.clone(),
            None => self.next_slot()?,
        };

        let body = serde_json::to_vec(&template.to_record())?;
        let path = self.slot_path(&slot);
        let tmp_path = self.base_path.join(format!("{}.tmp", slot));
        fs::write(&tmp_path, body).map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StoreError::io(&path, e))?;

        info!(%slot, title = %template.title, "Saved thought template");
        Ok(slot)
    }

    /// Next free slot, counting up from the number of stored templates
    pub fn next_slot(&self) -> Result<SlotId, StoreError> {
        let mut n = self.list_all()?.len();
        loop {
            let slot = SlotId::new(format!("{}.{}", n, RECORD_EXTENSION));
            if !self.slot_path(&slot).exists() {
                debug!(%slot, "TemplateStore::next_slot: allocated");
                return Ok(slot);
            }
            n += 1;
        }
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list_all()?.len())
    }
}

/// Numeric file stems first in numeric order, then everything else by name
fn slot_order(slot: Option<&SlotId>) -> (u64, String) {
    let name = slot.map(|s| s.as_str().to_string()).unwrap_or_default();
    let n = Path::new(&name)
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(u64::MAX);
    (n, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, TemplateStore) {
        let temp = TempDir::new().unwrap();
        let store = TemplateStore::open(temp.path().join("thought_templates")).unwrap();
        (temp, store)
    }

    #[test]
    fn test_list_all_empty_and_missing_dir() {
        let (_temp, store) = store();
        assert!(store.list_all().unwrap().is_empty());

        fs::remove_dir_all(store.path()).unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert!(store.path().is_dir());
    }

    #[test]
    fn test_save_allocates_sequential_slots() {
        let (_temp, store) = store();
        let a = store.save(&ThoughtTemplate::candidate("A", "alpha"), None).unwrap();
        let b = store.save(&ThoughtTemplate::candidate("B", "beta"), None).unwrap();
        assert_eq!(a.as_str(), "0.json");
        assert_eq!(b.as_str(), "1.json");

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "A");
        assert_eq!(all[1].slot, Some(b));
    }

    #[test]
    fn test_save_with_slot_overwrites() {
        let (_temp, store) = store();
        let slot = store.save(&ThoughtTemplate::candidate("Old", "old body"), None).unwrap();
        let again = store
            .save(&ThoughtTemplate::candidate("New", "new body"), Some(&slot))
            .unwrap();
        assert_eq!(slot, again);

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "New");
        assert_eq!(all[0].content, "new body");
    }

    #[test]
    fn test_malformed_records_skipped() {
        let (_temp, store) = store();
        store.save(&ThoughtTemplate::candidate("Good", "body"), None).unwrap();
        fs::write(store.path().join("1.json"), "not json").unwrap();
        fs::write(store.path().join("2.json"), "[1, 2, 3]").unwrap();
        fs::write(store.path().join("3.json"), r#"{"title": 5, "content": "x"}"#).unwrap();
        fs::write(store.path().join("4.json"), r#"{"title": "only title"}"#).unwrap();
        fs::create_dir(store.path().join("5.json")).unwrap();
        fs::write(store.path().join("notes.txt"), r#"{"title": "t", "content": "c"}"#).unwrap();
        // Sequence form of a record is still not an object
        fs::write(store.path().join("6.json"), r#"["Array title", "Array content"]"#).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Good");
    }

    #[test]
    fn test_fresh_slot_skips_taken_names() {
        let (_temp, store) = store();
        // A malformed record is not counted but still occupies its file name
        fs::write(store.path().join("0.json"), "garbage").unwrap();
        let slot = store.save(&ThoughtTemplate::candidate("T", "c"), None).unwrap();
        assert_eq!(slot.as_str(), "1.json");
        assert_eq!(fs::read_to_string(store.path().join("0.json")).unwrap(), "garbage");
    }

    #[test]
    fn test_save_rejects_empty_fields() {
        let (_temp, store) = store();
        assert!(matches!(
            store.save(&ThoughtTemplate::candidate("", "c"), None),
            Err(StoreError::EmptyField("title"))
        ));
        assert!(matches!(
            store.save(&ThoughtTemplate::candidate("t", ""), None),
            Err(StoreError::EmptyField("content"))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_decode_record() {
        let record = decode_record(br#"{"title": "T", "content": "C"}"#).unwrap();
        assert_eq!(record.title, "T");
        assert!(matches!(
            decode_record(b"\"just a string\""),
            Err(RecordError::NotAnObject("string"))
        ));
        assert!(matches!(
            decode_record(br#"["Array title", "Array content"]"#),
            Err(RecordError::NotAnObject("array"))
        ));
        assert!(matches!(decode_record(b"{ truncated"), Err(RecordError::Decode(_))));
        assert!(matches!(
            decode_record(br#"{"title": 5, "content": "x"}"#),
            Err(RecordError::Decode(_))
        ));
        assert!(matches!(
            decode_record(br#"{"title": "", "content": "C"}"#),
            Err(RecordError::EmptyField("title"))
        ));
    }

    #[test]
    fn test_get_reads_single_slot() {
        let (_temp, store) = store();
        let slot = store.save(&ThoughtTemplate::candidate("T", "c"), None).unwrap();
        let t = store.get(&slot).unwrap().unwrap();
        assert_eq!(t.title, "T");
        assert!(store.get(&SlotId::new("99.json")).unwrap().is_none());
    }

    #[test]
    fn test_numeric_slot_order() {
        let (_temp, store) = store();
        for (name, title) in [("10.json", "ten"), ("2.json", "two"), ("custom.json", "custom")] {
            fs::write(
                store.path().join(name),
                serde_json::json!({"title": title, "content": "c"}).to_string(),
            )
            .unwrap();
        }
        let titles: Vec<_> = store.list_all().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["two", "ten", "custom"]);
    }
}
