//! The local draft store - the durability backstop.
//!
//! One entry per `(certificate type, report id | "new")` pair, holding the
//! latest form snapshot and its modification timestamp. All operations are
//! synchronous so an unload handler can complete a save before returning.
//! Writes for a given key are strictly ordered by call order.
//!
//! The engine holds the store in memory; hosts persist it across restarts
//! via [`DraftStore::to_json`] / [`DraftStore::from_json`].

use crate::{error::Result, CertificateType, Error, FormSnapshot, ReportId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the draft store serialization format.
pub const DRAFT_FORMAT_VERSION: u32 = 1;

/// Key addressing one draft entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftKey {
    pub certificate_type: CertificateType,
    /// `None` for a report that has not yet been created remotely.
    pub report_id: Option<ReportId>,
}

impl DraftKey {
    /// Key for a report with no backing record yet.
    pub fn new_report(certificate_type: CertificateType) -> Self {
        Self {
            certificate_type,
            report_id: None,
        }
    }

    /// Key for an existing report.
    pub fn for_report(certificate_type: CertificateType, report_id: impl Into<ReportId>) -> Self {
        Self {
            certificate_type,
            report_id: Some(report_id.into()),
        }
    }

    /// Flat string form, e.g. `"eicr:new"` or `"eicr:report-42"`.
    pub fn storage_key(&self) -> String {
        match &self.report_id {
            Some(id) => format!("{}:{}", self.certificate_type, id),
            None => format!("{}:new", self.certificate_type),
        }
    }
}

/// A locally persisted copy of a form snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    /// The saved form data.
    pub data: FormSnapshot,
    /// When this draft was last written (milliseconds since epoch).
    pub last_modified: Timestamp,
}

/// Synchronous key-value store for in-progress drafts.
///
/// Uses a `BTreeMap` keyed by the flat storage key so exported JSON is
/// deterministically ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftStore {
    format_version: u32,
    entries: BTreeMap<String, DraftRecord>,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            format_version: DRAFT_FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Save a draft, overwriting any prior record for the key.
    ///
    /// The snapshot is copied at the moment of the call, so a later mutation
    /// of the caller's form state cannot bleed into an already-scheduled save.
    pub fn save_draft(&mut self, key: &DraftKey, data: &FormSnapshot, now: Timestamp) {
        self.entries.insert(
            key.storage_key(),
            DraftRecord {
                data: data.clone(),
                last_modified: now,
            },
        );
    }

    /// Load the draft for a key, if present.
    pub fn load_draft(&self, key: &DraftKey) -> Option<DraftRecord> {
        self.entries.get(&key.storage_key()).cloned()
    }

    /// Remove the draft for a key. Returns whether an entry existed.
    pub fn clear_draft(&mut self, key: &DraftKey) -> bool {
        self.entries.remove(&key.storage_key()).is_some()
    }

    /// Move a draft from one key to another, e.g. from `"eicr:new"` to
    /// `"eicr:<id>"` once the first sync assigns a report id. No-op when the
    /// source entry is missing.
    pub fn rekey_draft(&mut self, from: &DraftKey, to: &DraftKey) {
        if let Some(record) = self.entries.remove(&from.storage_key()) {
            self.entries.insert(to.storage_key(), record);
        }
    }

    /// Number of stored drafts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no drafts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the store for host persistence.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidDraft(e.to_string()))
    }

    /// Restore a store persisted by the host.
    pub fn from_json(json: &str) -> Result<Self> {
        let store: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidDraft(e.to_string()))?;

        if store.format_version > DRAFT_FORMAT_VERSION {
            return Err(Error::InvalidDraft(format!(
                "unsupported draft format version: {} (max supported: {})",
                store.format_version, DRAFT_FORMAT_VERSION
            )));
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_with(field: &str, value: &str) -> FormSnapshot {
        let mut s = FormSnapshot::new();
        s.set(field, json!(value));
        s
    }

    #[test]
    fn storage_keys() {
        let new_key = DraftKey::new_report(CertificateType::Eicr);
        assert_eq!(new_key.storage_key(), "eicr:new");

        let id_key = DraftKey::for_report(CertificateType::MinorWorks, "report-3");
        assert_eq!(id_key.storage_key(), "minor-works:report-3");
    }

    #[test]
    fn save_load_clear() {
        let mut store = DraftStore::new();
        let key = DraftKey::new_report(CertificateType::Eic);

        assert!(store.load_draft(&key).is_none());

        store.save_draft(&key, &snapshot_with("clientName", "Alice"), 1000);
        let record = store.load_draft(&key).unwrap();
        assert_eq!(record.data.get_str("clientName"), Some("Alice"));
        assert_eq!(record.last_modified, 1000);

        assert!(store.clear_draft(&key));
        assert!(store.load_draft(&key).is_none());
        assert!(!store.clear_draft(&key));
    }

    #[test]
    fn later_save_overwrites_earlier() {
        let mut store = DraftStore::new();
        let key = DraftKey::new_report(CertificateType::Eic);

        store.save_draft(&key, &snapshot_with("clientName", "Alice"), 1000);
        store.save_draft(&key, &snapshot_with("clientName", "Bob"), 2000);

        let record = store.load_draft(&key).unwrap();
        assert_eq!(record.data.get_str("clientName"), Some("Bob"));
        assert_eq!(record.last_modified, 2000);
    }

    #[test]
    fn save_copies_snapshot_at_call_time() {
        let mut store = DraftStore::new();
        let key = DraftKey::new_report(CertificateType::Eicr);

        let mut live = snapshot_with("clientName", "Alice");
        store.save_draft(&key, &live, 1000);

        // Mutating the live snapshot after the save must not alter the draft.
        live.set("clientName", json!("Mallory"));

        let record = store.load_draft(&key).unwrap();
        assert_eq!(record.data.get_str("clientName"), Some("Alice"));
    }

    #[test]
    fn keys_do_not_collide_across_certificate_types() {
        let mut store = DraftStore::new();
        let eic = DraftKey::new_report(CertificateType::Eic);
        let eicr = DraftKey::new_report(CertificateType::Eicr);

        store.save_draft(&eic, &snapshot_with("clientName", "Alice"), 1000);
        store.save_draft(&eicr, &snapshot_with("clientName", "Bob"), 2000);

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.load_draft(&eic).unwrap().data.get_str("clientName"),
            Some("Alice")
        );
    }

    #[test]
    fn rekey_moves_entry() {
        let mut store = DraftStore::new();
        let from = DraftKey::new_report(CertificateType::Eicr);
        let to = DraftKey::for_report(CertificateType::Eicr, "report-9");

        store.save_draft(&from, &snapshot_with("clientName", "Alice"), 1000);
        store.rekey_draft(&from, &to);

        assert!(store.load_draft(&from).is_none());
        let record = store.load_draft(&to).unwrap();
        assert_eq!(record.data.get_str("clientName"), Some("Alice"));
        assert_eq!(record.last_modified, 1000);
    }

    #[test]
    fn json_roundtrip() {
        let mut store = DraftStore::new();
        let key = DraftKey::for_report(CertificateType::MinorWorks, "report-5");
        store.save_draft(&key, &snapshot_with("installationAddress", "12 Ohm St"), 4000);

        let json = store.to_json().unwrap();
        let restored = DraftStore::from_json(&json).unwrap();
        assert_eq!(store, restored);
    }

    #[test]
    fn reject_future_format_version() {
        let json = r#"{"formatVersion": 99, "entries": {}}"#;
        let result = DraftStore::from_json(json);
        assert!(matches!(result, Err(Error::InvalidDraft(_))));
    }

    #[test]
    fn deterministic_serialization() {
        let mut a = DraftStore::new();
        let mut b = DraftStore::new();
        let k1 = DraftKey::new_report(CertificateType::Eic);
        let k2 = DraftKey::new_report(CertificateType::Eicr);
        let snap = snapshot_with("clientName", "Alice");

        a.save_draft(&k1, &snap, 1000);
        a.save_draft(&k2, &snap, 1000);
        // Insert in reverse order.
        b.save_draft(&k2, &snap, 1000);
        b.save_draft(&k1, &snap, 1000);

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}
