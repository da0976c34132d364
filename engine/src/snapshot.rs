//! The form snapshot - the complete working copy of one certificate's data.
//!
//! The snapshot is deliberately schema-less: a string-keyed bag of JSON
//! values. The engine interprets only the reserved keys below; everything
//! else (test results, circuit schedules, signatures) passes through opaque.

use crate::{error::Result, CertificateNumber, Error, FieldName, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field keys the engine itself reads or writes.
pub mod reserved {
    /// The assigned certificate number. Immutable once a report is persisted.
    pub const CERTIFICATE_NUMBER: &str = "certificateNumber";
    /// Set to `true` when certificate generation has fully succeeded.
    pub const CERTIFICATE_GENERATED: &str = "certificateGenerated";
    /// Millisecond timestamp of successful generation.
    pub const CERTIFICATE_GENERATED_AT: &str = "certificateGeneratedAt";
    /// Report workflow status (`"draft"` / `"completed"`).
    pub const STATUS: &str = "status";
    /// Whether the recorded work is notifiable under Part P.
    pub const NOTIFIABLE_WORK: &str = "notifiableWork";
}

/// Fields used to decide whether a draft holds anything worth warning about.
const MEANINGFUL_FIELDS: &[&str] = &["clientName", "installationAddress"];

/// Fields assigned by the server or by generation, stripped when duplicating
/// a report. The certificate number is stripped too so a fresh one is issued.
const SERVER_ASSIGNED_FIELDS: &[&str] = &[
    "id",
    "reportId",
    "pdfUrl",
    "pdfGeneratedAt",
    reserved::CERTIFICATE_NUMBER,
    reserved::CERTIFICATE_GENERATED,
    reserved::CERTIFICATE_GENERATED_AT,
    reserved::STATUS,
];

/// The complete in-memory working copy of one certificate's data.
///
/// Uses a `BTreeMap` so serialization order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSnapshot {
    fields: BTreeMap<FieldName, serde_json::Value>,
}

impl FormSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a JSON value. The value must be an object.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
            }),
            other => Err(Error::InvalidPayload(format!(
                "form snapshot must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    /// Get a field as a string slice, if it is a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<FieldName>, value: serde_json::Value) {
        self.fields.insert(field.into(), value);
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<serde_json::Value> {
        self.fields.remove(field)
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the snapshot holds no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The assigned certificate number, if any.
    pub fn certificate_number(&self) -> Option<&str> {
        self.get_str(reserved::CERTIFICATE_NUMBER)
            .filter(|n| !n.is_empty())
    }

    /// Assign the certificate number. The issuer guarantees this is only
    /// called once per new report.
    pub fn set_certificate_number(&mut self, number: CertificateNumber) {
        self.set(
            reserved::CERTIFICATE_NUMBER,
            serde_json::Value::String(number),
        );
    }

    /// Whether certificate generation has completed for this snapshot.
    pub fn is_generated(&self) -> bool {
        self.get(reserved::CERTIFICATE_GENERATED)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Mark the certificate as generated at the given time.
    pub fn mark_generated(&mut self, now: Timestamp) {
        self.set(reserved::CERTIFICATE_GENERATED, serde_json::json!(true));
        self.set(reserved::CERTIFICATE_GENERATED_AT, serde_json::json!(now));
        self.set(reserved::STATUS, serde_json::json!("completed"));
    }

    /// Undo [`mark_generated`](Self::mark_generated). Used when the final
    /// confirmation push fails and generation must remain retryable.
    pub fn unmark_generated(&mut self) {
        self.remove(reserved::CERTIFICATE_GENERATED);
        self.remove(reserved::CERTIFICATE_GENERATED_AT);
        self.set(reserved::STATUS, serde_json::json!("draft"));
    }

    /// Whether the recorded work is notifiable (Part P).
    pub fn is_notifiable_work(&self) -> bool {
        self.get(reserved::NOTIFIABLE_WORK)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Whether the snapshot holds anything a user would mind losing: a
    /// non-empty client name or installation address. Trivial drafts never
    /// trigger the unsaved-changes navigation warning.
    pub fn has_meaningful_content(&self) -> bool {
        MEANINGFUL_FIELDS
            .iter()
            .any(|f| self.get_str(f).map(|s| !s.trim().is_empty()).unwrap_or(false))
    }

    /// Deep-clone the snapshot for a duplicated report: server-assigned
    /// metadata (ids, generation timestamps, pdf references) and the
    /// certificate number are stripped so the copy starts a fresh lifecycle.
    pub fn duplicate_for_new_report(&self) -> Self {
        let mut copy = self.clone();
        for field in SERVER_ASSIGNED_FIELDS {
            copy.fields.remove(*field);
        }
        copy
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "Null",
        serde_json::Value::Bool(_) => "Bool",
        serde_json::Value::Number(_) => "Number",
        serde_json::Value::String(_) => "String",
        serde_json::Value::Array(_) => "Array",
        serde_json::Value::Object(_) => "Object",
    }
}
