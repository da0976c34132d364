//! Conflict resolution between the local draft and the cloud record.
//!
//! The rule is a single timestamp comparison: the local draft wins if and
//! only if it is strictly newer than the cloud record. Ties favour the cloud,
//! since its copy is the acknowledged one. A cloud record with no
//! `updated_at` at all is treated as older than any local draft, so recovered
//! offline work is never silently discarded in favour of a record that cannot
//! prove its age.

use crate::{CloudRecord, DraftRecord, FormSnapshot, Timestamp};

/// Which side supplied the winning snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileSource {
    Local,
    Cloud,
}

/// The result of reconciling the two copies of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub source: ReconcileSource,
    pub snapshot: FormSnapshot,
    /// True when a local draft beat an existing cloud record, i.e. unsynced
    /// offline work was recovered. Used to tell the user what happened.
    pub recovered_local_edits: bool,
}

/// Whether a local draft modified at `local_modified` beats a cloud record
/// updated at `cloud_updated`.
pub fn local_wins(local_modified: Timestamp, cloud_updated: Option<Timestamp>) -> bool {
    match cloud_updated {
        Some(t) => local_modified > t,
        None => true,
    }
}

/// Pick the winning snapshot. Returns `None` when neither side has data.
pub fn reconcile(
    local: Option<DraftRecord>,
    cloud: Option<CloudRecord>,
) -> Option<ReconcileOutcome> {
    match (local, cloud) {
        (None, None) => None,
        (Some(draft), None) => Some(ReconcileOutcome {
            source: ReconcileSource::Local,
            snapshot: draft.data,
            recovered_local_edits: false,
        }),
        (None, Some(record)) => Some(ReconcileOutcome {
            source: ReconcileSource::Cloud,
            snapshot: record.data,
            recovered_local_edits: false,
        }),
        (Some(draft), Some(record)) => {
            if local_wins(draft.last_modified, record.updated_at) {
                tracing::debug!(
                    local_modified = draft.last_modified,
                    cloud_updated = ?record.updated_at,
                    "local draft newer than cloud record, recovering local edits"
                );
                Some(ReconcileOutcome {
                    source: ReconcileSource::Local,
                    snapshot: draft.data,
                    recovered_local_edits: true,
                })
            } else {
                Some(ReconcileOutcome {
                    source: ReconcileSource::Cloud,
                    snapshot: record.data,
                    recovered_local_edits: false,
                })
            }
        }
    }
}
