//! Cloud synchronization with offline queueing.
//!
//! The [`SyncEngine`] tracks connectivity, authentication and the outcome of
//! the last push. When a sync cannot run (offline or signed out) the change is
//! queued; on reconnect the whole queue collapses into a single push of the
//! latest snapshot. Intermediate edits are never replayed - the snapshot is
//! the unit of sync, not the keystroke.

use crate::{
    error::Result, CertificateType, Error, FormSnapshot, ReportId, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the sync machinery currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Nothing has happened yet.
    Idle,
    /// A push or pull is in flight.
    Syncing,
    /// The last push succeeded.
    Synced,
    /// The last push failed.
    Error,
    /// Changes are waiting for connectivity or sign-in.
    Queued,
}

/// Observable sync state, suitable for driving a status indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub status: SyncStatus,
    /// Server time of the last successful push.
    pub last_synced: Option<Timestamp>,
    /// Message from the last failed push, cleared on success.
    pub error: Option<String>,
    /// Number of changes made while sync was unavailable.
    pub queued_changes: u32,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            last_synced: None,
            error: None,
            queued_changes: 0,
        }
    }
}

/// A report record as the cloud store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudRecord {
    pub report_id: ReportId,
    pub data: FormSnapshot,
    /// Server-side modification time. Records written by legacy clients may
    /// lack it; such a record is treated as older than any local draft.
    pub updated_at: Option<Timestamp>,
}

/// Acknowledgement of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAck {
    /// Id of the stored record. For a create this is the newly assigned id.
    pub report_id: ReportId,
    /// Server-side modification time of the stored record.
    pub updated_at: Timestamp,
}

/// The remote report store, seen through the eyes of the engine.
///
/// Implementations own transport and authentication token plumbing; the
/// engine only decides when to call and what to do with the outcome.
pub trait CloudStore {
    /// Fetch a report by id.
    fn get(&mut self, report_id: &str) -> Result<CloudRecord>;

    /// Create (`report_id: None`) or update (`Some`) a report. The server
    /// assigns the id on create and returns its own modification time.
    fn upsert(
        &mut self,
        report_id: Option<&str>,
        certificate_type: CertificateType,
        data: &FormSnapshot,
        now: Timestamp,
    ) -> Result<UpsertAck>;
}

/// Outcome of a sync attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The snapshot reached the cloud.
    Synced { report_id: ReportId },
    /// Sync was unavailable; the change is queued for later.
    Queued,
}

/// Connectivity-aware push/pull coordinator.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    state: SyncState,
    is_online: bool,
    is_authenticated: bool,
}

impl SyncEngine {
    pub fn new(is_online: bool, is_authenticated: bool) -> Self {
        Self {
            state: SyncState::default(),
            is_online,
            is_authenticated,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Whether a push could run right now.
    pub fn can_sync(&self) -> bool {
        self.is_online && self.is_authenticated
    }

    /// Note a local mutation made while sync is unavailable. Counted so the
    /// UI can show how much work is waiting; the queue itself holds no data,
    /// the flush pushes the latest snapshot.
    pub fn record_change(&mut self) {
        if !self.can_sync() {
            self.state.queued_changes += 1;
            self.state.status = SyncStatus::Queued;
        }
    }

    /// Push the snapshot to the cloud, or queue when sync is unavailable.
    ///
    /// On success the queue and any previous error are cleared. On failure
    /// the state records the error and the caller decides whether to retry.
    pub fn sync_now(
        &mut self,
        report_id: Option<&str>,
        certificate_type: CertificateType,
        data: &FormSnapshot,
        now: Timestamp,
        cloud: &mut dyn CloudStore,
    ) -> Result<SyncOutcome> {
        if !self.can_sync() {
            self.state.queued_changes += 1;
            self.state.status = SyncStatus::Queued;
            return Ok(SyncOutcome::Queued);
        }

        self.state.status = SyncStatus::Syncing;
        match cloud.upsert(report_id, certificate_type, data, now) {
            Ok(ack) => {
                self.state.status = SyncStatus::Synced;
                self.state.last_synced = Some(ack.updated_at);
                self.state.error = None;
                self.state.queued_changes = 0;
                tracing::debug!(report_id = %ack.report_id, "sync complete");
                Ok(SyncOutcome::Synced {
                    report_id: ack.report_id,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "sync failed");
                self.state.status = SyncStatus::Error;
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch a report from the cloud. Authentication is checked before
    /// connectivity so a signed-out user gets the sign-in prompt, not an
    /// offline banner.
    pub fn load_from_cloud(
        &mut self,
        report_id: &str,
        cloud: &mut dyn CloudStore,
    ) -> Result<CloudRecord> {
        if !self.is_authenticated {
            return Err(Error::Unauthorized);
        }
        if !self.is_online {
            return Err(Error::Offline);
        }
        cloud.get(report_id)
    }

    /// Update connectivity. Returns whether the caller should flush queued
    /// work now that sync became available.
    pub fn set_online(&mut self, is_online: bool) -> bool {
        let could = self.can_sync();
        self.is_online = is_online;
        self.became_able_to_sync(could)
    }

    /// Update authentication. Returns whether the caller should flush queued
    /// work now that sync became available.
    pub fn set_authenticated(&mut self, is_authenticated: bool) -> bool {
        let could = self.can_sync();
        self.is_authenticated = is_authenticated;
        self.became_able_to_sync(could)
    }

    fn became_able_to_sync(&self, could_before: bool) -> bool {
        !could_before
            && self.can_sync()
            && (self.state.queued_changes > 0 || self.state.status == SyncStatus::Error)
    }
}

/// In-memory [`CloudStore`] for tests and examples.
///
/// Assigns sequential `report-N` ids and counts upserts, so tests can assert
/// that an offline burst collapses into a single push.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCloudStore {
    records: BTreeMap<ReportId, CloudRecord>,
    next_id: u64,
    upsert_count: u32,
    fail_next: Option<Error>,
}

impl InMemoryCloudStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, e.g. to simulate a report created on another device.
    pub fn insert_record(
        &mut self,
        report_id: impl Into<ReportId>,
        data: FormSnapshot,
        updated_at: Option<Timestamp>,
    ) {
        let report_id = report_id.into();
        self.records.insert(
            report_id.clone(),
            CloudRecord {
                report_id,
                data,
                updated_at,
            },
        );
    }

    /// Make the next call fail with the given error.
    pub fn fail_next(&mut self, error: Error) {
        self.fail_next = Some(error);
    }

    /// How many upserts have been accepted.
    pub fn upsert_count(&self) -> u32 {
        self.upsert_count
    }

    pub fn record(&self, report_id: &str) -> Option<&CloudRecord> {
        self.records.get(report_id)
    }

    fn take_failure(&mut self) -> Result<()> {
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl CloudStore for InMemoryCloudStore {
    fn get(&mut self, report_id: &str) -> Result<CloudRecord> {
        self.take_failure()?;
        self.records
            .get(report_id)
            .cloned()
            .ok_or_else(|| Error::ReportNotFound(report_id.to_string()))
    }

    fn upsert(
        &mut self,
        report_id: Option<&str>,
        _certificate_type: CertificateType,
        data: &FormSnapshot,
        now: Timestamp,
    ) -> Result<UpsertAck> {
        self.take_failure()?;

        let report_id = match report_id {
            Some(id) => {
                if !self.records.contains_key(id) {
                    return Err(Error::ReportNotFound(id.to_string()));
                }
                id.to_string()
            }
            None => {
                self.next_id += 1;
                format!("report-{}", self.next_id)
            }
        };

        self.records.insert(
            report_id.clone(),
            CloudRecord {
                report_id: report_id.clone(),
                data: data.clone(),
                updated_at: Some(now),
            },
        );
        self.upsert_count += 1;

        Ok(UpsertAck {
            report_id,
            updated_at: now,
        })
    }
}
