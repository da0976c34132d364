//! # Certsync Engine
//!
//! A deterministic draft-lifecycle and cloud-sync core for electrical
//! certification forms (EIC, EICR and Minor Works certificates).
//!
//! This crate provides the offline-first persistence logic that sits between a
//! form UI and a remote report store: debounced auto-save into a local draft
//! store, opportunistic cloud sync with offline queueing, timestamp-based
//! conflict reconciliation, and safe certificate-number issuance.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform.
//!   The cloud backend and the number sequence are traits; time is passed in
//!   explicitly as millisecond timestamps.
//! - **Deterministic**: same inputs always produce same outputs.
//! - **Testable**: pure logic, fakes plug in at the trait seams.
//! - **Opaque payloads**: a [`FormSnapshot`] is a schema-less bag of fields.
//!   The engine only interprets a handful of reserved keys
//!   (`certificateNumber`, `certificateGenerated`, ...); domain field
//!   semantics belong to the caller.
//!
//! ## Core Concepts
//!
//! ### Drafts
//!
//! Every in-progress form is periodically written to the [`DraftStore`] as a
//! [`DraftRecord`] keyed by `(certificate type, report id | "new")`. The draft
//! store is the durability backstop: it is written synchronously on unload and
//! requires no connectivity.
//!
//! ### Cloud sync
//!
//! The [`SyncEngine`] pushes the latest snapshot to a [`CloudStore`] whenever
//! the session is online and authenticated, and queues changes otherwise.
//! Queued work is flushed as a single push of the latest snapshot on
//! reconnect - last writer wins locally, intermediate edits are not replayed.
//!
//! ### Reconciliation
//!
//! On load, [`reconcile`](reconcile::reconcile) compares the local draft's
//! `last_modified` against the cloud record's `updated_at`. A strictly newer
//! local draft wins (unsynced work is recovered); ties favour the cloud. A
//! cloud record with no `updated_at` at all is treated as older than any
//! local draft.
//!
//! ### Lifecycle
//!
//! The [`DraftSession`] orchestrates everything as an explicit state machine
//! (`New` -> `Editing` -> `Generating` -> `Completed`, with `LocalOnly` /
//! `Reconciled` load paths), issuing the certificate number exactly once per
//! new report and never for loaded ones.
//!
//! ## Quick Start
//!
//! ```rust
//! use certsync_engine::{
//!     CertificateType, DraftSession, DraftStore, InMemoryCloudStore, NullHooks, SessionDeps,
//!     YearSequence,
//! };
//! use serde_json::json;
//!
//! let mut cloud = InMemoryCloudStore::new();
//! let mut sequence = YearSequence::new(2026);
//! let mut hooks = NullHooks;
//! let mut deps = SessionDeps {
//!     cloud: &mut cloud,
//!     sequence: &mut sequence,
//!     hooks: &mut hooks,
//! };
//!
//! // Start a brand-new EICR report: a certificate number is issued once.
//! let mut session = DraftSession::start_new(
//!     CertificateType::Eicr,
//!     None,
//!     DraftStore::new(),
//!     true, // online
//!     true, // authenticated
//!     &mut deps,
//!     1_000,
//! );
//! assert!(session.certificate_number().is_some());
//!
//! // Edits mark the draft dirty; the auto-save tick persists them locally
//! // and pushes to the cloud.
//! session.handle_update("clientName", json!("Alice"), 1_005);
//! session.tick(1_040, &mut deps);
//! assert!(!session.has_unsaved_changes());
//! ```
//!
//! ## Persistence
//!
//! Use [`DraftStore::to_json`] and [`DraftStore::from_json`] to move draft
//! entries across host restarts. Serialization order is deterministic.

pub mod autosave;
pub mod draft;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod lifecycle;
pub mod reconcile;
pub mod snapshot;
pub mod sync;

// Re-export main types at crate root
pub use autosave::{AutoSaveEngine, DEFAULT_AUTOSAVE_INTERVAL};
pub use draft::{DraftKey, DraftRecord, DraftStore, DRAFT_FORMAT_VERSION};
pub use error::Error;
pub use identity::{CertificateType, ReportIdentity};
pub use issuer::{CertificateIssuer, NumberSequence, YearSequence};
pub use lifecycle::{
    DraftSession, LifecycleState, Notice, NoticeLevel, NullHooks, SessionDeps, SessionHooks,
    StartNewOutcome, SyncAttempt,
};
pub use reconcile::{reconcile, ReconcileOutcome, ReconcileSource};
pub use snapshot::FormSnapshot;
pub use sync::{
    CloudRecord, CloudStore, InMemoryCloudStore, SyncEngine, SyncOutcome, SyncState, SyncStatus,
    UpsertAck,
};

/// Type aliases for clarity
pub type ReportId = String;
pub type CertificateNumber = String;
pub type FieldName = String;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
