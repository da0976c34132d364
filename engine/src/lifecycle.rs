//! The draft session - the state machine that ties everything together.
//!
//! A [`DraftSession`] owns one report's working snapshot and orchestrates
//! auto-save, cloud sync, reconciliation and certificate-number issuance
//! through an explicit lifecycle:
//!
//! ```text
//!   start_new:  New ----------------------> Editing -> Generating -> Completed
//!   load:       Loading -> LocalOnly ----->    ^
//!                       -> Reconciled ---->    |
//!                       -> LoadFailed  (terminal)
//! ```
//!
//! The session is IO-free. Everything that touches the outside world comes in
//! through [`SessionDeps`]: the cloud store, the number sequence and the host
//! hooks. Failures surface as [`Notice`]s or typed errors, never as panics.

use crate::{
    error::Result, reconcile::reconcile, snapshot::reserved, AutoSaveEngine, CertificateIssuer,
    CertificateType, CloudStore, DraftKey, DraftStore, Error, FormSnapshot, NumberSequence,
    ReportId, ReportIdentity, SyncEngine, SyncOutcome, SyncState, SyncStatus, Timestamp,
};

/// Where the session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Brand-new report, nothing persisted remotely yet.
    New,
    /// An existing report is being fetched and reconciled.
    Loading,
    /// Loaded from the local draft only; the cloud was unreachable.
    LocalOnly,
    /// Loaded and reconciled against the cloud record.
    Reconciled,
    /// The user has made edits this session.
    Editing,
    /// Certificate generation is in flight.
    Generating,
    /// The certificate was generated and confirmed by the cloud.
    Completed,
    /// The report could not be loaded at all. Terminal.
    LoadFailed,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message the host should surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Host callbacks the session fires as side effects of lifecycle events.
pub trait SessionHooks {
    /// Surface a message to the user.
    fn notify(&mut self, notice: Notice);

    /// Invalidate a host-side cache, e.g. the report list after a create.
    fn invalidate(&mut self, cache_key: &str);

    /// A completed certificate records notifiable work (Part P); the host
    /// should start the building-control notification flow.
    fn submit_work_notification(&mut self, report_id: &str, data: &FormSnapshot);
}

/// Hooks that do nothing. Useful in tests and examples.
pub struct NullHooks;

impl SessionHooks for NullHooks {
    fn notify(&mut self, _notice: Notice) {}
    fn invalidate(&mut self, _cache_key: &str) {}
    fn submit_work_notification(&mut self, _report_id: &str, _data: &FormSnapshot) {}
}

/// Everything the session needs from the outside world, passed per call so
/// the session itself stays free of lifetimes and IO.
pub struct SessionDeps<'a> {
    pub cloud: &'a mut dyn CloudStore,
    pub sequence: &'a mut dyn NumberSequence,
    pub hooks: &'a mut dyn SessionHooks,
}

/// Result of asking to start a new report over the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartNewOutcome {
    /// The session was reset to a fresh report.
    Started,
    /// The current draft holds meaningful content; the host must confirm
    /// with the user and call again with `confirmed = true`.
    ConfirmationRequired,
}

/// Result of an explicit save-and-sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAttempt {
    Synced { report_id: ReportId },
    Queued,
    Failed { message: String },
}

/// One report's editing session.
pub struct DraftSession {
    state: LifecycleState,
    identity: ReportIdentity,
    snapshot: FormSnapshot,
    store: DraftStore,
    autosave: AutoSaveEngine,
    sync: SyncEngine,
    issuer: CertificateIssuer,
}

impl DraftSession {
    /// Start a session for a brand-new report.
    ///
    /// A previously abandoned draft under the same type's `"new"` key is
    /// restored unless `prefill` is given. A certificate number is issued
    /// immediately when possible; on failure issuance is retried lazily on
    /// later ticks.
    pub fn start_new(
        certificate_type: CertificateType,
        prefill: Option<FormSnapshot>,
        store: DraftStore,
        is_online: bool,
        is_authenticated: bool,
        deps: &mut SessionDeps,
        now: Timestamp,
    ) -> Self {
        let mut session = Self {
            state: LifecycleState::New,
            identity: ReportIdentity::new_report(certificate_type),
            snapshot: FormSnapshot::new(),
            store,
            autosave: AutoSaveEngine::default(),
            sync: SyncEngine::new(is_online, is_authenticated),
            issuer: CertificateIssuer::new(),
        };

        match prefill {
            Some(snapshot) => session.snapshot = snapshot,
            None => {
                if let Some(draft) = session.store.load_draft(&session.key()) {
                    session.snapshot = draft.data;
                    deps.hooks
                        .notify(Notice::info("Restored your unsaved draft"));
                }
            }
        }

        session.issue_number(deps);
        session.autosave.arm(now);
        session
    }

    /// Load an existing report by id, reconciling the cloud record against
    /// any local draft.
    pub fn load(
        certificate_type: CertificateType,
        report_id: impl Into<ReportId>,
        store: DraftStore,
        is_online: bool,
        is_authenticated: bool,
        deps: &mut SessionDeps,
        now: Timestamp,
    ) -> Self {
        let report_id = report_id.into();
        let mut session = Self {
            state: LifecycleState::Loading,
            identity: ReportIdentity::existing(certificate_type, report_id.clone()),
            snapshot: FormSnapshot::new(),
            store,
            autosave: AutoSaveEngine::default(),
            sync: SyncEngine::new(is_online, is_authenticated),
            issuer: CertificateIssuer::new(),
        };

        let local = session.store.load_draft(&session.key());

        match session.sync.load_from_cloud(&report_id, deps.cloud) {
            Ok(record) => {
                // Unreachable in practice: reconcile with a cloud record
                // present always yields an outcome.
                let Some(outcome) = reconcile(local, Some(record)) else {
                    session.state = LifecycleState::LoadFailed;
                    return session;
                };
                if outcome.recovered_local_edits {
                    deps.hooks.notify(Notice::info(
                        "Recovered unsynced edits saved on this device",
                    ));
                    // The recovered edits are newer than the cloud copy;
                    // schedule them for push.
                    session.autosave.mark_dirty();
                }
                // A stale draft is kept: it loses every future
                // reconciliation by timestamp and remains the offline
                // fallback for later mounts.
                session.snapshot = outcome.snapshot;
                session.state = LifecycleState::Reconciled;
            }
            Err(Error::ReportNotFound(_)) => match local {
                Some(draft) => {
                    session.snapshot = draft.data;
                    session.state = LifecycleState::LocalOnly;
                    deps.hooks.notify(Notice::warning(
                        "Report not found in the cloud; working from the local draft",
                    ));
                }
                None => {
                    session.state = LifecycleState::LoadFailed;
                    deps.hooks.notify(Notice::error("Report not found"));
                }
            },
            Err(e) => match local {
                Some(draft) => {
                    session.snapshot = draft.data;
                    session.state = LifecycleState::LocalOnly;
                    let reason = match e {
                        Error::Unauthorized => "Sign in to sync this report",
                        Error::Offline => "You are offline",
                        _ => "The cloud is unreachable",
                    };
                    deps.hooks.notify(Notice::warning(format!(
                        "{reason}; working from the local draft"
                    )));
                }
                None => {
                    tracing::warn!(report_id = %report_id, error = %e, "report load failed");
                    session.state = LifecycleState::LoadFailed;
                    deps.hooks
                        .notify(Notice::error(format!("Could not load report: {e}")));
                }
            },
        }

        if session.state != LifecycleState::LoadFailed {
            session.autosave.arm(now);
        }
        session
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Apply a single field edit.
    ///
    /// Ignored once the certificate is completed or the load failed. An
    /// already-assigned certificate number can never be overwritten.
    pub fn handle_update(&mut self, field: &str, value: serde_json::Value, _now: Timestamp) {
        match self.state {
            LifecycleState::Completed
            | LifecycleState::Generating
            | LifecycleState::LoadFailed => return,
            _ => {}
        }
        if field == reserved::CERTIFICATE_NUMBER && self.snapshot.certificate_number().is_some() {
            tracing::debug!("ignored attempt to overwrite an assigned certificate number");
            return;
        }

        self.snapshot.set(field, value);
        self.autosave.mark_dirty();
        self.sync.record_change();
        self.state = LifecycleState::Editing;
    }

    /// Advance time. Runs the lazy certificate-number retry and the debounced
    /// auto-save; a save that fires is followed by a cloud push. Returns
    /// whether a save happened.
    pub fn tick(&mut self, now: Timestamp, deps: &mut SessionDeps) -> bool {
        if matches!(
            self.state,
            LifecycleState::Completed | LifecycleState::LoadFailed
        ) {
            return false;
        }

        if self.identity.report_id().is_none()
            && self.snapshot.certificate_number().is_none()
            && !self.issuer.has_issued()
        {
            self.issue_number(deps);
        }

        let key = self.key();
        let saved = self
            .autosave
            .tick(now, &mut self.store, &key, &self.snapshot);
        if saved {
            if let Err(e) = self.push(now, deps) {
                deps.hooks.notify(Notice::warning(format!(
                    "Cloud sync failed: {e}. Your changes are saved on this device."
                )));
            }
        }
        saved
    }

    /// Save immediately and push to the cloud.
    ///
    /// Rejected after a failed load: that session holds an empty snapshot,
    /// and persisting it would shadow the real record.
    pub fn manual_save(&mut self, now: Timestamp, deps: &mut SessionDeps) -> SyncAttempt {
        if self.state == LifecycleState::LoadFailed {
            return SyncAttempt::Failed {
                message: "report is not loaded".into(),
            };
        }
        let key = self.key();
        self.autosave
            .manual_save(now, &mut self.store, &key, &self.snapshot);
        self.attempt_push(now, deps)
    }

    /// Push the current snapshot without waiting for the auto-save timer.
    pub fn sync_now(&mut self, now: Timestamp, deps: &mut SessionDeps) -> SyncAttempt {
        if self.state == LifecycleState::LoadFailed {
            return SyncAttempt::Failed {
                message: "report is not loaded".into(),
            };
        }
        self.attempt_push(now, deps)
    }

    // ------------------------------------------------------------------
    // Unload and connectivity
    // ------------------------------------------------------------------

    /// Page-unload handler. Synchronously flushes unsaved edits to the draft
    /// store, then reports whether the host should warn the user about
    /// leaving: true only when the draft holds meaningful content that has
    /// not reached the cloud.
    pub fn before_unload(&mut self, now: Timestamp) -> bool {
        let dirty = self.autosave.has_unsaved_changes();
        if dirty {
            let key = self.key();
            self.autosave
                .flush(now, &mut self.store, &key, &self.snapshot);
        }

        let state = self.sync.state();
        let unsynced = dirty
            || state.queued_changes > 0
            || matches!(state.status, SyncStatus::Error | SyncStatus::Queued);
        unsynced && self.snapshot.has_meaningful_content()
    }

    /// React to a connectivity change. Regaining the ability to sync flushes
    /// all queued work as one push of the latest snapshot.
    pub fn connectivity_changed(
        &mut self,
        is_online: bool,
        now: Timestamp,
        deps: &mut SessionDeps,
    ) {
        if self.sync.set_online(is_online) {
            self.flush_queued(now, deps);
        }
    }

    /// React to the user signing in or out.
    pub fn auth_changed(&mut self, is_authenticated: bool, now: Timestamp, deps: &mut SessionDeps) {
        if self.sync.set_authenticated(is_authenticated) {
            self.flush_queued(now, deps);
        }
    }

    fn flush_queued(&mut self, now: Timestamp, deps: &mut SessionDeps) {
        let key = self.key();
        self.autosave
            .manual_save(now, &mut self.store, &key, &self.snapshot);
        if let SyncAttempt::Synced { .. } = self.attempt_push(now, deps) {
            deps.hooks.notify(Notice::info("Offline changes synced"));
        }
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Generate the certificate: push the final snapshot, mark it generated
    /// and confirm the completed record with the cloud.
    ///
    /// All-or-nothing: any failure reverts to `Editing` with the generation
    /// flags unset, so the operation stays retryable. Requires connectivity,
    /// since a completed certificate must exist remotely.
    pub fn generate_certificate(&mut self, now: Timestamp, deps: &mut SessionDeps) -> Result<()> {
        if self.state == LifecycleState::LoadFailed {
            return Err(Error::InvalidDraft("report is not loaded".into()));
        }
        if !self.sync.is_authenticated() {
            return Err(Error::Unauthorized);
        }
        if !self.sync.is_online() {
            return Err(Error::Offline);
        }
        if self.state == LifecycleState::Completed {
            return Ok(());
        }

        self.state = LifecycleState::Generating;

        // New reports that failed earlier issuance get one more chance here.
        if let Err(e) = self
            .issuer
            .ensure_number(&self.identity, &mut self.snapshot, deps.sequence)
        {
            self.state = LifecycleState::Editing;
            return Err(e);
        }

        let key = self.key();
        self.autosave
            .manual_save(now, &mut self.store, &key, &self.snapshot);
        if let Err(e) = self.push_required(now, deps) {
            self.state = LifecycleState::Editing;
            return Err(e);
        }

        self.snapshot.mark_generated(now);
        let key = self.key();
        self.autosave
            .manual_save(now, &mut self.store, &key, &self.snapshot);

        match self.push_required(now, deps) {
            Ok(report_id) => {
                self.state = LifecycleState::Completed;
                deps.hooks.invalidate("reports");
                if self.snapshot.is_notifiable_work() {
                    deps.hooks.submit_work_notification(&report_id, &self.snapshot);
                }
                deps.hooks.notify(Notice::info("Certificate generated"));
                // The completed record lives in the cloud now.
                let key = self.key();
                self.autosave.clear(&mut self.store, &key);
                Ok(())
            }
            Err(e) => {
                // Roll back so a retry starts from a clean draft.
                self.snapshot.unmark_generated();
                let key = self.key();
                self.autosave
                    .manual_save(now, &mut self.store, &key, &self.snapshot);
                self.state = LifecycleState::Editing;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // New lifecycles from an existing session
    // ------------------------------------------------------------------

    /// Reset the session to a fresh report of the same certificate type.
    ///
    /// When the current draft holds meaningful content the host must confirm
    /// with the user first; pass `confirmed = true` after they accept.
    pub fn begin_new_report(
        &mut self,
        confirmed: bool,
        now: Timestamp,
        deps: &mut SessionDeps,
    ) -> StartNewOutcome {
        if !confirmed
            && self.autosave.has_unsaved_changes()
            && self.snapshot.has_meaningful_content()
        {
            return StartNewOutcome::ConfirmationRequired;
        }

        // Discard the abandoned draft so it cannot be restored later. The
        // cloud record, if one exists, is untouched.
        let key = self.key();
        self.autosave.clear(&mut self.store, &key);

        self.identity.reset();
        self.issuer.reset();
        self.snapshot = FormSnapshot::new();
        self.sync = SyncEngine::new(self.sync.is_online(), self.sync.is_authenticated());
        self.state = LifecycleState::New;

        self.issue_number(deps);
        self.autosave.arm(now);
        StartNewOutcome::Started
    }

    /// Start a fresh report pre-filled with a copy of the current one.
    ///
    /// Server-assigned metadata and the certificate number are stripped from
    /// the copy; the original report and its draft are left untouched.
    pub fn duplicate(&mut self, now: Timestamp, deps: &mut SessionDeps) {
        if self.state != LifecycleState::Completed {
            // Keep the original's draft current before abandoning it.
            let key = self.key();
            self.autosave
                .flush(now, &mut self.store, &key, &self.snapshot);
        }
        self.autosave.disarm();

        self.snapshot = self.snapshot.duplicate_for_new_report();
        self.identity.reset();
        self.issuer.reset();
        self.sync = SyncEngine::new(self.sync.is_online(), self.sync.is_authenticated());
        self.state = LifecycleState::New;

        self.issue_number(deps);
        self.autosave.arm(now);
        let new_key = self.key();
        self.autosave
            .manual_save(now, &mut self.store, &new_key, &self.snapshot);
    }

    /// Record the id the first successful sync assigned to this report.
    ///
    /// Idempotent: only the first call binds; repeats are no-ops. Binding
    /// moves the local draft from the `"new"` key to the id key and
    /// invalidates the host's report list.
    pub fn on_report_created(&mut self, report_id: &str, hooks: &mut dyn SessionHooks) {
        let old_key = self.key();
        if self.identity.bind_report_id(report_id) {
            let new_key = self.key();
            self.store.rekey_draft(&old_key, &new_key);
            hooks.invalidate("reports");
            tracing::info!(report_id, "report record created");
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn certificate_type(&self) -> CertificateType {
        self.identity.certificate_type
    }

    pub fn report_id(&self) -> Option<&str> {
        self.identity.report_id()
    }

    pub fn form_data(&self) -> &FormSnapshot {
        &self.snapshot
    }

    pub fn sync_state(&self) -> &SyncState {
        self.sync.state()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.has_unsaved_changes()
    }

    pub fn certificate_number(&self) -> Option<&str> {
        self.snapshot.certificate_number()
    }

    pub fn is_online(&self) -> bool {
        self.sync.is_online()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sync.is_authenticated()
    }

    /// Serialize the draft store for host persistence.
    pub fn export_drafts(&self) -> Result<String> {
        self.store.to_json()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn key(&self) -> DraftKey {
        match self.identity.report_id() {
            Some(id) => DraftKey::for_report(self.identity.certificate_type, id),
            None => DraftKey::new_report(self.identity.certificate_type),
        }
    }

    fn issue_number(&mut self, deps: &mut SessionDeps) {
        match self
            .issuer
            .ensure_number(&self.identity, &mut self.snapshot, deps.sequence)
        {
            Ok(Some(_)) => self.autosave.mark_dirty(),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "certificate number issuance failed, will retry");
                deps.hooks.notify(Notice::warning(
                    "Could not assign a certificate number yet; it will be retried",
                ));
            }
        }
    }

    fn push(&mut self, now: Timestamp, deps: &mut SessionDeps) -> Result<SyncOutcome> {
        let report_id = self.identity.report_id().map(str::to_string);
        let outcome = self.sync.sync_now(
            report_id.as_deref(),
            self.identity.certificate_type,
            &self.snapshot,
            now,
            deps.cloud,
        )?;
        if let SyncOutcome::Synced { report_id } = &outcome {
            let id = report_id.clone();
            self.on_report_created(&id, deps.hooks);
        }
        Ok(outcome)
    }

    fn attempt_push(&mut self, now: Timestamp, deps: &mut SessionDeps) -> SyncAttempt {
        match self.push(now, deps) {
            Ok(SyncOutcome::Synced { report_id }) => SyncAttempt::Synced { report_id },
            Ok(SyncOutcome::Queued) => SyncAttempt::Queued,
            Err(e) => SyncAttempt::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Push that must reach the cloud. A queued outcome counts as failure,
    /// which cannot happen after the connectivity preflight but is mapped
    /// anyway.
    fn push_required(&mut self, now: Timestamp, deps: &mut SessionDeps) -> Result<ReportId> {
        match self.push(now, deps)? {
            SyncOutcome::Synced { report_id } => Ok(report_id),
            SyncOutcome::Queued => Err(Error::Offline),
        }
    }
}
