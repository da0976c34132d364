//! End-to-end session scenarios spanning multiple mounts of the editor.
//!
//! These tests simulate what a browser host would do: create a session, edit,
//! unload, persist the draft store, and mount a fresh session later against
//! the same cloud and number sequence.

use certsync_engine::{
    CertificateType, DraftKey, DraftSession, DraftStore, FormSnapshot, InMemoryCloudStore,
    LifecycleState, Notice, NullHooks, NumberSequence, SessionDeps, SessionHooks, SyncStatus,
    YearSequence,
};
use serde_json::json;

struct World {
    cloud: InMemoryCloudStore,
    sequence: YearSequence,
    hooks: NullHooks,
}

impl World {
    fn new() -> Self {
        Self {
            cloud: InMemoryCloudStore::new(),
            sequence: YearSequence::new(2026),
            hooks: NullHooks,
        }
    }

    fn deps(&mut self) -> SessionDeps<'_> {
        SessionDeps {
            cloud: &mut self.cloud,
            sequence: &mut self.sequence,
            hooks: &mut self.hooks,
        }
    }
}

/// Persist a session's drafts the way a host would across a page reload.
fn unload_and_persist(session: &mut DraftSession, now: u64) -> DraftStore {
    session.before_unload(now);
    let json = session.export_drafts().unwrap();
    DraftStore::from_json(&json).unwrap()
}

#[test]
fn remounting_a_new_report_does_not_issue_a_second_number() {
    let mut world = World::new();

    let mut first = DraftSession::start_new(
        CertificateType::Eicr,
        None,
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        1_000,
    );
    first.handle_update("clientName", json!("Alice"), 1_005);
    let number = first.certificate_number().unwrap().to_string();

    // Reload the page before anything synced.
    let store = unload_and_persist(&mut first, 1_010);
    drop(first);

    let second = DraftSession::start_new(
        CertificateType::Eicr,
        None,
        store,
        true,
        true,
        &mut world.deps(),
        2_000,
    );

    // Same draft, same number, sequence not advanced.
    assert_eq!(second.form_data().get_str("clientName"), Some("Alice"));
    assert_eq!(second.certificate_number(), Some(number.as_str()));
    assert_eq!(
        world.sequence.generate(CertificateType::Eicr).unwrap(),
        "EICR-2026-000002"
    );
}

#[test]
fn unload_preserves_edits_made_seconds_before_leaving() {
    let mut world = World::new();

    let mut session = DraftSession::start_new(
        CertificateType::Eic,
        None,
        DraftStore::new(),
        false,
        true,
        &mut world.deps(),
        1_000,
    );
    // The debounce would fire at 1030; the user leaves at 1002.
    session.handle_update("installationAddress", json!("12 Ohm St"), 1_001);
    let warn = session.before_unload(1_002);
    assert!(warn, "unsynced meaningful content should warn");

    let store = DraftStore::from_json(&session.export_drafts().unwrap()).unwrap();
    let draft = store
        .load_draft(&DraftKey::new_report(CertificateType::Eic))
        .unwrap();
    assert_eq!(
        draft.data.get_str("installationAddress"),
        Some("12 Ohm St")
    );
}

#[test]
fn empty_draft_never_warns_on_unload() {
    let mut world = World::new();
    let mut session = DraftSession::start_new(
        CertificateType::MinorWorks,
        None,
        DraftStore::new(),
        false,
        false,
        &mut world.deps(),
        1_000,
    );
    assert!(!session.before_unload(1_001));

    // Non-meaningful fields alone do not warn either.
    session.handle_update("earthingArrangement", json!("TN-S"), 1_002);
    assert!(!session.before_unload(1_003));
}

#[test]
fn offline_edits_survive_reload_and_win_reconciliation() {
    let mut world = World::new();

    // Device A creates and syncs the report.
    let mut device_a = DraftSession::start_new(
        CertificateType::Eicr,
        None,
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        1_000,
    );
    device_a.handle_update("clientName", json!("Alice"), 1_001);
    device_a.handle_update("installationAddress", json!("12 Ohm St"), 1_002);
    device_a.manual_save(1_010, &mut world.deps());
    let report_id = device_a.report_id().unwrap().to_string();

    // Later, offline, the address is corrected. The sync queues.
    device_a.connectivity_changed(false, 2_000, &mut world.deps());
    device_a.handle_update("installationAddress", json!("14 Ohm St"), 2_001);
    assert_eq!(device_a.sync_state().status, SyncStatus::Queued);
    let store = unload_and_persist(&mut device_a, 2_005);
    drop(device_a);

    // The cloud still holds the stale address.
    assert_eq!(
        world
            .cloud
            .record(&report_id)
            .unwrap()
            .data
            .get_str("installationAddress"),
        Some("12 Ohm St")
    );

    // Remount online: the newer local draft wins reconciliation and the
    // recovered edit reaches the cloud on the next tick.
    let mut remounted = DraftSession::load(
        CertificateType::Eicr,
        report_id.as_str(),
        store,
        true,
        true,
        &mut world.deps(),
        3_000,
    );
    assert_eq!(remounted.state(), LifecycleState::Reconciled);
    assert_eq!(
        remounted.form_data().get_str("installationAddress"),
        Some("14 Ohm St")
    );

    remounted.tick(3_030, &mut world.deps());
    assert_eq!(
        world
            .cloud
            .record(&report_id)
            .unwrap()
            .data
            .get_str("installationAddress"),
        Some("14 Ohm St")
    );
}

#[test]
fn stale_draft_loses_to_an_edit_from_another_device() {
    let mut world = World::new();

    // This device edits and syncs at t=1010, leaving a draft behind.
    let mut session = DraftSession::start_new(
        CertificateType::Eic,
        None,
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        1_000,
    );
    session.handle_update("clientName", json!("Alice"), 1_001);
    session.manual_save(1_010, &mut world.deps());
    let report_id = session.report_id().unwrap().to_string();
    let store = unload_and_persist(&mut session, 1_020);
    drop(session);

    // Another device updates the report afterwards.
    let mut other = DraftSession::load(
        CertificateType::Eic,
        report_id.as_str(),
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        5_000,
    );
    other.handle_update("clientName", json!("Alice Smith"), 5_001);
    other.manual_save(5_010, &mut world.deps());
    drop(other);

    // Back on the first device, the cloud copy wins over the stale draft.
    let remounted = DraftSession::load(
        CertificateType::Eic,
        report_id.as_str(),
        store,
        true,
        true,
        &mut world.deps(),
        6_000,
    );
    assert_eq!(remounted.state(), LifecycleState::Reconciled);
    assert_eq!(
        remounted.form_data().get_str("clientName"),
        Some("Alice Smith")
    );
}

#[test]
fn generated_certificate_number_survives_every_later_load() {
    let mut world = World::new();

    let mut session = DraftSession::start_new(
        CertificateType::MinorWorks,
        None,
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        1_000,
    );
    session.handle_update("clientName", json!("Alice"), 1_001);
    session
        .generate_certificate(2_000, &mut world.deps())
        .unwrap();
    let report_id = session.report_id().unwrap().to_string();
    let number = session.certificate_number().unwrap().to_string();
    drop(session);

    // Load, edit, sync: the number never changes and nothing re-issues.
    let mut reloaded = DraftSession::load(
        CertificateType::MinorWorks,
        report_id.as_str(),
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        3_000,
    );
    assert_eq!(reloaded.certificate_number(), Some(number.as_str()));

    reloaded.handle_update("clientName", json!("Alice Smith"), 3_001);
    reloaded.manual_save(3_010, &mut world.deps());
    assert_eq!(reloaded.certificate_number(), Some(number.as_str()));
    assert_eq!(
        world
            .cloud
            .record(&report_id)
            .unwrap()
            .data
            .certificate_number(),
        Some(number.as_str())
    );
    assert_eq!(
        world.sequence.generate(CertificateType::MinorWorks).unwrap(),
        "MW-2026-000002"
    );
}

#[test]
fn duplicate_and_original_complete_with_distinct_numbers() {
    let mut world = World::new();

    let mut session = DraftSession::start_new(
        CertificateType::Eic,
        None,
        DraftStore::new(),
        true,
        true,
        &mut world.deps(),
        1_000,
    );
    session.handle_update("clientName", json!("Alice"), 1_001);
    session
        .generate_certificate(2_000, &mut world.deps())
        .unwrap();
    let original_id = session.report_id().unwrap().to_string();
    let original_number = session.certificate_number().unwrap().to_string();

    session.duplicate(3_000, &mut world.deps());
    session.handle_update("installationAddress", json!("99 Volt Rd"), 3_001);
    session
        .generate_certificate(4_000, &mut world.deps())
        .unwrap();

    let copy_id = session.report_id().unwrap().to_string();
    let copy_number = session.certificate_number().unwrap().to_string();

    assert_ne!(copy_id, original_id);
    assert_ne!(copy_number, original_number);
    // Both records exist, both completed, carried field shared.
    let original = world.cloud.record(&original_id).unwrap();
    let copy = world.cloud.record(&copy_id).unwrap();
    assert!(original.data.is_generated());
    assert!(copy.data.is_generated());
    assert_eq!(copy.data.get_str("clientName"), Some("Alice"));
}

#[test]
fn signing_in_flushes_work_queued_while_signed_out() {
    struct CountingHooks {
        notices: Vec<Notice>,
    }
    impl SessionHooks for CountingHooks {
        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }
        fn invalidate(&mut self, _cache_key: &str) {}
        fn submit_work_notification(&mut self, _report_id: &str, _data: &FormSnapshot) {}
    }

    let mut cloud = InMemoryCloudStore::new();
    let mut sequence = YearSequence::new(2026);
    let mut hooks = CountingHooks { notices: vec![] };
    let mut deps = SessionDeps {
        cloud: &mut cloud,
        sequence: &mut sequence,
        hooks: &mut hooks,
    };

    let mut session = DraftSession::start_new(
        CertificateType::Eicr,
        None,
        DraftStore::new(),
        true,
        false, // signed out
        &mut deps,
        1_000,
    );
    session.handle_update("clientName", json!("Alice"), 1_001);
    session.handle_update("clientName", json!("Alice Smith"), 1_002);
    session.tick(1_030, &mut deps);
    assert_eq!(cloud.upsert_count(), 0);

    let mut deps = SessionDeps {
        cloud: &mut cloud,
        sequence: &mut sequence,
        hooks: &mut hooks,
    };
    session.auth_changed(true, 2_000, &mut deps);

    assert_eq!(cloud.upsert_count(), 1);
    assert_eq!(session.sync_state().status, SyncStatus::Synced);
    let id = session.report_id().unwrap();
    assert_eq!(
        cloud.record(id).unwrap().data.get_str("clientName"),
        Some("Alice Smith")
    );
    assert!(hooks.notices.iter().any(|n| n.message.contains("synced")));
}
