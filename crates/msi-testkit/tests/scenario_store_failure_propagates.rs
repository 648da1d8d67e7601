//! Store failures reach the caller unchanged; nothing runs after them and
//! nothing is retried.

use msi_reconcile::{LinkError, LinkPatch, LinkReconciler, PersistenceError, StoreOp};
use msi_testkit::MemoryLinkStore;

#[test]
fn scenario_fetch_failure_stops_before_writes() {
    let mut store = MemoryLinkStore::with_links(1, &["A"]);
    store.fail_next(StoreOp::Fetch);

    let err = LinkReconciler::default()
        .process(&mut store, 1, &[LinkPatch::new("B")])
        .unwrap_err();

    assert_eq!(
        err,
        LinkError::Persistence(PersistenceError::new(StoreOp::Fetch, "injected failure"))
    );
    assert_eq!(store.fetch_calls(), 1);
    assert_eq!(store.save_calls(), 0);
    assert_eq!(store.delete_calls(), 0);
}

#[test]
fn scenario_save_failure_skips_delete() {
    let mut store = MemoryLinkStore::with_links(1, &["A", "B"]);
    store.fail_next(StoreOp::Save);

    let err = LinkReconciler::default()
        .process(&mut store, 1, &[LinkPatch::new("B")])
        .unwrap_err();

    match err {
        LinkError::Persistence(e) => {
            assert_eq!(e.op, StoreOp::Save);
            assert_eq!(e.to_string(), "link store save failed: injected failure");
        }
        other => panic!("expected persistence error, got {other:?}"),
    }
    assert_eq!(store.save_calls(), 1, "no retry");
    assert_eq!(store.delete_calls(), 0, "delete must not run after a failed save");
    assert_eq!(store.codes_for(1), vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn scenario_delete_failure_is_reported_after_save() {
    let mut store = MemoryLinkStore::with_links(1, &["A", "B"]);
    store.fail_next(StoreOp::Delete);

    let err = LinkReconciler::default()
        .process(&mut store, 1, &[LinkPatch::new("B").with_priority(5)])
        .unwrap_err();

    assert!(matches!(
        err,
        LinkError::Persistence(PersistenceError {
            op: StoreOp::Delete,
            ..
        })
    ));
    // The in-memory store has no transaction spanning both batches; the
    // Postgres path in msi-db applies both inside one.
    assert_eq!(store.get(1, "B").map(|l| l.priority), Some(5));
    assert!(store.get(1, "A").is_some());
}
