//! Re-submitting the same desired set is a pass-through save with the
//! identities assigned by the first pass and no delete.

use msi_reconcile::{LinkPatch, LinkReconciler, StoreOp};
use msi_testkit::{MemoryLinkStore, StoreCall};

#[test]
fn scenario_second_identical_call_deletes_nothing() {
    let mut store = MemoryLinkStore::with_links(2, &["A", "B", "C"]);
    let reconciler = LinkReconciler::default();
    let desired = vec![
        LinkPatch::new("C").with_priority(1),
        LinkPatch::new("E").with_priority(2),
    ];

    reconciler.process(&mut store, 2, &desired).unwrap();
    let after_first = store.links_for(2);
    store.clear_calls();

    let outcome = reconciler.process(&mut store, 2, &desired).unwrap();

    assert_eq!(outcome.deleted, 0);
    assert_eq!(outcome.saved, 2);
    assert_eq!(store.delete_calls(), 0);
    assert_eq!(store.save_calls(), 1);

    let calls = store.calls();
    let StoreCall::Save { links } = &calls[1] else {
        panic!("expected save after fetch: {calls:?}");
    };
    // Every saved link already carries the identity the first pass produced.
    for link in links {
        let persisted = after_first
            .iter()
            .find(|l| l.source_code == link.source_code)
            .expect("saved code must already be persisted");
        assert_eq!(link, persisted);
    }
    assert_eq!(store.links_for(2), after_first);
}

#[test]
fn scenario_failed_save_leaves_store_unchanged() {
    let mut store = MemoryLinkStore::with_links(2, &["A", "B"]);
    let before = store.links_for(2);
    store.fail_next(StoreOp::Save);

    let err = LinkReconciler::default()
        .process(&mut store, 2, &[LinkPatch::new("B"), LinkPatch::new("Z")])
        .unwrap_err();

    assert!(err.is_persistence());
    // Retrying succeeds from the untouched state.
    assert_eq!(store.links_for(2), before);
    LinkReconciler::default()
        .process(&mut store, 2, &[LinkPatch::new("B"), LinkPatch::new("Z")])
        .unwrap();
    assert_eq!(store.codes_for(2), vec!["B".to_string(), "Z".to_string()]);
}
