//! Empty desired set removes every link of the stock; empty batches never
//! reach the store.

use msi_reconcile::{LinkPatch, LinkReconciler};
use msi_testkit::{MemoryLinkStore, StoreCall};

#[test]
fn scenario_empty_desired_set_deletes_all_links() {
    let mut store = MemoryLinkStore::with_links(4, &["A", "B", "C"]);
    let existing = store.links_for(4);

    let outcome = LinkReconciler::default()
        .process(&mut store, 4, &[])
        .unwrap();

    assert_eq!(outcome.saved, 0);
    assert_eq!(outcome.deleted, 3);
    assert_eq!(store.save_calls(), 0, "empty save batch must not call the store");
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::Fetch { stock_id: 4 },
            StoreCall::Delete { links: existing },
        ]
    );
    assert!(store.codes_for(4).is_empty());

    let again = LinkReconciler::default().plan(&store, 4, &[]).unwrap();
    assert!(again.is_noop(), "torn-down stock has nothing left to change");
}

#[test]
fn scenario_new_stock_only_saves() {
    let mut store = MemoryLinkStore::new();

    let outcome = LinkReconciler::default()
        .process(
            &mut store,
            8,
            &[LinkPatch::new("us-east"), LinkPatch::new("us-west")],
        )
        .unwrap();

    assert_eq!(outcome.saved, 2);
    assert_eq!(outcome.deleted, 0);
    assert_eq!(store.fetch_calls(), 1);
    assert_eq!(store.save_calls(), 1);
    assert_eq!(store.delete_calls(), 0);
    assert!(store.links_for(8).iter().all(|l| l.link_id.is_some()));
}

#[test]
fn scenario_nothing_to_do_only_fetches() {
    let mut store = MemoryLinkStore::new();
    assert!(LinkReconciler::default().plan(&store, 8, &[]).unwrap().is_noop());
    store.clear_calls();

    let outcome = LinkReconciler::default()
        .process(&mut store, 8, &[])
        .unwrap();

    assert_eq!((outcome.saved, outcome.deleted), (0, 0));
    assert_eq!(store.calls(), vec![StoreCall::Fetch { stock_id: 8 }]);
}
