//! Deterministic in-memory link store for scenario tests.
//!
//! Behaves like the Postgres store where it matters to the reconciler:
//! links are unique per `(stock_id, source_code)`, `save` is an upsert that
//! assigns `link_id`s to new links, and each batch applies all-or-nothing.
//! Every call is recorded so tests can assert exactly which store operations
//! a reconcile issued. No IO.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Once;

use msi_reconcile::{Link, LinkReader, LinkWriter, PersistenceError, StoreOp};

/// One recorded store call.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Fetch { stock_id: i64 },
    Save { links: Vec<Link> },
    Delete { links: Vec<Link> },
}

#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    next_link_id: i64,
    rows: BTreeMap<(i64, String), Link>,
    calls: RefCell<Vec<StoreCall>>,
    fail_on: Cell<Option<StoreOp>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self {
            next_link_id: 1,
            ..Self::default()
        }
    }

    /// Store pre-populated with `codes` linked to `stock_id`, priorities
    /// counting up from 1 in the given order.
    pub fn with_links(stock_id: i64, codes: &[&str]) -> Self {
        let mut store = Self::new();
        store.seed(stock_id, codes);
        store
    }

    /// Insert links without recording a store call.
    pub fn seed(&mut self, stock_id: i64, codes: &[&str]) {
        let links: Vec<Link> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| Link::new(stock_id, *code).with_priority(i as i32 + 1))
            .collect();
        self.upsert_all(&links);
    }

    /// The next call of `op` fails (once) without changing any row.
    pub fn fail_next(&mut self, op: StoreOp) {
        self.fail_on.set(Some(op));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&mut self) {
        self.calls.get_mut().clear();
    }

    pub fn save_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::Save { .. }))
    }

    pub fn delete_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::Delete { .. }))
    }

    pub fn fetch_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::Fetch { .. }))
    }

    fn count_calls(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    /// Persisted links of `stock_id`, ordered by source code.
    pub fn links_for(&self, stock_id: i64) -> Vec<Link> {
        self.rows
            .range((stock_id, String::new())..)
            .take_while(|((s, _), _)| *s == stock_id)
            .map(|(_, l)| l.clone())
            .collect()
    }

    pub fn codes_for(&self, stock_id: i64) -> Vec<String> {
        self.links_for(stock_id)
            .into_iter()
            .map(|l| l.source_code)
            .collect()
    }

    pub fn get(&self, stock_id: i64, source_code: &str) -> Option<&Link> {
        self.rows.get(&(stock_id, source_code.to_string()))
    }

    fn record(&self, call: StoreCall) {
        self.calls.borrow_mut().push(call);
    }

    fn take_failure(&self, op: StoreOp) -> Result<(), PersistenceError> {
        if self.fail_on.get() == Some(op) {
            self.fail_on.set(None);
            return Err(PersistenceError::new(op, "injected failure"));
        }
        Ok(())
    }

    fn upsert_all(&mut self, links: &[Link]) {
        for link in links {
            let key = (link.stock_id, link.source_code.clone());
            let link_id = match self.rows.get(&key).and_then(|l| l.link_id) {
                Some(id) => id,
                None => {
                    let id = self.next_link_id;
                    self.next_link_id += 1;
                    id
                }
            };
            let mut row = link.clone();
            row.link_id = Some(link_id);
            self.rows.insert(key, row);
        }
    }
}

impl LinkReader for MemoryLinkStore {
    fn fetch_by_stock(&self, stock_id: i64) -> Result<Vec<Link>, PersistenceError> {
        self.record(StoreCall::Fetch { stock_id });
        self.take_failure(StoreOp::Fetch)?;
        Ok(self.links_for(stock_id))
    }
}

impl LinkWriter for MemoryLinkStore {
    fn save(&mut self, links: &[Link]) -> Result<(), PersistenceError> {
        self.record(StoreCall::Save {
            links: links.to_vec(),
        });
        self.take_failure(StoreOp::Save)?;
        self.upsert_all(links);
        Ok(())
    }

    fn delete(&mut self, links: &[Link]) -> Result<(), PersistenceError> {
        self.record(StoreCall::Delete {
            links: links.to_vec(),
        });
        self.take_failure(StoreOp::Delete)?;
        for link in links {
            self.rows.remove(&(link.stock_id, link.source_code.clone()));
        }
        Ok(())
    }
}

/// Install a test subscriber once per process (`RUST_LOG` filters it).
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
