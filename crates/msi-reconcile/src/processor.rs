use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    plan_links, validate_links, DesiredLink, DuplicateCodePolicy, Link, LinkError, LinkPatch,
    LinkPlan, PersistenceError, ProcessOutcome, ValidationError,
};

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// Read side of the link store.
pub trait LinkReader {
    /// Every persisted link of `stock_id`; empty when there are none.
    fn fetch_by_stock(&self, stock_id: i64) -> Result<Vec<Link>, PersistenceError>;
}

/// Write side of the link store.
///
/// Implementations should apply each batch all-or-nothing. `save` must be
/// an upsert keyed by `(stock_id, source_code)`.
pub trait LinkWriter {
    fn save(&mut self, links: &[Link]) -> Result<(), PersistenceError>;
    fn delete(&mut self, links: &[Link]) -> Result<(), PersistenceError>;
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Replace-strategy reconciler for the sources assigned to a stock.
///
/// Holds no store; the store is passed to each call. Calls for the same
/// stock must be serialized by the caller or the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkReconciler {
    policy: DuplicateCodePolicy,
}

impl LinkReconciler {
    pub fn new(policy: DuplicateCodePolicy) -> Self {
        Self { policy }
    }

    /// Build from canonical config JSON (produced by msi-config).
    ///
    /// Optional:
    /// - reconcile.duplicate_source_codes (`reject` | `last_wins`); default=reject
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let policy = match cfg.pointer("/reconcile/duplicate_source_codes") {
            None | Some(Value::Null) => DuplicateCodePolicy::default(),
            Some(v) => {
                let raw = v
                    .as_str()
                    .context("reconcile.duplicate_source_codes must be a string")?;
                DuplicateCodePolicy::parse(raw).with_context(|| {
                    format!(
                        "reconcile.duplicate_source_codes must be 'reject' or 'last_wins' (got '{raw}')"
                    )
                })?
            }
        };
        Ok(Self::new(policy))
    }

    pub fn policy(&self) -> DuplicateCodePolicy {
        self.policy
    }

    /// Validate `desired` for `stock_id`; rejections are logged here.
    ///
    /// Every store path starts with this, before any IO.
    pub fn validate<'a>(
        &self,
        stock_id: i64,
        desired: &'a [LinkPatch],
    ) -> Result<Vec<DesiredLink<'a>>, ValidationError> {
        validate_links(desired, self.policy).map_err(|e| {
            warn!(stock_id, error = %e, "stock source links rejected");
            e
        })
    }

    /// Diff links already fetched for `stock_id` against validated input.
    pub fn plan_fetched(
        &self,
        stock_id: i64,
        existing: Vec<Link>,
        valid: &[DesiredLink<'_>],
    ) -> LinkPlan {
        let plan = plan_links(stock_id, existing, valid);
        debug!(
            stock_id,
            save = ?plan.saved_codes(),
            delete = ?plan.deleted_codes(),
            "stock source link plan"
        );
        plan
    }

    /// Outcome of a plan whose batches have been applied.
    pub fn finish(&self, plan: &LinkPlan) -> ProcessOutcome {
        let outcome = ProcessOutcome {
            stock_id: plan.stock_id,
            saved: plan.save.len(),
            deleted: plan.delete.len(),
        };
        info!(
            stock_id = outcome.stock_id,
            saved = outcome.saved,
            deleted = outcome.deleted,
            "stock source links reconciled"
        );
        outcome
    }

    /// Validate, fetch and diff without writing anything.
    pub fn plan<R: LinkReader + ?Sized>(
        &self,
        reader: &R,
        stock_id: i64,
        desired: &[LinkPatch],
    ) -> Result<LinkPlan, LinkError> {
        let valid = self.validate(stock_id, desired)?;
        let existing = reader.fetch_by_stock(stock_id)?;
        Ok(self.plan_fetched(stock_id, existing, &valid))
    }

    /// Make the persisted links of `stock_id` equal `desired`.
    ///
    /// One fetch, at most one save and at most one delete. A validation
    /// failure means the store was not touched at all; a store failure is
    /// returned as-is and nothing after it runs.
    pub fn process<S: LinkReader + LinkWriter + ?Sized>(
        &self,
        store: &mut S,
        stock_id: i64,
        desired: &[LinkPatch],
    ) -> Result<ProcessOutcome, LinkError> {
        let plan = self.plan(&*store, stock_id, desired)?;
        apply_plan(store, &plan)?;
        Ok(self.finish(&plan))
    }
}

/// Hand a plan's batches to the writer. Empty batches are skipped.
pub fn apply_plan<W: LinkWriter + ?Sized>(
    writer: &mut W,
    plan: &LinkPlan,
) -> Result<(), PersistenceError> {
    if !plan.save.is_empty() {
        writer.save(&plan.save)?;
    }
    if !plan.delete.is_empty() {
        writer.delete(&plan.delete)?;
    }
    Ok(())
}
