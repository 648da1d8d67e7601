//! msi-reconcile
//!
//! Stock/source link reconciliation (replace strategy).
//!
//! Architectural decisions:
//! - Desired state wins: every persisted link whose source code is absent from
//!   the desired set is deleted, everything desired is saved
//! - Validation is fail-fast and total: one bad record aborts the whole call
//!   before the store is touched
//! - Persisted links are reused as overlay targets so their identity survives
//! - Planning is pure (no IO); the store is reached only through
//!   [`LinkReader`] / [`LinkWriter`]

mod engine;
mod error;
mod processor;
mod types;

pub use engine::{plan_links, validate_links};
pub use error::{LinkError, PersistenceError, StoreOp, ValidationError};
pub use processor::{apply_plan, LinkReader, LinkReconciler, LinkWriter};
pub use types::*;
