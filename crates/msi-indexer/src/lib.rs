//! msi-indexer
//!
//! Table targeting for stock index rebuilds.
//!
//! A rebuild writes into a shadow table while readers keep using the main
//! table; once the shadow table is complete the two are swapped (see
//! `msi-db::swap_index_tables`). The indexer asks [`IndexScopeState`] at every
//! read/write point which of the two it should touch, and
//! [`IndexTableResolver`] turns that answer into a table name.

mod resolver;
mod scope_state;

pub use resolver::{IndexTableResolver, InvalidTableName, DEFAULT_TEMPORARY_SUFFIX};
pub use scope_state::{IndexScopeState, IndexTableState};
