//! Index scope state
//!
//! # Invariants
//!
//! - Exactly two states; a fresh instance is always `UseMainTable`.
//! - Only the two explicit switches change the state. Neither can fail.
//! - One instance per indexing run. It is a plain value (no global, no
//!   interior mutability) so two concurrent runs cannot observe each other.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which backing table indexing code should read and write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTableState {
    /// Leave the main table untouched; use the shadow table.
    UseTemporaryTable,
    /// Use the regular index table.
    #[default]
    UseMainTable,
}

impl IndexTableState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexTableState::UseTemporaryTable => "use_temporary_table",
            IndexTableState::UseMainTable => "use_main_table",
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, IndexTableState::UseTemporaryTable)
    }
}

/// Per-run table selector consulted by the indexer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexScopeState {
    state: IndexTableState,
}

impl IndexScopeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route reads/writes to the shadow table.
    pub fn use_temporary_index(&mut self) {
        if self.state != IndexTableState::UseTemporaryTable {
            debug!(from = self.state.as_str(), "index scope -> use_temporary_table");
        }
        self.state = IndexTableState::UseTemporaryTable;
    }

    /// Route reads/writes back to the main table.
    pub fn use_regular_index(&mut self) {
        if self.state != IndexTableState::UseMainTable {
            debug!(from = self.state.as_str(), "index scope -> use_main_table");
        }
        self.state = IndexTableState::UseMainTable;
    }

    pub fn state(&self) -> IndexTableState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_strings_are_stable() {
        assert_eq!(IndexTableState::UseTemporaryTable.as_str(), "use_temporary_table");
        assert_eq!(IndexTableState::UseMainTable.as_str(), "use_main_table");
        assert_eq!(
            serde_json::to_string(&IndexTableState::UseTemporaryTable).unwrap(),
            "\"use_temporary_table\""
        );
    }

    #[test]
    fn switches_are_idempotent() {
        let mut s = IndexScopeState::new();
        s.use_temporary_index();
        s.use_temporary_index();
        assert!(s.state().is_temporary());
        s.use_regular_index();
        s.use_regular_index();
        assert_eq!(s.state(), IndexTableState::UseMainTable);
    }
}
