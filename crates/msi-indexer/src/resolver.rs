use std::fmt;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::{IndexScopeState, IndexTableState};

/// Suffix appended to the main table name to form the shadow table.
pub const DEFAULT_TEMPORARY_SUFFIX: &str = "_replica";

/// Postgres truncates identifiers beyond this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A table name that cannot be used as a bare SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidTableName {
    Empty,
    IllegalCharacter { name: String },
    TooLong { name: String, len: usize },
}

impl fmt::Display for InvalidTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "index table name is empty"),
            Self::IllegalCharacter { name } => write!(
                f,
                "index table name '{name}' must match [A-Za-z_][A-Za-z0-9_]*"
            ),
            Self::TooLong { name, len } => write!(
                f,
                "index table name '{name}' is {len} bytes (max {MAX_IDENTIFIER_LEN})"
            ),
        }
    }
}

impl std::error::Error for InvalidTableName {}

fn check_identifier(name: &str) -> Result<(), InvalidTableName> {
    let mut chars = name.chars();
    let first = chars.next().ok_or(InvalidTableName::Empty)?;
    let head_ok = first.is_ascii_alphabetic() || first == '_';
    if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(InvalidTableName::IllegalCharacter {
            name: name.to_string(),
        });
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(InvalidTableName::TooLong {
            name: name.to_string(),
            len: name.len(),
        });
    }
    Ok(())
}

/// Maps an [`IndexTableState`] to a concrete table for one index.
///
/// Both the main and the shadow name are validated on construction, so the
/// names can be interpolated into DDL unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTableResolver {
    main_table: String,
    temporary_table: String,
}

impl IndexTableResolver {
    pub fn new(main_table: impl Into<String>, temporary_suffix: &str) -> Result<Self, InvalidTableName> {
        let main_table = main_table.into();
        check_identifier(&main_table)?;
        let temporary_table = format!("{main_table}{temporary_suffix}");
        check_identifier(&temporary_table)?;
        Ok(Self {
            main_table,
            temporary_table,
        })
    }

    /// Resolver for the per-stock index table `inventory_stock_<stock_id>`.
    pub fn for_stock(stock_id: i64, temporary_suffix: &str) -> Result<Self, InvalidTableName> {
        Self::new(format!("inventory_stock_{stock_id}"), temporary_suffix)
    }

    /// Build from canonical config JSON (produced by msi-config).
    ///
    /// Optional:
    /// - indexer.temporary_table_suffix (string); default=`_replica`
    pub fn from_config_json(cfg: &Value, stock_id: i64) -> Result<Self> {
        let suffix = match cfg.pointer("/indexer/temporary_table_suffix") {
            None | Some(Value::Null) => DEFAULT_TEMPORARY_SUFFIX,
            Some(v) => v
                .as_str()
                .context("indexer.temporary_table_suffix must be a string")?,
        };
        if suffix.is_empty() {
            anyhow::bail!("indexer.temporary_table_suffix must not be empty");
        }
        Self::for_stock(stock_id, suffix)
            .with_context(|| format!("invalid index table for stock {stock_id}"))
    }

    pub fn main_table(&self) -> &str {
        &self.main_table
    }

    pub fn temporary_table(&self) -> &str {
        &self.temporary_table
    }

    pub fn table_for(&self, state: IndexTableState) -> &str {
        match state {
            IndexTableState::UseTemporaryTable => &self.temporary_table,
            IndexTableState::UseMainTable => &self.main_table,
        }
    }

    /// Table the run owning `scope` should touch right now.
    pub fn resolve(&self, scope: &IndexScopeState) -> &str {
        self.table_for(scope.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_follow_scope_state() {
        let r = IndexTableResolver::for_stock(3, DEFAULT_TEMPORARY_SUFFIX).unwrap();
        let mut scope = IndexScopeState::new();
        assert_eq!(r.resolve(&scope), "inventory_stock_3");
        scope.use_temporary_index();
        assert_eq!(r.resolve(&scope), "inventory_stock_3_replica");
        scope.use_regular_index();
        assert_eq!(r.resolve(&scope), "inventory_stock_3");
    }

    #[test]
    fn rejects_non_identifier_names() {
        assert_eq!(IndexTableResolver::new("", "_tmp"), Err(InvalidTableName::Empty));
        assert!(matches!(
            IndexTableResolver::new("stock; drop table x", "_tmp"),
            Err(InvalidTableName::IllegalCharacter { .. })
        ));
        assert!(matches!(
            IndexTableResolver::new("1stock", "_tmp"),
            Err(InvalidTableName::IllegalCharacter { .. })
        ));
        assert!(matches!(
            IndexTableResolver::new("inventory_stock_1", "-tmp"),
            Err(InvalidTableName::IllegalCharacter { .. })
        ));
    }

    #[test]
    fn rejects_names_past_identifier_limit() {
        let main = "s".repeat(60);
        assert!(matches!(
            IndexTableResolver::new(main, "_replica"),
            Err(InvalidTableName::TooLong { len: 68, .. })
        ));
    }

    #[test]
    fn config_overrides_suffix() {
        let cfg = json!({ "indexer": { "temporary_table_suffix": "_tmp" } });
        let r = IndexTableResolver::from_config_json(&cfg, 7).unwrap();
        assert_eq!(r.temporary_table(), "inventory_stock_7_tmp");

        let r = IndexTableResolver::from_config_json(&json!({}), 7).unwrap();
        assert_eq!(r.temporary_table(), "inventory_stock_7_replica");
    }

    #[test]
    fn empty_suffix_would_alias_main_table() {
        let cfg = json!({ "indexer": { "temporary_table_suffix": "" } });
        assert!(IndexTableResolver::from_config_json(&cfg, 7).is_err());
    }
}
