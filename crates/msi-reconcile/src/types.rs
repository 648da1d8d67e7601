use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stock ↔ source association as persisted by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Store-assigned identity. `None` until the link has been saved once.
    #[serde(default)]
    pub link_id: Option<i64>,
    pub stock_id: i64,
    /// Natural key of the link within its stock.
    pub source_code: String,
    #[serde(default)]
    pub priority: i32,
    /// Opaque attributes carried through unchanged (status flags etc.).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension: BTreeMap<String, Value>,
}

impl Link {
    /// A fresh, never-persisted link.
    pub fn new(stock_id: i64, source_code: impl Into<String>) -> Self {
        Self {
            link_id: None,
            stock_id,
            source_code: source_code.into(),
            priority: 0,
            extension: BTreeMap::new(),
        }
    }

    pub fn with_link_id(mut self, link_id: i64) -> Self {
        self.link_id = Some(link_id);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.link_id.is_some()
    }
}

/// One desired link as submitted by the caller.
///
/// Every field is optional so that "absent" and "present" stay distinct:
/// only present fields are written onto the target link. Keys not named
/// here land in `extension`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    /// Ignored by planning: the stock being processed always wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, flatten)]
    pub extension: BTreeMap<String, Value>,
}

impl LinkPatch {
    pub fn new(source_code: impl Into<String>) -> Self {
        Self {
            source_code: Some(source_code.into()),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extension.insert(key.into(), value);
        self
    }

    /// Overlay the present fields of this patch onto `link`.
    ///
    /// Absent fields leave the link untouched; extension entries are merged
    /// key by key. `link_id` is never written.
    pub fn apply_to(&self, link: &mut Link) {
        if let Some(code) = &self.source_code {
            link.source_code = code.clone();
        }
        if let Some(stock_id) = self.stock_id {
            link.stock_id = stock_id;
        }
        if let Some(priority) = self.priority {
            link.priority = priority;
        }
        for (key, value) in &self.extension {
            link.extension.insert(key.clone(), value.clone());
        }
    }
}

/// A desired link that passed validation: its source code is known non-empty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesiredLink<'a> {
    /// Position in the caller's input.
    pub index: usize,
    pub source_code: &'a str,
    pub patch: &'a LinkPatch,
}

/// What to do when one call names the same source code more than once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCodePolicy {
    /// Repeated codes are a validation error.
    #[default]
    Reject,
    /// Repeated codes collapse into one save entry; later values win.
    LastWins,
}

impl DuplicateCodePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateCodePolicy::Reject => "reject",
            DuplicateCodePolicy::LastWins => "last_wins",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reject" => Some(DuplicateCodePolicy::Reject),
            "last_wins" => Some(DuplicateCodePolicy::LastWins),
            _ => None,
        }
    }
}

/// Save and delete batches for one stock.
///
/// `save` and `delete` are disjoint by source code. `save` keeps first-seen
/// input order; `delete` is ordered by source code.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkPlan {
    pub stock_id: i64,
    pub save: Vec<Link>,
    pub delete: Vec<Link>,
}

impl LinkPlan {
    pub fn is_noop(&self) -> bool {
        self.save.is_empty() && self.delete.is_empty()
    }

    pub fn saved_codes(&self) -> Vec<&str> {
        self.save.iter().map(|l| l.source_code.as_str()).collect()
    }

    pub fn deleted_codes(&self) -> Vec<&str> {
        self.delete.iter().map(|l| l.source_code.as_str()).collect()
    }
}

/// Summary handed back to the caller after the batches were applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub stock_id: i64,
    pub saved: usize,
    pub deleted: usize,
}
