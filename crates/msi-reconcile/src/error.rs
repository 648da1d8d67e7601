use std::fmt;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Desired input rejected before any store interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Record at `index` has no source code, or an empty one.
    MissingSourceCode { index: usize },
    /// Record at `index` repeats the source code first seen at `first_index`.
    DuplicateSourceCode {
        index: usize,
        first_index: usize,
        source_code: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSourceCode { index } => write!(
                f,
                "Wrong Stock to Source relation parameters given: record {index} has no source_code"
            ),
            Self::DuplicateSourceCode {
                index,
                first_index,
                source_code,
            } => write!(
                f,
                "Wrong Stock to Source relation parameters given: record {index} repeats \
                 source_code '{source_code}' (first at record {first_index})"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Which store operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    Fetch,
    Save,
    Delete,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::Fetch => "fetch",
            StoreOp::Save => "save",
            StoreOp::Delete => "delete",
        }
    }
}

/// Failure reported by a link store. Passed through to the caller untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistenceError {
    pub op: StoreOp,
    pub message: String,
}

impl PersistenceError {
    pub fn new(op: StoreOp, message: impl fmt::Display) -> Self {
        Self {
            op,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link store {} failed: {}", self.op.as_str(), self.message)
    }
}

impl std::error::Error for PersistenceError {}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    Validation(ValidationError),
    Persistence(PersistenceError),
}

impl LinkError {
    pub fn is_validation(&self) -> bool {
        matches!(self, LinkError::Validation(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, LinkError::Persistence(_))
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Validation(e) => e.fmt(f),
            LinkError::Persistence(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkError::Validation(e) => Some(e),
            LinkError::Persistence(e) => Some(e),
        }
    }
}

impl From<ValidationError> for LinkError {
    fn from(e: ValidationError) -> Self {
        LinkError::Validation(e)
    }
}

impl From<PersistenceError> for LinkError {
    fn from(e: PersistenceError) -> Self {
        LinkError::Persistence(e)
    }
}
