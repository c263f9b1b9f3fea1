//! Error types for building, validating and rendering commands.

use thiserror::Error;

/// Structural errors raised immediately while a Bag is being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Constraint field must be a name, got {0}")]
    InvalidField(String),

    #[error("Unknown comparator: {0}")]
    InvalidComparator(String),

    #[error("Unknown conjunction: {0}")]
    InvalidConjunction(String),

    #[error("Malformed constraint: expected {expected} parts, got {actual}")]
    MalformedConstraint { expected: usize, actual: usize },

    #[error("Unknown element type: {0}")]
    InvalidElementType(String),

    #[error("Element type selectors must compare with EQUAL, got {0}")]
    InvalidElementTypeComparator(String),

    #[error("Unknown bag alias: {0}")]
    UnknownAlias(String),

    #[error("Builder holds no bag")]
    NoBag,
}

/// Aggregated report of every invariant a Bag violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bag validation failed: {}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl ValidationError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }

    /// Whether any violation message contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.violations.iter().any(|v| v.contains(needle))
    }
}

/// Misuse of a [`Batch`](crate::render::Batch).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Batch has not been opened with begin()")]
    NotOpen,

    #[error("Batch is already open")]
    AlreadyOpen,

    #[error("Batch has no statements to commit")]
    Empty,

    #[error("Batch has already been committed")]
    Closed,
}

/// Errors raised while a processor emits a script.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The dialect cannot express the requested shape
    #[error("{dialect} does not support {feature}")]
    NotSupported {
        dialect: &'static str,
        feature: String,
    },

    /// A code path that is intentionally not built yet
    #[error("Not yet supported: {0}")]
    Unimplemented(String),

    /// A nested Bag used where only a retrieve makes sense
    #[error("Embedded bag at {location} must be a retrieve operation")]
    InvalidEmbedded { location: String },

    #[error("Alias '{0}' does not name a bag earlier in the same batch")]
    UnresolvedAlias(String),

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Bag has no operation to render")]
    MissingOperation,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl RenderError {
    pub(crate) fn not_supported(dialect: &'static str, feature: impl Into<String>) -> Self {
        Self::NotSupported {
            dialect,
            feature: feature.into(),
        }
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }
}

/// Any failure between a Builder mutation and a finished Command.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for translation operations
pub type QueryResult<T> = Result<T, QueryError>;

impl QueryError {
    /// Whether this is a dialect capability gap
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::Render(e) if e.is_not_supported())
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Build(_) => "structural",
            Self::Validation(_) => "validation",
            Self::Render(RenderError::NotSupported { .. }) => "capability",
            Self::Render(RenderError::Unimplemented(_)) => "unimplemented",
            Self::Render(_) => "render",
        }
    }
}
