// Error types for the autofill core.
//
// Three layers:
//   MeshError    → failures reported by host-mesh primitives
//   ServiceError → pattern-service transport / decode failures
//   AutofillError → crate-level error, wraps both via #[from]
//
// Invariant violations (caller bugs upstream of classification) are NOT
// represented here; they are assert! panics at the call site.

use thiserror::Error;

use super::mesh::{EdgeId, FaceId, VertId};

/// Failures of the host mesh primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    #[error("stale or deleted vertex handle: {0:?}")]
    StaleVertex(VertId),

    #[error("stale or deleted face handle: {0:?}")]
    StaleFace(FaceId),

    #[error("edge already exists between {0:?} and {1:?}: {2:?}")]
    DuplicateEdge(VertId, VertId, EdgeId),

    #[error("edge endpoints must differ: {0:?}")]
    DegenerateEdge(VertId),

    #[error("face needs at least 3 distinct vertices, got {0}")]
    DegenerateFace(usize),
}

/// Failures talking to the pattern-generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("pattern service unavailable: {0}")]
    Unavailable(String),

    #[error("pattern service returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pattern service returned an invalid variant: {0}")]
    InvalidVariant(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum AutofillError {
    /// Fewer than 2 usable stroke points (or 3 for a cycle).
    /// Recoverable: the action is abandoned and nothing is mutated.
    #[error("stroke too short: {0} usable points")]
    StrokeTooShort(usize),

    /// A side would have fewer than 2 vertices.
    #[error("side collapsed to {0} vertices")]
    DegenerateSide(usize),

    /// A vertex repeats inside a side (only a loop may repeat its first vertex, at the end).
    #[error("side revisits vertex {0:?}")]
    NotSimple(VertId),

    /// Edge fragments passed to `Side::from_edges` do not chain.
    #[error("edges do not form a contiguous strip")]
    DisconnectedEdges,

    #[error("split halves could not be assembled into two closed patches")]
    SplitFailed,

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub type Result<T> = std::result::Result<T, AutofillError>;
