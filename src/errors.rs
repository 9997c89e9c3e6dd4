//! Error types for the gait crate.
//!
//! This module defines a unified error enumeration used across the object
//! store, ref store, schema validation, and repository engine. It integrates
//! with `thiserror` to provide rich `Display` implementations and error
//! source chaining where applicable.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Variants cover lookup/validation failures, I/O, and corruption.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the gait library.
///
/// - Used across the object store, ref store, DAG walker, and repository engine.
/// - Implements `std::error::Error` via `thiserror`.
pub enum GaitError {
    /// Discovery found no `.gait/` ancestor.
    #[error("not a gait repository (or any parent up to the root): {0}")]
    NoRepo(String),

    /// Object, ref, or branch does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Oid prefix matches more than one stored object.
    #[error("ambiguous oid prefix `{0}`: matches more than one object")]
    Ambiguous(String),

    /// Branch creation target is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Operation requires a commit but the branch has none.
    #[error("branch `{0}` has no commits")]
    EmptyBranch(String),

    /// Unpin index is out of bounds.
    #[error("index {0} out of range (1..={1})")]
    OutOfRange(usize, usize),

    /// Stored object fails decode or hash verification.
    #[error("corrupt object `{0}`: {1}")]
    Corrupt(String, String),

    /// A persisted record is missing required fields or has the wrong schema.
    #[error("schema error: {0}")]
    SchemaError(String),

    /// Underlying filesystem error.
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    /// Canonical JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
