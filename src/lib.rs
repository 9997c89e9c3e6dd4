//! gait is a content-addressed, branch-aware versioning store for LLM
//! conversation turns: every user/assistant exchange becomes an immutable
//! turn, wrapped in a commit that extends a branch's history as a DAG, with
//! a per-branch pinned-memory manifest for curating context handed back to
//! a future model call.

pub mod codec;
pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod hash;
pub mod objects;
pub mod refs;
pub mod repo;
pub mod schema;

pub use config::RepoConfig;
pub use context::{ContextBundle, ContextItem, MemoryBudget};
pub use errors::GaitError;
pub use hash::Oid;
pub use repo::GaitRepo;
pub use schema::{Commit, CommitKind, MemoryItem, MemoryManifest, Message, Tokens, Turn, Visibility};
