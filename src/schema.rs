//! Typed constructors and validators for the three persisted record kinds:
//! [`Turn`], [`Commit`], and [`MemoryManifest`]. Also defines the
//! append-only reflog record shape.
//!
//! Every persisted record carries a `schema` discriminator string; decoders
//! must dispatch on it and refuse anything unrecognized with
//! [`GaitError::SchemaError`].

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GaitError;

pub const SCHEMA_TURN_V0: &str = "gait.turn.v0";
pub const SCHEMA_COMMIT_V0: &str = "gait.commit.v0";
pub const SCHEMA_MEMORY_V0: &str = "gait.memory.v0";
pub const SCHEMA_CONTEXT_V0: &str = "gait.context.v0";

/// Turn visibility: whether it may be re-surfaced outside a private session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Shareable,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Shareable => write!(f, "shareable"),
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Private
    }
}

/// One side of a turn (user or assistant message).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "message".to_string(),
            text: text.into(),
        }
    }
}

/// Token accounting for a turn. Counting is not performed by this crate —
/// values are stored exactly as the caller provides them and only
/// aggregated later (see [`crate::context::budget_for_memory`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_total: Option<u64>,
    #[serde(default = "default_estimated")]
    pub estimated: bool,
    #[serde(default)]
    pub by_role: HashMap<String, u64>,
}

fn default_estimated() -> bool {
    true
}

/// An immutable user/assistant exchange — the atomic unit of recorded
/// conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub user: Message,
    pub assistant: Message,
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub tools: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub model: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub tokens: Tokens,
    pub visibility: Visibility,
}

impl Turn {
    /// Build a v0 turn with the given user/assistant text and defaults for
    /// everything else.
    #[allow(clippy::too_many_arguments)]
    pub fn v0(
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
        context: serde_json::Map<String, serde_json::Value>,
        tools: serde_json::Map<String, serde_json::Value>,
        model: serde_json::Map<String, serde_json::Value>,
        tokens: Tokens,
        visibility: Visibility,
    ) -> Self {
        Self {
            schema: SCHEMA_TURN_V0.to_string(),
            created_at: Utc::now(),
            user: Message::text(user_text),
            assistant: Message::text(assistant_text),
            context,
            tools,
            model,
            tokens,
            visibility,
        }
    }

    /// Validate the invariants this crate relies on: schema tag, non-empty
    /// (well, present) text fields, non-negative token counters.
    pub fn validate(&self) -> Result<(), GaitError> {
        if self.schema != SCHEMA_TURN_V0 {
            return Err(GaitError::SchemaError(format!(
                "unknown turn schema `{}`",
                self.schema
            )));
        }
        if self.user.text.is_empty() && self.assistant.text.is_empty() {
            return Err(GaitError::SchemaError(
                "turn must have user or assistant text".to_string(),
            ));
        }
        Ok(())
    }
}

/// Commit kind: whether it's an ordinary auto-commit, a user-blessed one, or
/// a union of two branch histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKind {
    Auto,
    Blessed,
    Merge,
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitKind::Auto => write!(f, "auto"),
            CommitKind::Blessed => write!(f, "blessed"),
            CommitKind::Merge => write!(f, "merge"),
        }
    }
}

/// An immutable DAG node pointing at zero or more turns and zero, one, or
/// many parent commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub parents: Vec<String>,
    pub turn_ids: Vec<String>,
    /// Always null in this version; reserved for future file-tree snapshots.
    pub snapshot_id: Option<String>,
    pub branch: String,
    pub kind: CommitKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Commit {
    pub fn v0(
        parents: Vec<String>,
        turn_ids: Vec<String>,
        branch: impl Into<String>,
        kind: CommitKind,
        message: impl Into<String>,
        meta: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            schema: SCHEMA_COMMIT_V0.to_string(),
            created_at: Utc::now(),
            parents,
            turn_ids,
            snapshot_id: None,
            branch: branch.into(),
            kind,
            message: message.into(),
            meta,
        }
    }

    pub fn validate(&self) -> Result<(), GaitError> {
        if self.schema != SCHEMA_COMMIT_V0 {
            return Err(GaitError::SchemaError(format!(
                "unknown commit schema `{}`",
                self.schema
            )));
        }
        let is_merge_kind = self.kind == CommitKind::Merge;
        let has_merge_parents = self.parents.len() >= 2;
        if is_merge_kind != has_merge_parents {
            return Err(GaitError::SchemaError(
                "commit kind `merge` iff len(parents) >= 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// One pinned reference to a turn inside a [`MemoryManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub turn_id: String,
    pub commit_id: String,
    #[serde(default)]
    pub note: String,
    pub pinned_at: DateTime<Utc>,
}

/// An ordered, deduplicated list of pinned turn references for a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryManifest {
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub branch: String,
    pub items: Vec<MemoryItem>,
}

/// Fixed instant stamped on every canonical empty manifest, so that two
/// independently-constructed empty manifests for the same branch always
/// hash to the same oid (spec: "a single stable content-address per
/// branch name").
fn canonical_empty_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).expect("unix epoch is a valid timestamp")
}

impl MemoryManifest {
    /// The canonical empty manifest for `branch`. Uses a fixed epoch
    /// timestamp rather than wall-clock time, so every construction for the
    /// same branch encodes to identical bytes and therefore the same oid.
    pub fn empty(branch: impl Into<String>) -> Self {
        Self {
            schema: SCHEMA_MEMORY_V0.to_string(),
            created_at: canonical_empty_epoch(),
            branch: branch.into(),
            items: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), GaitError> {
        if self.schema != SCHEMA_MEMORY_V0 {
            return Err(GaitError::SchemaError(format!(
                "unknown memory schema `{}`",
                self.schema
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for item in &self.items {
            if !seen.insert(&item.turn_id) {
                return Err(GaitError::SchemaError(format!(
                    "duplicate turn_id `{}` in memory manifest",
                    item.turn_id
                )));
            }
        }
        Ok(())
    }

    /// Append `item` unless its `turn_id` is already pinned; returns whether
    /// it was added.
    pub fn push_if_new(&mut self, item: MemoryItem) -> bool {
        if self.items.iter().any(|i| i.turn_id == item.turn_id) {
            return false;
        }
        self.items.push(item);
        true
    }
}

/// The operation recorded by one [`ReflogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflogOp {
    Branch,
    Pin,
    Unpin,
    Merge,
    Rewind,
}

impl fmt::Display for ReflogOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflogOp::Branch => write!(f, "branch"),
            ReflogOp::Pin => write!(f, "pin"),
            ReflogOp::Unpin => write!(f, "unpin"),
            ReflogOp::Merge => write!(f, "merge"),
            ReflogOp::Rewind => write!(f, "rewind"),
        }
    }
}

/// One entry in a branch's append-only memory reflog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflogRecord {
    pub old_oid: String,
    pub new_oid: String,
    pub op: ReflogOp,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
}

impl ReflogRecord {
    pub fn new(old_oid: impl Into<String>, new_oid: impl Into<String>, op: ReflogOp) -> Self {
        Self {
            old_oid: old_oid.into(),
            new_oid: new_oid.into(),
            op,
            at: Utc::now(),
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}
