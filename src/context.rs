//! Context Assembler — pure functions turning the current memory manifest
//! and its referenced turns into a context-pack bundle or a token budget
//! summary. Neither function mutates refs or objects.

use serde::Serialize;

use crate::errors::GaitError;
use crate::objects::ObjectStore;
use crate::schema::{MemoryManifest, SCHEMA_CONTEXT_V0, Turn};

/// One pinned item rendered for external (prompt) consumption.
#[derive(Debug, Clone, Serialize)]
pub struct ContextItem {
    pub index: usize,
    pub note: String,
    pub user_text: String,
    pub assistant_text: String,
    pub commit_id: String,
    pub turn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<crate::schema::Tokens>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<crate::schema::Visibility>,
}

/// The derived view of a branch's memory manifest, shaped for model-prompt
/// consumption.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub schema: String,
    pub branch: String,
    pub memory_id: String,
    pub pinned_items: usize,
    pub items: Vec<ContextItem>,
}

/// Build a context bundle from `manifest`, loading each pinned turn from
/// `store`. `full` includes the raw per-turn `context`/`tools`/`model`/
/// `tokens`/`visibility` fields; the compact form omits them.
pub fn build_context_bundle(
    store: &ObjectStore,
    branch: &str,
    memory_id: &str,
    manifest: &MemoryManifest,
    full: bool,
) -> Result<ContextBundle, GaitError> {
    let mut items = Vec::with_capacity(manifest.items.len());
    for (i, item) in manifest.items.iter().enumerate() {
        let turn: Turn = store.get(&item.turn_id)?;
        items.push(ContextItem {
            index: i + 1,
            note: item.note.clone(),
            user_text: turn.user.text.clone(),
            assistant_text: turn.assistant.text.clone(),
            commit_id: item.commit_id.clone(),
            turn_id: item.turn_id.clone(),
            context: full.then(|| turn.context.clone()),
            tools: full.then(|| turn.tools.clone()),
            model: full.then(|| turn.model.clone()),
            tokens: full.then(|| turn.tokens.clone()),
            visibility: full.then_some(turn.visibility),
        });
    }
    Ok(ContextBundle {
        schema: SCHEMA_CONTEXT_V0.to_string(),
        branch: branch.to_string(),
        memory_id: memory_id.to_string(),
        pinned_items: manifest.items.len(),
        items,
    })
}

/// Aggregate token budget summary across a branch's pinned memory.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryBudget {
    pub branch: String,
    pub pinned_items: usize,
    pub tokens_input_total: u64,
    pub tokens_output_total: u64,
    pub unknown_token_fields: usize,
}

pub fn budget_for_memory(
    store: &ObjectStore,
    branch: &str,
    manifest: &MemoryManifest,
) -> Result<MemoryBudget, GaitError> {
    let mut tokens_input_total = 0u64;
    let mut tokens_output_total = 0u64;
    let mut unknown_token_fields = 0usize;

    for item in &manifest.items {
        let turn: Turn = store.get(&item.turn_id)?;
        match (turn.tokens.input_total, turn.tokens.output_total) {
            (None, None) => unknown_token_fields += 1,
            (input, output) => {
                tokens_input_total += input.unwrap_or(0);
                tokens_output_total += output.unwrap_or(0);
            }
        }
    }

    Ok(MemoryBudget {
        branch: branch.to_string(),
        pinned_items: manifest.items.len(),
        tokens_input_total,
        tokens_output_total,
        unknown_token_fields,
    })
}
