//! Repository Engine — the public façade orchestrating the object store,
//! ref store, schema layer, and DAG walker into the operations a caller
//! actually performs: init, discover, record a turn, branch, pin memory,
//! merge, revert.
//!
//! Holds no in-memory cache across calls; every operation re-reads refs
//! from disk. This keeps concurrent processes (e.g. a CLI invoked twice in
//! a row) safe at the cost of re-parsing small ref files on every call,
//! which is cheap next to the filesystem round-trip itself.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::codec;
use crate::config::RepoConfig;
use crate::context::{self, ContextBundle, MemoryBudget};
use crate::dag;
use crate::errors::GaitError;
use crate::hash::Oid;
use crate::objects::ObjectStore;
use crate::refs::RefStore;
use crate::schema::{
    Commit, CommitKind, MemoryItem, MemoryManifest, ReflogOp, ReflogRecord, Turn,
};

const GAIT_DIR: &str = ".gait";

/// A handle onto an on-disk repository rooted at `root`.
pub struct GaitRepo {
    root: PathBuf,
    objects: ObjectStore,
    refs: RefStore,
    config: RepoConfig,
}

impl GaitRepo {
    fn gait_dir(root: &Path) -> PathBuf {
        root.join(GAIT_DIR)
    }

    fn open(root: PathBuf) -> Result<Self, GaitError> {
        let gait_dir = Self::gait_dir(&root);
        let config = RepoConfig::load(&root)?;
        Ok(Self {
            objects: ObjectStore::with_fanout_width(
                gait_dir.join("objects"),
                config.fanout_hex_width,
            ),
            refs: RefStore::new(gait_dir),
            root,
            config,
        })
    }

    /// Create the on-disk layout at `root` if absent; a no-op if `root`
    /// already contains a `.gait/` directory.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, GaitError> {
        let root = root.into();
        let gait_dir = Self::gait_dir(&root);
        let repo = Self::open(root)?;

        if gait_dir.exists() {
            repo.objects.sweep_tmp()?;
            return Ok(repo);
        }

        std::fs::create_dir_all(gait_dir.join("objects"))?;
        std::fs::create_dir_all(gait_dir.join("refs").join("heads"))?;
        std::fs::create_dir_all(gait_dir.join("refs").join("memory"))?;
        std::fs::create_dir_all(gait_dir.join("refs").join("memory-reflog"))?;

        let default_branch = repo.config.default_branch.clone();
        repo.refs.write("heads", &default_branch, "")?;
        repo.refs.write_head(&default_branch)?;

        let empty_manifest = MemoryManifest::empty(&default_branch);
        let mem_oid = repo.objects.put(&empty_manifest)?;
        repo.refs.write("memory", &default_branch, mem_oid.as_str())?;

        tracing::info!(branch = %default_branch, "initialized gait repository");
        Ok(repo)
    }

    /// Walk upward from `start` looking for a `.gait/` directory.
    pub fn discover(start: impl Into<PathBuf>) -> Result<Self, GaitError> {
        let mut dir = start.into();
        loop {
            if Self::gait_dir(&dir).is_dir() {
                return Self::open(dir);
            }
            if !dir.pop() {
                return Err(GaitError::NoRepo(
                    "no .gait directory found in any parent".to_string(),
                ));
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Direct access to the underlying object store, for callers (the CLI's
    /// `pin --last`) that need a DAG walk the façade doesn't expose.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn current_branch(&self) -> Result<String, GaitError> {
        self.refs.read_head()
    }

    /// Current head commit oid for `branch`, or `None` for an empty branch.
    pub fn branch_head(&self, branch: &str) -> Result<Option<String>, GaitError> {
        let oid = self.refs.read("heads", branch)?;
        Ok(if oid.is_empty() { None } else { Some(oid) })
    }

    pub fn head_commit_id(&self) -> Result<Option<String>, GaitError> {
        let branch = self.current_branch()?;
        self.branch_head(&branch)
    }

    pub fn get_commit(&self, oid: &str) -> Result<Commit, GaitError> {
        let oid = self.objects.resolve(oid)?;
        self.objects.get(oid.as_str())
    }

    pub fn get_turn(&self, oid: &str) -> Result<Turn, GaitError> {
        let oid = self.objects.resolve(oid)?;
        self.objects.get(oid.as_str())
    }

    fn memory_ref_oid(&self, branch: &str) -> Result<String, GaitError> {
        self.refs.read("memory", branch)
    }

    /// The oid `branch`'s memory ref currently points at.
    pub fn memory_ref(&self, branch: &str) -> Result<String, GaitError> {
        self.memory_ref_oid(branch)
    }

    pub fn get_memory(&self, branch: &str) -> Result<MemoryManifest, GaitError> {
        let oid = self.memory_ref_oid(branch)?;
        self.objects.get(&oid)
    }

    /// Record one conversation turn as a new commit on the current branch.
    pub fn record_turn(
        &self,
        turn: &Turn,
        message: &str,
    ) -> Result<(String, String), GaitError> {
        turn.validate()?;
        let branch = self.current_branch()?;

        let turn_oid = self.objects.put(turn)?;
        let parent = self.branch_head(&branch)?;

        let commit = Commit::v0(
            parent.into_iter().collect(),
            vec![turn_oid.to_string()],
            &branch,
            CommitKind::Auto,
            message,
            Default::default(),
        );
        let commit_oid = self.objects.put(&commit)?;
        self.refs.write("heads", &branch, commit_oid.as_str())?;

        tracing::info!(turn = %turn_oid, commit = %commit_oid, "recorded turn");
        Ok((turn_oid.to_string(), commit_oid.to_string()))
    }

    /// Create `name`, starting at `from_commit` (or the current branch head
    /// if `None`), optionally inheriting the source branch's pinned memory.
    pub fn create_branch(
        &self,
        name: &str,
        from_commit: Option<&str>,
        inherit_memory: bool,
    ) -> Result<(), GaitError> {
        if self.refs.exists("heads", name) {
            return Err(GaitError::AlreadyExists(format!("branch `{name}`")));
        }

        let current = self.current_branch()?;
        let start = match from_commit {
            Some(c) => self.objects.resolve(c)?.to_string(),
            None => self.branch_head(&current)?.unwrap_or_default(),
        };
        self.refs.write("heads", name, &start)?;

        let source_mem_oid = self.memory_ref_oid(&current).unwrap_or_default();
        let new_mem_oid = if inherit_memory && !source_mem_oid.is_empty() {
            source_mem_oid.clone()
        } else {
            let empty = MemoryManifest::empty(name);
            self.objects.put(&empty)?.to_string()
        };
        self.refs.write("memory", name, &new_mem_oid)?;

        let record = ReflogRecord::new("", &new_mem_oid, ReflogOp::Branch).with_note(format!(
            "branch `{name}` created from `{current}`{}",
            if inherit_memory { " (inherited memory)" } else { "" }
        ));
        self.refs.append_reflog(name, &record)?;

        tracing::info!(branch = %name, from = %current, "created branch");
        Ok(())
    }

    pub fn checkout(&self, name: &str) -> Result<(), GaitError> {
        if !self.refs.exists("heads", name) {
            return Err(GaitError::NotFound(format!("branch `{name}`")));
        }
        self.refs.write_head(name)?;
        tracing::info!(branch = %name, "checked out branch");
        Ok(())
    }

    /// Pin every turn reachable from `commit_id` (resolving a prefix first)
    /// that is not already present in the current branch's memory.
    pub fn pin_commit(&self, commit_id: &str, note: &str) -> Result<String, GaitError> {
        let commit_oid = self.objects.resolve(commit_id)?;
        let commit: Commit = self.objects.get(commit_oid.as_str())?;
        let branch = self.current_branch()?;
        let mut manifest = self.get_memory(&branch)?;

        let now = chrono::Utc::now();
        for turn_id in &commit.turn_ids {
            manifest.push_if_new(MemoryItem {
                turn_id: turn_id.clone(),
                commit_id: commit_oid.to_string(),
                note: note.to_string(),
                pinned_at: now,
            });
        }
        manifest.validate()?;

        let old_oid = self.memory_ref_oid(&branch)?;
        let new_oid = self.objects.put(&manifest)?;
        self.refs.write("memory", &branch, new_oid.as_str())?;
        self.refs.append_reflog(
            &branch,
            &ReflogRecord::new(old_oid, new_oid.to_string(), ReflogOp::Pin).with_note(note),
        )?;

        tracing::info!(commit = %commit_oid, memory = %new_oid, "pinned commit");
        Ok(new_oid.to_string())
    }

    /// Remove the 1-based `index`-th pinned item from the current branch's
    /// memory.
    pub fn unpin_index(&self, index: usize) -> Result<String, GaitError> {
        let branch = self.current_branch()?;
        let mut manifest = self.get_memory(&branch)?;
        let len = manifest.items.len();
        if index < 1 || index > len {
            return Err(GaitError::OutOfRange(index, len));
        }
        manifest.items.remove(index - 1);

        let old_oid = self.memory_ref_oid(&branch)?;
        let new_oid = self.objects.put(&manifest)?;
        self.refs.write("memory", &branch, new_oid.as_str())?;
        self.refs.append_reflog(
            &branch,
            &ReflogRecord::new(old_oid, new_oid.to_string(), ReflogOp::Unpin),
        )?;

        tracing::info!(index, memory = %new_oid, "unpinned item");
        Ok(new_oid.to_string())
    }

    /// Merge `source` into the current branch, optionally unioning pinned
    /// memory (target items first, then source items not already present).
    pub fn merge(
        &self,
        source: &str,
        message: &str,
        with_memory: bool,
    ) -> Result<String, GaitError> {
        let target = self.current_branch()?;
        let src_head = self
            .branch_head(source)?
            .ok_or_else(|| GaitError::EmptyBranch(source.to_string()))?;
        let tgt_head = self
            .branch_head(&target)?
            .ok_or_else(|| GaitError::EmptyBranch(target.clone()))?;

        if src_head == tgt_head {
            return Ok(tgt_head);
        }

        let mut meta = serde_json::Map::new();
        let mut memory_changed = None;

        if with_memory {
            let tgt_mem_oid = self.memory_ref_oid(&target)?;
            let src_mem_oid = self.memory_ref_oid(source)?;
            let tgt_manifest = self.get_memory(&target)?;
            let src_manifest = self.get_memory(source)?;

            let mut merged = MemoryManifest::empty(&target);
            for item in tgt_manifest.items {
                merged.push_if_new(item);
            }
            for item in src_manifest.items {
                merged.push_if_new(item);
            }
            let new_mem_oid = self.objects.put(&merged)?;

            meta.insert("memory_merged".to_string(), json!(true));
            meta.insert("memory_target_before".to_string(), json!(tgt_mem_oid));
            meta.insert("memory_source".to_string(), json!(src_mem_oid));
            meta.insert(
                "memory_target_after".to_string(),
                json!(new_mem_oid.to_string()),
            );
            memory_changed = Some(new_mem_oid.to_string());
        }

        let commit = Commit::v0(
            vec![tgt_head, src_head],
            vec![],
            &target,
            CommitKind::Merge,
            message,
            meta,
        );
        let commit_oid = self.objects.put(&commit)?;
        self.refs.write("heads", &target, commit_oid.as_str())?;

        if let Some(new_mem_oid) = memory_changed {
            let old_oid = self.memory_ref_oid(&target)?;
            self.refs.write("memory", &target, &new_mem_oid)?;
            self.refs.append_reflog(
                &target,
                &ReflogRecord::new(old_oid, new_mem_oid, ReflogOp::Merge),
            )?;
        }

        tracing::info!(source, target = %target, commit = %commit_oid, "merged branch");
        Ok(commit_oid.to_string())
    }

    /// Set the current branch's head to `target` (a commit oid or prefix)
    /// unconditionally, with no ancestry check.
    pub fn reset_branch(&self, target: &str) -> Result<String, GaitError> {
        let branch = self.current_branch()?;
        let resolved = self.objects.resolve(target)?;
        self.refs.write("heads", &branch, resolved.as_str())?;
        tracing::info!(branch = %branch, target = %resolved, "reset branch");
        Ok(resolved.to_string())
    }

    /// Reset the current branch to the first parent of its current head
    /// commit, or to an empty branch if that head has no parent.
    pub fn revert_to_parent(&self) -> Result<String, GaitError> {
        let branch = self.current_branch()?;
        let head = self
            .branch_head(&branch)?
            .ok_or_else(|| GaitError::EmptyBranch(branch.clone()))?;
        let commit: Commit = self.objects.get(&head)?;
        let target = commit.parents.first().cloned().unwrap_or_default();
        self.refs.write("heads", &branch, &target)?;
        tracing::info!(branch = %branch, target = %target, "reverted to parent");
        Ok(target)
    }

    /// Rewind `branch`'s memory ref to the most recent reflog entry whose
    /// manifest contains no commit unreachable from `head_commit` by
    /// first-parent traversal; falls back to the canonical empty manifest.
    pub fn rewind_memory_to_head(
        &self,
        branch: &str,
        head_commit: &str,
    ) -> Result<(String, String), GaitError> {
        let reachable: std::collections::HashSet<String> = if head_commit.is_empty() {
            std::collections::HashSet::new()
        } else {
            dag::walk_commits(&self.objects, head_commit, None)?
                .into_iter()
                .map(|(oid, _)| oid)
                .collect()
        };

        let log = self.refs.read_reflog(branch)?;
        let mut chosen = None;
        for record in log.iter().rev() {
            if record.new_oid.is_empty() {
                continue;
            }
            let manifest: MemoryManifest = match self.objects.get(&record.new_oid) {
                Ok(m) => m,
                Err(_) => continue,
            };
            let consistent = manifest
                .items
                .iter()
                .all(|item| reachable.contains(&item.commit_id));
            if consistent {
                chosen = Some(record.new_oid.clone());
                break;
            }
        }

        let old_oid = self.memory_ref_oid(branch)?;
        let new_oid = match chosen {
            Some(oid) => oid,
            None => {
                let empty = MemoryManifest::empty(branch);
                self.objects.put(&empty)?.to_string()
            }
        };

        self.refs.write("memory", branch, &new_oid)?;
        self.refs.append_reflog(
            branch,
            &ReflogRecord::new(old_oid.clone(), new_oid.clone(), ReflogOp::Rewind),
        )?;

        tracing::info!(branch, old = %old_oid, new = %new_oid, "rewound memory");
        Ok((old_oid, new_oid))
    }

    /// List first-parent commit history of the current branch, newest first.
    pub fn log(&self, limit: Option<usize>) -> Result<Vec<(String, Commit)>, GaitError> {
        let branch = self.current_branch()?;
        let head = self.branch_head(&branch)?.unwrap_or_default();
        dag::walk_commits(&self.objects, &head, limit)
    }

    pub fn build_context_bundle(&self, full: bool) -> Result<ContextBundle, GaitError> {
        let branch = self.current_branch()?;
        let mem_oid = self.memory_ref_oid(&branch)?;
        let manifest = self.get_memory(&branch)?;
        context::build_context_bundle(&self.objects, &branch, &mem_oid, &manifest, full)
    }

    pub fn budget_for_memory(&self) -> Result<MemoryBudget, GaitError> {
        let branch = self.current_branch()?;
        let manifest = self.get_memory(&branch)?;
        context::budget_for_memory(&self.objects, &branch, &manifest)
    }

    /// Recompute the content address of `oid`'s stored object and compare.
    pub fn verify_object(&self, oid: &str) -> Result<bool, GaitError> {
        let value: serde_json::Value = self.objects.get_value(oid)?;
        let recomputed = codec::object_id(&value)?;
        Ok(recomputed.as_str() == oid)
    }

    /// Resolve a (possibly short) oid prefix to a full [`Oid`].
    pub fn resolve(&self, prefix: &str) -> Result<Oid, GaitError> {
        self.objects.resolve(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Tokens, Visibility};

    fn turn(user: &str, assistant: &str) -> Turn {
        Turn::v0(
            user,
            assistant,
            Default::default(),
            Default::default(),
            Default::default(),
            Tokens::default(),
            Visibility::Private,
        )
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        GaitRepo::init(dir.path()).unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        assert_eq!(repo.current_branch().unwrap(), "main");
        assert!(repo.branch_head("main").unwrap().is_none());
    }

    #[test]
    fn discover_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        GaitRepo::init(dir.path()).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let repo = GaitRepo::discover(nested).unwrap();
        assert_eq!(repo.current_branch().unwrap(), "main");
    }

    #[test]
    fn discover_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GaitRepo::discover(dir.path()).unwrap_err(),
            GaitError::NoRepo(_)
        ));
    }

    #[test]
    fn record_turn_builds_first_commit_with_no_parent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (turn_id, commit_id) = repo.record_turn(&turn("hi", "hello"), "").unwrap();
        let commit = repo.get_commit(&commit_id).unwrap();
        assert!(commit.parents.is_empty());
        assert_eq!(commit.turn_ids, vec![turn_id]);
        assert_eq!(repo.head_commit_id().unwrap(), Some(commit_id));
    }

    #[test]
    fn record_turn_chains_parents() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        let (_, c2) = repo.record_turn(&turn("c", "d"), "").unwrap();
        let commit = repo.get_commit(&c2).unwrap();
        assert_eq!(commit.parents, vec![c1]);
    }

    #[test]
    fn branch_inherits_memory_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.pin_commit(&c1, "keep").unwrap();

        repo.create_branch("feature", None, true).unwrap();
        let mem = repo.get_memory("feature").unwrap();
        assert_eq!(mem.items.len(), 1);
    }

    #[test]
    fn branch_without_inherit_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.pin_commit(&c1, "keep").unwrap();

        repo.create_branch("feature", None, false).unwrap();
        let mem = repo.get_memory("feature").unwrap();
        assert_eq!(mem.items.len(), 0);
    }

    #[test]
    fn create_branch_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        repo.create_branch("feature", None, true).unwrap();
        assert!(matches!(
            repo.create_branch("feature", None, true).unwrap_err(),
            GaitError::AlreadyExists(_)
        ));
    }

    #[test]
    fn checkout_missing_branch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        assert!(matches!(
            repo.checkout("ghost").unwrap_err(),
            GaitError::NotFound(_)
        ));
    }

    #[test]
    fn pin_then_unpin_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.pin_commit(&c1, "note").unwrap();
        let mem = repo.get_memory("main").unwrap();
        assert_eq!(mem.items.len(), 1);

        repo.unpin_index(1).unwrap();
        let mem = repo.get_memory("main").unwrap();
        assert_eq!(mem.items.len(), 0);
    }

    #[test]
    fn unpin_out_of_range_errors() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        assert!(matches!(
            repo.unpin_index(1).unwrap_err(),
            GaitError::OutOfRange(1, 0)
        ));
    }

    #[test]
    fn merge_requires_non_empty_branches() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        repo.create_branch("feature", None, true).unwrap();
        assert!(matches!(
            repo.merge("feature", "", false).unwrap_err(),
            GaitError::EmptyBranch(_)
        ));
    }

    #[test]
    fn merge_builds_two_parent_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.create_branch("feature", None, true).unwrap();
        repo.checkout("feature").unwrap();
        repo.record_turn(&turn("c", "d"), "").unwrap();
        repo.checkout("main").unwrap();

        let commit_id = repo.merge("feature", "merge it", false).unwrap();
        let commit = repo.get_commit(&commit_id).unwrap();
        assert_eq!(commit.kind, CommitKind::Merge);
        assert_eq!(commit.parents.len(), 2);
        assert!(commit.turn_ids.is_empty());
    }

    #[test]
    fn merge_with_memory_unions_pinned_items() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.pin_commit(&c1, "on main").unwrap();

        repo.create_branch("feature", None, true).unwrap();
        repo.checkout("feature").unwrap();
        let (_, c2) = repo.record_turn(&turn("c", "d"), "").unwrap();
        repo.pin_commit(&c2, "on feature").unwrap();
        repo.checkout("main").unwrap();

        repo.merge("feature", "", true).unwrap();
        let mem = repo.get_memory("main").unwrap();
        assert_eq!(mem.items.len(), 2);
    }

    #[test]
    fn merge_same_head_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.create_branch("feature", None, true).unwrap();
        let result = repo.merge("feature", "", false).unwrap();
        assert_eq!(result, c1);
    }

    #[test]
    fn revert_to_parent_walks_back_one_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.record_turn(&turn("c", "d"), "").unwrap();
        let target = repo.revert_to_parent().unwrap();
        assert_eq!(target, c1);
        assert_eq!(repo.head_commit_id().unwrap(), Some(c1));
    }

    #[test]
    fn revert_to_parent_of_root_empties_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        repo.record_turn(&turn("a", "b"), "").unwrap();
        let target = repo.revert_to_parent().unwrap();
        assert_eq!(target, "");
        assert_eq!(repo.head_commit_id().unwrap(), None);
    }

    #[test]
    fn rewind_memory_falls_back_to_empty_when_nothing_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("a", "b"), "").unwrap();
        repo.pin_commit(&c1, "").unwrap();
        repo.revert_to_parent().unwrap();

        let (_, new_oid) = repo.rewind_memory_to_head("main", "").unwrap();
        let manifest: MemoryManifest = repo.objects.get(&new_oid).unwrap();
        assert!(manifest.items.is_empty());
    }

    #[test]
    fn context_bundle_matches_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("hi", "hello"), "").unwrap();
        repo.pin_commit(&c1, "first").unwrap();

        let bundle = repo.build_context_bundle(false).unwrap();
        assert_eq!(bundle.pinned_items, 1);
        assert_eq!(bundle.items[0].index, 1);
        assert_eq!(bundle.items[0].user_text, "hi");
    }

    #[test]
    fn budget_counts_unknown_token_fields() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GaitRepo::init(dir.path()).unwrap();
        let (_, c1) = repo.record_turn(&turn("hi", "hello"), "").unwrap();
        repo.pin_commit(&c1, "").unwrap();

        let budget = repo.budget_for_memory().unwrap();
        assert_eq!(budget.pinned_items, 1);
        assert_eq!(budget.unknown_token_fields, 1);
    }
}
