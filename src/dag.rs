//! Iterative first-parent traversal of the commit DAG.
//!
//! Used by `log`, the revert-to-parent default, and "last commit with
//! turns" search. The object store forbids cycles by construction (oids are
//! a hash of content, so a commit can never name itself as an ancestor) but
//! the walker keeps a visited set anyway — defense in depth against a
//! corrupted or hand-edited ref file.

use crate::errors::GaitError;
use crate::objects::ObjectStore;
use crate::schema::Commit;

/// Iterator over first-parent ancestry, oid+commit per step, newest first.
pub struct FirstParentWalk<'a> {
    store: &'a ObjectStore,
    next: Option<String>,
    visited: std::collections::HashSet<String>,
}

impl<'a> FirstParentWalk<'a> {
    pub fn new(store: &'a ObjectStore, start: impl Into<String>) -> Self {
        let start = start.into();
        let next = if start.is_empty() { None } else { Some(start) };
        Self {
            store,
            next,
            visited: std::collections::HashSet::new(),
        }
    }
}

impl Iterator for FirstParentWalk<'_> {
    type Item = Result<(String, Commit), GaitError>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = self.next.take()?;
        if !self.visited.insert(oid.clone()) {
            return None;
        }
        let commit: Commit = match self.store.get(&oid) {
            Ok(c) => c,
            Err(e) => return Some(Err(e)),
        };
        self.next = commit.parents.first().cloned();
        Some(Ok((oid, commit)))
    }
}

/// Walk first-parent ancestry from `start`, yielding at most `limit` commits
/// (newest first). `limit = None` walks to the root.
pub fn walk_commits(
    store: &ObjectStore,
    start: &str,
    limit: Option<usize>,
) -> Result<Vec<(String, Commit)>, GaitError> {
    let walk = FirstParentWalk::new(store, start);
    let iter: Box<dyn Iterator<Item = Result<(String, Commit), GaitError>>> = match limit {
        Some(n) => Box::new(walk.take(n)),
        None => Box::new(walk),
    };
    iter.collect()
}

/// Walk first-parent ancestry from `start` and return the first commit whose
/// `turn_ids` is non-empty (skips merge commits, which never carry turns).
pub fn last_commit_with_turns(
    store: &ObjectStore,
    start: &str,
) -> Result<Option<(String, Commit)>, GaitError> {
    for step in FirstParentWalk::new(store, start) {
        let (oid, commit) = step?;
        if !commit.turn_ids.is_empty() {
            return Ok(Some((oid, commit)));
        }
    }
    Ok(None)
}
