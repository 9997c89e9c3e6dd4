//! Mutable reference store: branch heads, memory heads, memory reflogs, and
//! the singleton HEAD pointer.
//!
//! Every ref is a plain text file under `<gait_dir>/...`. Reads strip
//! trailing whitespace; writes go through the same temp-file + rename
//! discipline as the object store so a reader never observes a torn value.
//! The memory reflog is the one multi-line ref: one canonical-JSON record
//! per line, oldest first, append-only.

use std::path::{Path, PathBuf};

use crate::codec;
use crate::errors::GaitError;
use crate::schema::ReflogRecord;

pub struct RefStore {
    gait_dir: PathBuf,
}

impl RefStore {
    pub fn new(gait_dir: impl Into<PathBuf>) -> Self {
        Self {
            gait_dir: gait_dir.into(),
        }
    }

    fn validate_name(name: &str) -> Result<(), GaitError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(GaitError::SchemaError(format!("invalid ref name `{name}`")));
        }
        Ok(())
    }

    fn path(&self, namespace: &str, name: &str) -> Result<PathBuf, GaitError> {
        Self::validate_name(name)?;
        Ok(self.gait_dir.join("refs").join(namespace).join(name))
    }

    fn head_path(&self) -> PathBuf {
        self.gait_dir.join("HEAD")
    }

    fn atomic_write(path: &Path, contents: &str) -> Result<(), GaitError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read a ref by namespace (`heads`, `memory`) and name. Returns
    /// `NotFound` if the ref file does not exist.
    pub fn read(&self, namespace: &str, name: &str) -> Result<String, GaitError> {
        let path = self.path(namespace, name)?;
        let contents = std::fs::read_to_string(&path)
            .map_err(|_| GaitError::NotFound(format!("ref {namespace}/{name}")))?;
        Ok(contents.trim_end().to_string())
    }

    pub fn write(&self, namespace: &str, name: &str, value: &str) -> Result<(), GaitError> {
        let path = self.path(namespace, name)?;
        Self::atomic_write(&path, value)
    }

    pub fn exists(&self, namespace: &str, name: &str) -> bool {
        self.path(namespace, name)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// Used only by test teardown, never by normal repository flow.
    pub fn delete(&self, namespace: &str, name: &str) -> Result<(), GaitError> {
        let path = self.path(namespace, name)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn read_head(&self) -> Result<String, GaitError> {
        let contents = std::fs::read_to_string(self.head_path())
            .map_err(|_| GaitError::NotFound("HEAD".to_string()))?;
        Ok(contents.trim_end().to_string())
    }

    pub fn write_head(&self, branch: &str) -> Result<(), GaitError> {
        Self::atomic_write(&self.head_path(), branch)
    }

    fn reflog_path(&self, branch: &str) -> Result<PathBuf, GaitError> {
        self.path("memory-reflog", branch)
    }

    /// Append one record to `branch`'s memory reflog. Append-only: existing
    /// lines are never rewritten.
    pub fn append_reflog(&self, branch: &str, record: &ReflogRecord) -> Result<(), GaitError> {
        let path = self.reflog_path(branch)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = String::from_utf8(codec::encode(record)?)
            .expect("canonical JSON encoding is always valid UTF-8");
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read `branch`'s memory reflog, oldest first.
    pub fn read_reflog(&self, branch: &str) -> Result<Vec<ReflogRecord>, GaitError> {
        let path = self.reflog_path(branch)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(GaitError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReflogOp;

    fn store() -> (tempfile::TempDir, RefStore) {
        let dir = tempfile::tempdir().unwrap();
        let rs = RefStore::new(dir.path().join(".gait"));
        (dir, rs)
    }

    #[test]
    fn write_then_read_branch_head() {
        let (_d, rs) = store();
        rs.write("heads", "main", "abc123").unwrap();
        assert_eq!(rs.read("heads", "main").unwrap(), "abc123");
    }

    #[test]
    fn missing_ref_is_not_found() {
        let (_d, rs) = store();
        assert!(matches!(
            rs.read("heads", "ghost").unwrap_err(),
            GaitError::NotFound(_)
        ));
    }

    #[test]
    fn head_round_trips() {
        let (_d, rs) = store();
        rs.write_head("main").unwrap();
        assert_eq!(rs.read_head().unwrap(), "main");
    }

    #[test]
    fn reflog_is_append_only_and_ordered() {
        let (_d, rs) = store();
        rs.append_reflog("main", &ReflogRecord::new("", "m1", ReflogOp::Pin)).unwrap();
        rs.append_reflog("main", &ReflogRecord::new("m1", "m2", ReflogOp::Pin)).unwrap();
        let log = rs.read_reflog("main").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].new_oid, "m1");
        assert_eq!(log[1].new_oid, "m2");
    }

    #[test]
    fn rejects_path_traversal_names() {
        let (_d, rs) = store();
        assert!(rs.write("heads", "../escape", "x").is_err());
    }
}
