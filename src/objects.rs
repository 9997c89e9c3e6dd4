//! Write-once, content-addressed object store.
//!
//! Objects live under `<root>/<xx>/<rest>`, fanned out on the first byte of
//! the oid (mirroring the loose-object layout familiar from content-
//! addressed VCS stores). Writes are encode -> compute oid -> write-if-
//! absent via temp-file + rename, so concurrent writers of identical
//! content never race on a partial file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec;
use crate::errors::GaitError;
use crate::hash::{MIN_PREFIX_LEN, Oid};

pub struct ObjectStore {
    root: PathBuf,
    fanout_width: usize,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fanout_width(root, 2)
    }

    /// Same as [`Self::new`], but with a non-default fan-out directory
    /// width (see [`crate::config::RepoConfig::fanout_hex_width`]).
    pub fn with_fanout_width(root: impl Into<PathBuf>, fanout_width: usize) -> Self {
        Self {
            root: root.into(),
            fanout_width,
        }
    }

    fn object_path(&self, oid: &str) -> PathBuf {
        let (fanout, rest) = oid.split_at(self.fanout_width);
        self.root.join(fanout).join(rest)
    }

    /// Store `value`, returning its content address. Idempotent: storing
    /// the same canonical content twice is a no-op on the second call.
    pub fn put<T: Serialize>(&self, value: &T) -> Result<Oid, GaitError> {
        let bytes = codec::encode(value)?;
        let oid = Oid::of_bytes(&bytes);
        self.write_if_absent(oid.as_str(), &bytes)?;
        Ok(oid)
    }

    fn write_if_absent(&self, oid: &str, bytes: &[u8]) -> Result<(), GaitError> {
        let path = self.object_path(oid);
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Load and deserialize the object at `oid`, without verifying its hash.
    pub fn get<T: DeserializeOwned>(&self, oid: &str) -> Result<T, GaitError> {
        let path = self.object_path(oid);
        let bytes = std::fs::read(&path)
            .map_err(|_| GaitError::NotFound(format!("object {oid}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GaitError::Corrupt(oid.to_string(), e.to_string()))
    }

    /// Load the object at `oid` as a raw JSON value.
    pub fn get_value(&self, oid: &str) -> Result<Value, GaitError> {
        self.get(oid)
    }

    /// Like [`Self::get`], but also recomputes the content address from the
    /// canonical re-encoding and rejects a mismatch as [`GaitError::Corrupt`].
    pub fn get_verified<T: Serialize + DeserializeOwned>(
        &self,
        oid: &str,
    ) -> Result<T, GaitError> {
        let value: T = self.get(oid)?;
        let recomputed = codec::object_id(&value)?;
        if recomputed.as_str() != oid {
            return Err(GaitError::Corrupt(
                oid.to_string(),
                format!("recomputed id {recomputed} does not match"),
            ));
        }
        Ok(value)
    }

    /// Resolve a (possibly short) hex prefix to a full oid. Always confirms
    /// the object actually exists in the store, even for a full-length oid.
    pub fn resolve(&self, prefix: &str) -> Result<Oid, GaitError> {
        if prefix.len() >= crate::hash::OID_HEX_LEN {
            let oid = Oid::from_str_checked(prefix)?;
            if !self.object_path(oid.as_str()).exists() {
                return Err(GaitError::NotFound(format!("oid `{oid}`")));
            }
            return Ok(oid);
        }
        if prefix.len() < MIN_PREFIX_LEN {
            return Err(GaitError::NotFound(format!(
                "oid prefix `{prefix}` shorter than minimum {MIN_PREFIX_LEN} chars"
            )));
        }
        let fanout_dir = if prefix.len() >= self.fanout_width {
            self.root.join(&prefix[..self.fanout_width])
        } else {
            self.root.clone()
        };
        let mut matches = Vec::new();
        self.scan_fanout(&fanout_dir, prefix, &mut matches)?;
        match matches.len() {
            0 => Err(GaitError::NotFound(format!("oid prefix `{prefix}`"))),
            1 => Ok(matches.remove(0)),
            _ => Err(GaitError::Ambiguous(prefix.to_string())),
        }
    }

    fn scan_fanout(
        &self,
        fanout_dir: &Path,
        prefix: &str,
        matches: &mut Vec<Oid>,
    ) -> Result<(), GaitError> {
        if fanout_dir == self.root {
            // Prefix shorter than the fanout width: scan every bucket.
            if !self.root.exists() {
                return Ok(());
            }
            for entry in std::fs::read_dir(&self.root)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    self.scan_bucket(&entry.path(), prefix, matches)?;
                }
            }
            return Ok(());
        }
        if !fanout_dir.exists() {
            return Ok(());
        }
        self.scan_bucket(fanout_dir, prefix, matches)
    }

    fn scan_bucket(
        &self,
        bucket: &Path,
        prefix: &str,
        matches: &mut Vec<Oid>,
    ) -> Result<(), GaitError> {
        let fanout = bucket
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        for entry in std::fs::read_dir(bucket)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".tmp") {
                continue;
            }
            let full = format!("{fanout}{name}");
            if full.starts_with(prefix) {
                if let Ok(oid) = full.parse::<Oid>() {
                    matches.push(oid);
                }
            }
        }
        Ok(())
    }

    /// Remove any `*.tmp` files left behind by an aborted write.
    pub fn sweep_tmp(&self) -> Result<(), GaitError> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            for inner in std::fs::read_dir(entry.path())? {
                let inner = inner?;
                if inner.path().extension().map(|e| e == "tmp").unwrap_or(false) {
                    std::fs::remove_file(inner.path())?;
                }
            }
        }
        Ok(())
    }
}

impl Oid {
    fn from_str_checked(s: &str) -> Result<Oid, GaitError> {
        s.parse::<Oid>()
            .map_err(|e| GaitError::NotFound(format!("invalid oid `{s}`: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let value = json!({"schema": "x", "n": 1});
        let oid = store.put(&value).unwrap();
        let loaded: Value = store.get(oid.as_str()).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn custom_fanout_width_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::with_fanout_width(dir.path(), 3);
        let value = json!({"a": 1});
        let oid = store.put(&value).unwrap();
        let (fanout, rest) = oid.as_str().split_at(3);
        assert!(dir.path().join(fanout).join(rest).exists());
        let loaded: Value = store.get(oid.as_str()).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn put_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let value = json!({"a": 1});
        let oid1 = store.put(&value).unwrap();
        let oid2 = store.put(&value).unwrap();
        assert_eq!(oid1, oid2);
    }

    #[test]
    fn get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let err = store.get::<Value>("0".repeat(64).as_str()).unwrap_err();
        assert!(matches!(err, GaitError::NotFound(_)));
    }

    #[test]
    fn resolve_rejects_well_formed_but_unstored_full_oid() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let never_stored = "0".repeat(64);
        assert!(matches!(
            store.resolve(&never_stored).unwrap_err(),
            GaitError::NotFound(_)
        ));
    }

    #[test]
    fn resolve_accepts_full_oid_that_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let oid = store.put(&json!({"a": 1})).unwrap();
        let resolved = store.resolve(oid.as_str()).unwrap();
        assert_eq!(resolved, oid);
    }

    #[test]
    fn resolve_by_unique_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let oid = store.put(&json!({"a": 1})).unwrap();
        let prefix = &oid.as_str()[..8];
        let resolved = store.resolve(prefix).unwrap();
        assert_eq!(resolved, oid);
    }

    #[test]
    fn resolve_rejects_short_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        store.put(&json!({"a": 1})).unwrap();
        assert!(store.resolve("ab").is_err());
    }

    #[test]
    fn resolve_ambiguous_prefix_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let oid1 = store.put(&json!({"a": 1})).unwrap();
        let oid2 = store.put(&json!({"a": 2})).unwrap();
        // Find a shared prefix length that both oids agree on, long enough
        // to be accepted but short enough to be ambiguous, else skip.
        let s1 = oid1.as_str();
        let s2 = oid2.as_str();
        let common: String = s1
            .chars()
            .zip(s2.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect();
        if common.len() >= MIN_PREFIX_LEN {
            assert!(matches!(
                store.resolve(&common).unwrap_err(),
                GaitError::Ambiguous(_)
            ));
        }
    }

    #[test]
    fn get_verified_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let oid = store.put(&json!({"a": 1})).unwrap();
        // Corrupt the stored bytes in place.
        let path = store.object_path(oid.as_str());
        std::fs::write(&path, br#"{"a":2}"#).unwrap();
        let err = store.get_verified::<Value>(oid.as_str()).unwrap_err();
        assert!(matches!(err, GaitError::Corrupt(_, _)));
    }
}
