//! Loading MIB definitions from disk.
//!
//! Two sources are supported: directories of per-MIB JSON files as produced
//! by the upstream MIB converter, and a single pre-built cache file written
//! by [`MibStore::write_cache_file`] (driven by the `mib-preprocess`
//! subcommand). Loading errors are fatal at startup, never per-request.

use crate::error::{TrapflowError, TrapflowResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;
use trapflow_types::MibEntry;

/// One record in a converter-produced JSON MIB file. The file is a map of
/// node name to record; only records carrying an `oid` are registered.
#[derive(Debug, Deserialize)]
struct RawMibRecord {
    oid: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    units: String,
}

/// Accumulates MIB entries from JSON files or a prebuilt cache.
#[derive(Debug, Default)]
pub struct MibStore {
    /// Collected entries keyed by OID.
    pub entries: HashMap<String, MibEntry>,
}

impl MibStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one converter-produced JSON MIB file.
    pub fn load_json_file(&mut self, path: &Path) -> TrapflowResult<()> {
        let file = File::open(path)
            .map_err(|e| TrapflowError::config(format!("open {}: {e}", path.display())))?;
        let records: HashMap<String, RawMibRecord> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| TrapflowError::config(format!("parse {}: {e}", path.display())))?;

        for record in records.into_values() {
            if let Some(oid) = record.oid {
                self.entries.insert(
                    oid,
                    MibEntry {
                        name: record.name,
                        description: record.description,
                        units: record.units,
                    },
                );
            }
        }
        Ok(())
    }

    /// Recursively load every file under `dir` as a JSON MIB file.
    pub fn load_json_dir(&mut self, dir: &Path) -> TrapflowResult<()> {
        if !dir.is_dir() {
            return Err(TrapflowError::config(format!(
                "path {} is not a directory",
                dir.display()
            )));
        }

        let listing = std::fs::read_dir(dir)
            .map_err(|e| TrapflowError::config(format!("read dir {}: {e}", dir.display())))?;
        for dirent in listing {
            let dirent = dirent
                .map_err(|e| TrapflowError::config(format!("read dir {}: {e}", dir.display())))?;
            let path = dirent.path();
            if path.is_dir() {
                self.load_json_dir(&path)?;
            } else {
                self.load_json_file(&path)?;
            }
        }
        debug!(dir = %dir.display(), entries = self.entries.len(), "Loaded MIB directory");
        Ok(())
    }

    /// Load entries from a cache file previously written by
    /// [`write_cache_file`](Self::write_cache_file).
    pub fn load_cache_file(&mut self, path: &Path) -> TrapflowResult<()> {
        let file = File::open(path)
            .map_err(|e| TrapflowError::config(format!("open cache {}: {e}", path.display())))?;
        let cached: HashMap<String, MibEntry> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| TrapflowError::config(format!("parse cache {}: {e}", path.display())))?;
        self.entries.extend(cached);
        Ok(())
    }

    /// Serialize the collected entries into a single cache file.
    pub fn write_cache_file(&self, path: &Path) -> TrapflowResult<()> {
        let file = File::create(path)
            .map_err(|e| TrapflowError::config(format!("create cache {}: {e}", path.display())))?;
        serde_json::to_writer(BufWriter::new(file), &self.entries)
            .map_err(|e| TrapflowError::config(format!("write cache {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "spidcom": {"oid": "1.3.6.1.4.1.22764", "name": "spidcom", "description": "root node"},
        "textual-convention": {"name": "NotRegistered"}
    }"#;

    #[test]
    fn test_load_json_file_skips_records_without_oid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SPIDCOM-MIB.json");
        File::create(&path).unwrap().write_all(SAMPLE.as_bytes()).unwrap();

        let mut store = MibStore::new();
        store.load_json_file(&path).unwrap();
        assert_eq!(store.entries.len(), 1);
        assert_eq!(store.entries["1.3.6.1.4.1.22764"].name, "spidcom");
    }

    #[test]
    fn test_load_json_dir_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("vendor");
        std::fs::create_dir(&sub).unwrap();
        File::create(sub.join("a.json")).unwrap().write_all(SAMPLE.as_bytes()).unwrap();

        let mut store = MibStore::new();
        store.load_json_dir(dir.path()).unwrap();
        assert_eq!(store.entries.len(), 1);
    }

    #[test]
    fn test_load_json_dir_rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        File::create(&path).unwrap().write_all(SAMPLE.as_bytes()).unwrap();

        let err = MibStore::new().load_json_dir(&path).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("mib.json");
        let cache = dir.path().join("mibs.cache");
        File::create(&json).unwrap().write_all(SAMPLE.as_bytes()).unwrap();

        let mut store = MibStore::new();
        store.load_json_file(&json).unwrap();
        store.write_cache_file(&cache).unwrap();

        let mut reloaded = MibStore::new();
        reloaded.load_cache_file(&cache).unwrap();
        assert_eq!(reloaded.entries, store.entries);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let mut store = MibStore::new();
        assert!(store.load_json_file(Path::new("assets/doesnotexist.json")).is_err());
        assert!(store.load_cache_file(Path::new("assets/doesnotexist.cache")).is_err());
    }
}
