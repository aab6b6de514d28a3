// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Project index: project number → dataset name.
//!
//! Persisted as a JSON list of `{ "project": u32, "name": String }` records.
//! A list (rather than a map) keeps legacy duplicate entries representable
//! so [`ProjectIndex::deduplicate`] can repair them.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One index record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub project: u32,
    pub name: String,
}

impl IndexEntry {
    pub fn new(project: u32, name: impl Into<String>) -> Self {
        Self {
            project,
            name: name.into(),
        }
    }
}

/// Project index, optionally backed by a JSON file.
///
/// Every mutation is written through to the file before returning.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    path: Option<PathBuf>,
    entries: Vec<IndexEntry>,
}

impl ProjectIndex {
    /// Index held only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the index at `path`. A missing file is an empty index.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries: Vec<IndexEntry> = match std::fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptStore {
                    project: None,
                    path: path.clone(),
                    reason: format!("invalid index: {e}"),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Persistence {
                    project: None,
                    path,
                    source,
                })
            }
        };

        let index = Self {
            path: Some(path),
            entries,
        };
        for (project, names) in index.duplicates() {
            warn!(project, ?names, "index has several entries for one project");
        }
        Ok(index)
    }

    /// In-memory index seeded with `entries` (duplicates allowed).
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self {
            path: None,
            entries,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Dataset name registered for `project` (the first entry wins).
    pub fn lookup(&self, project: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.project == project)
            .map(|e| e.name.as_str())
    }

    /// Projects with more than one entry, with their names in index order.
    pub fn duplicates(&self) -> BTreeMap<u32, Vec<String>> {
        let mut by_project: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for entry in &self.entries {
            by_project
                .entry(entry.project)
                .or_default()
                .push(entry.name.clone());
        }
        by_project.retain(|_, names| names.len() > 1);
        by_project
    }

    /// Bind `project` to `name`.
    ///
    /// Registering the same name again is a no-op; a different name for an
    /// already registered project is an [`StoreError::IndexConflict`].
    pub fn register(&mut self, project: u32, name: &str) -> Result<(), StoreError> {
        match self.lookup(project) {
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(StoreError::IndexConflict {
                project,
                existing: existing.to_string(),
                requested: name.to_string(),
            }),
            None => {
                validate_name(project, name)?;
                let mut entries = self.entries.clone();
                entries.push(IndexEntry::new(project, name));
                self.commit(entries)?;
                info!(project, name, "registered project");
                Ok(())
            }
        }
    }

    /// Bind `project` to `name`, replacing any existing entries.
    pub fn register_overwrite(&mut self, project: u32, name: &str) -> Result<(), StoreError> {
        validate_name(project, name)?;
        let mut entries: Vec<IndexEntry> = self
            .entries
            .iter()
            .filter(|e| e.project != project)
            .cloned()
            .collect();
        entries.push(IndexEntry::new(project, name));
        self.commit(entries)?;
        info!(project, name, "re-registered project");
        Ok(())
    }

    /// Remove every entry for `project`, returning what was removed.
    pub fn remove(&mut self, project: u32) -> Result<Vec<IndexEntry>, StoreError> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .cloned()
            .partition(|e| e.project == project);

        if removed.is_empty() {
            return Err(StoreError::UnknownProject(project));
        }
        self.commit(kept)?;
        info!(project, removed = removed.len(), "removed project from index");
        Ok(removed)
    }

    /// Drop stale duplicate entries.
    ///
    /// For each project with several entries, keep the earliest entry for
    /// which `exists` returns true (or the earliest entry if none does) and
    /// remove the others. Returns the removed entries.
    pub fn deduplicate<F>(&mut self, exists: F) -> Result<Vec<IndexEntry>, StoreError>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        let mut keep: BTreeMap<u32, usize> = BTreeMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            match keep.get(&entry.project) {
                None => {
                    keep.insert(entry.project, i);
                }
                Some(&kept) => {
                    if !exists(&self.entries[kept]) && exists(entry) {
                        keep.insert(entry.project, i);
                    }
                }
            }
        }

        let mut removed = Vec::new();
        let mut kept_entries = Vec::with_capacity(keep.len());
        for (i, entry) in self.entries.iter().enumerate() {
            if keep.get(&entry.project) == Some(&i) {
                kept_entries.push(entry.clone());
            } else {
                removed.push(entry.clone());
            }
        }

        if !removed.is_empty() {
            self.commit(kept_entries)?;
            for entry in &removed {
                warn!(project = entry.project, name = %entry.name, "removed stale index entry");
            }
        }
        Ok(removed)
    }

    /// Persist `entries`, then adopt them. On failure the index is unchanged.
    fn commit(&mut self, entries: Vec<IndexEntry>) -> Result<(), StoreError> {
        self.write_entries(&entries)?;
        self.entries = entries;
        Ok(())
    }

    /// Write the index atomically (no-op for an in-memory index).
    pub fn save(&self) -> Result<(), StoreError> {
        self.write_entries(&self.entries)
    }

    fn write_entries(&self, entries: &[IndexEntry]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let persistence = |source: std::io::Error| StoreError::Persistence {
            project: None,
            path: path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| persistence(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        write_atomic(path, &json).map_err(persistence)
    }
}

/// A dataset name becomes a file name under the store root: it must be a
/// single, non-empty path component.
fn validate_name(project: u32, name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if invalid {
        return Err(StoreError::InvalidName {
            project,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Write `bytes` to `path` via a temp file in the same directory, fsync and
/// rename. A crash leaves the previous file in place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
