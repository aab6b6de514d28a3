// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Series store
//!
//! [`SeriesStore`] owns the [`ProjectIndex`] and a [`DatasetBackend`] and is
//! the only place datasets are mutated.
//!
//! # Implementations
//!
//! - [`FileBackend`] -- one `.tsd` file per dataset under a root directory
//! - [`MemoryBackend`] -- in-process map (tests, embedding)

use crate::config::{ImportSettings, StoreConfig};
use crate::dataset::Dataset;
use crate::error::StoreError;
use crate::format::{self, DatasetFileError};
use crate::index::{write_atomic, IndexEntry, ProjectIndex};
use crate::parser::{self, ParseReport};
use crate::sample::Sample;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Storage backend for dataset contents.
pub trait DatasetBackend {
    /// Load the dataset stored under `name`, or `None` if nothing is stored.
    fn read(&self, project: u32, name: &str) -> Result<Option<Dataset>, StoreError>;

    /// Replace the stored dataset atomically.
    fn write(&mut self, dataset: &Dataset) -> Result<(), StoreError>;

    /// Whether a dataset is stored under `name`.
    fn exists(&self, name: &str) -> bool;

    /// Open the project index that belongs to this backend.
    fn open_index(&self) -> Result<ProjectIndex, StoreError>;
}

/// Binary dataset files under a root directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    config: StoreConfig,
}

impl FileBackend {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// File holding dataset `name`.
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.config.dataset_path(name)
    }
}

impl DatasetBackend for FileBackend {
    fn read(&self, project: u32, name: &str) -> Result<Option<Dataset>, StoreError> {
        let path = self.dataset_path(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Persistence {
                    project: Some(project),
                    path,
                    source,
                })
            }
        };

        let decoded = format::decode(&bytes).map_err(|e| StoreError::CorruptStore {
            project: Some(project),
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if decoded.header.project != project {
            return Err(StoreError::CorruptStore {
                project: Some(project),
                path,
                reason: format!(
                    "file belongs to project {}, not {project}",
                    decoded.header.project
                ),
            });
        }

        debug!(project, name, samples = decoded.samples.len(), "loaded dataset");
        Ok(Some(Dataset::from_sorted(
            project,
            name.to_string(),
            decoded.samples,
        )))
    }

    fn write(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        let path = self.dataset_path(dataset.name());
        let persistence = |source: std::io::Error| StoreError::Persistence {
            project: Some(dataset.project()),
            path: path.clone(),
            source,
        };

        let bytes = format::encode(dataset.project(), dataset.samples()).map_err(|e| match e {
            DatasetFileError::Io(source) => persistence(source),
            other => persistence(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                other.to_string(),
            )),
        })?;
        write_atomic(&path, &bytes).map_err(persistence)?;

        info!(
            project = dataset.project(),
            path = %path.display(),
            samples = dataset.len(),
            "saved dataset"
        );
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.dataset_path(name).is_file()
    }

    fn open_index(&self) -> Result<ProjectIndex, StoreError> {
        ProjectIndex::load(self.config.index_path())
    }
}

/// In-process backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    datasets: HashMap<String, Dataset>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetBackend for MemoryBackend {
    fn read(&self, project: u32, name: &str) -> Result<Option<Dataset>, StoreError> {
        match self.datasets.get(name) {
            Some(dataset) if dataset.project() != project => Err(StoreError::CorruptStore {
                project: Some(project),
                path: PathBuf::from(name),
                reason: format!("dataset belongs to project {}", dataset.project()),
            }),
            other => Ok(other.cloned()),
        }
    }

    fn write(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        self.datasets
            .insert(dataset.name().to_string(), dataset.clone());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    fn open_index(&self) -> Result<ProjectIndex, StoreError> {
        Ok(ProjectIndex::in_memory())
    }
}

/// Durable per-project datasets plus the project index.
pub struct SeriesStore<B: DatasetBackend> {
    backend: B,
    index: ProjectIndex,
    config: StoreConfig,
}

impl SeriesStore<FileBackend> {
    /// File-backed store rooted at `config.root`.
    pub fn open_dir(config: StoreConfig) -> Result<Self, StoreError> {
        Self::with_backend(FileBackend::new(config.clone()), config)
    }
}

impl SeriesStore<MemoryBackend> {
    /// Store that keeps everything in memory (for testing)
    pub fn new_in_memory() -> Self {
        Self {
            backend: MemoryBackend::new(),
            index: ProjectIndex::in_memory(),
            config: StoreConfig::default(),
        }
    }
}

impl<B: DatasetBackend> SeriesStore<B> {
    /// Store over an arbitrary backend; the index comes from the backend.
    pub fn with_backend(backend: B, config: StoreConfig) -> Result<Self, StoreError> {
        let index = backend.open_index()?;
        Ok(Self {
            backend,
            index,
            config,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Open the dataset for `project`, registering a derived name for an
    /// unknown project. Nothing stored yet yields an empty dataset.
    pub fn open(&mut self, project: u32) -> Result<Dataset, StoreError> {
        let name = match self.index.lookup(project) {
            Some(name) => name.to_string(),
            None => {
                let name = self.config.derived_name(project);
                self.index.register(project, &name)?;
                name
            }
        };
        self.load_named(project, &name)
    }

    /// Open `project` under an explicit dataset name.
    pub fn open_named(&mut self, project: u32, name: &str) -> Result<Dataset, StoreError> {
        self.index.register(project, name)?;
        self.load_named(project, name)
    }

    /// Load the dataset of a registered project.
    pub fn load(&self, project: u32) -> Result<Dataset, StoreError> {
        let name = self
            .index
            .lookup(project)
            .ok_or(StoreError::UnknownProject(project))?;
        self.load_named(project, name)
    }

    fn load_named(&self, project: u32, name: &str) -> Result<Dataset, StoreError> {
        Ok(self
            .backend
            .read(project, name)?
            .unwrap_or_else(|| Dataset::empty(project, name)))
    }

    /// Persist `dataset` as-is.
    pub fn save(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        self.index.register(dataset.project(), dataset.name())?;
        self.backend.write(dataset)
    }

    /// Merge `new_samples` into `dataset`, persist, and return the result.
    ///
    /// `dataset` itself is never modified; on error nothing is persisted.
    pub fn merge(
        &mut self,
        dataset: &Dataset,
        new_samples: &[Sample],
    ) -> Result<Dataset, StoreError> {
        let merged = dataset.merged(new_samples);
        self.save(&merged)?;

        info!(
            project = merged.project(),
            before = dataset.len(),
            incoming = new_samples.len(),
            after = merged.len(),
            "merged samples"
        );
        Ok(merged)
    }

    /// Parse `raw`, then open and merge into `project`.
    pub fn import(
        &mut self,
        project: u32,
        raw: &str,
        settings: &ImportSettings,
    ) -> Result<(Dataset, ParseReport), StoreError> {
        let (samples, report) = parser::parse_with_report(raw, settings)?;
        let dataset = self.open(project)?;
        let merged = self.merge(&dataset, &samples)?;
        Ok((merged, report))
    }

    /// Index entries in index order.
    pub fn projects(&self) -> &[IndexEntry] {
        self.index.entries()
    }

    /// Bind `project` to `name`, replacing existing entries.
    pub fn register_overwrite(&mut self, project: u32, name: &str) -> Result<(), StoreError> {
        self.index.register_overwrite(project, name)
    }

    /// Remove `project` from the index. Stored data is left in place.
    pub fn remove_project(&mut self, project: u32) -> Result<Vec<IndexEntry>, StoreError> {
        self.index.remove(project)
    }

    /// Remove stale duplicate index entries; see [`ProjectIndex::deduplicate`].
    pub fn deduplicate_index(&mut self) -> Result<Vec<IndexEntry>, StoreError> {
        let backend = &self.backend;
        self.index.deduplicate(|entry| backend.exists(&entry.name))
    }
}
