// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Import and store configuration.
//!
//! Import defaults match the WinCC CSV export:
//!
//! ```text
//! "VarName";"TimeString";"VarValue";"Validity";"Time_ms"
//! "PT270_Value";"25.07.2022 08:55:32";4,71;1;44767371,89
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum number of remembered time formats.
pub const MAX_RECENT_FORMATS: usize = 10;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// CSV import settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Field delimiter.
    pub delimiter: char,

    /// Decimal separator used in numeric cells.
    pub decimal: char,

    /// Time format (chrono strftime syntax).
    pub date_time_format: String,

    /// Recently used time formats, most recent first.
    pub recent_date_time_formats: Vec<String>,

    /// Column holding the tag name.
    pub tag_column: String,

    /// Column holding the timestamp.
    pub time_column: String,

    /// Column holding the value.
    pub value_column: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            delimiter: ';',
            decimal: ',',
            date_time_format: "%d.%m.%Y %H:%M:%S".to_string(),
            recent_date_time_formats: Vec::new(),
            tag_column: "VarName".to_string(),
            time_column: "TimeString".to_string(),
            value_column: "VarValue".to_string(),
        }
    }
}

impl ImportSettings {
    /// Create a new settings builder
    pub fn builder() -> ImportSettingsBuilder {
        ImportSettingsBuilder::default()
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Make `format` the active time format and push it to the front of the
    /// recent list.
    pub fn remember_format(&mut self, format: impl Into<String>) {
        let format = format.into();
        self.recent_date_time_formats.retain(|f| f != &format);
        self.recent_date_time_formats.insert(0, format.clone());
        self.recent_date_time_formats.truncate(MAX_RECENT_FORMATS);
        self.date_time_format = format;
    }
}

/// Builder for [`ImportSettings`]
#[derive(Debug, Default)]
pub struct ImportSettingsBuilder {
    delimiter: Option<char>,
    decimal: Option<char>,
    date_time_format: Option<String>,
    tag_column: Option<String>,
    time_column: Option<String>,
    value_column: Option<String>,
}

impl ImportSettingsBuilder {
    /// Set field delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set decimal separator
    pub fn decimal(mut self, decimal: char) -> Self {
        self.decimal = Some(decimal);
        self
    }

    /// Set time format (strftime syntax)
    pub fn date_time_format(mut self, format: impl Into<String>) -> Self {
        self.date_time_format = Some(format.into());
        self
    }

    /// Set tag column name
    pub fn tag_column(mut self, column: impl Into<String>) -> Self {
        self.tag_column = Some(column.into());
        self
    }

    /// Set time column name
    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    /// Set value column name
    pub fn value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = Some(column.into());
        self
    }

    /// Build the settings
    pub fn build(self) -> ImportSettings {
        let defaults = ImportSettings::default();

        ImportSettings {
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            decimal: self.decimal.unwrap_or(defaults.decimal),
            date_time_format: self
                .date_time_format
                .unwrap_or(defaults.date_time_format),
            recent_date_time_formats: defaults.recent_date_time_formats,
            tag_column: self.tag_column.unwrap_or(defaults.tag_column),
            time_column: self.time_column.unwrap_or(defaults.time_column),
            value_column: self.value_column.unwrap_or(defaults.value_column),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding dataset files and the index.
    pub root: PathBuf,

    /// Dataset file extension.
    pub extension: String,

    /// Index file name (relative to `root`).
    pub index_file: String,

    /// Prefix for names derived for unregistered projects.
    pub name_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            extension: "tsd".to_string(),
            index_file: "index.json".to_string(),
            name_prefix: "P".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }

    /// Path of the dataset file for `name`.
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, self.extension))
    }

    /// Dataset name used when an unknown project is first opened.
    pub fn derived_name(&self, project: u32) -> String {
        format!("{}{:03}", self.name_prefix, project)
    }
}

/// Builder for [`StoreConfig`]
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    root: Option<PathBuf>,
    extension: Option<String>,
    index_file: Option<String>,
    name_prefix: Option<String>,
}

impl StoreConfigBuilder {
    /// Set root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set dataset file extension
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Set index file name
    pub fn index_file(mut self, name: impl Into<String>) -> Self {
        self.index_file = Some(name.into());
        self
    }

    /// Set prefix for derived dataset names
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        let defaults = StoreConfig::default();

        StoreConfig {
            root: self.root.unwrap_or(defaults.root),
            extension: self.extension.unwrap_or(defaults.extension),
            index_file: self.index_file.unwrap_or(defaults.index_file),
            name_prefix: self.name_prefix.unwrap_or(defaults.name_prefix),
        }
    }
}
