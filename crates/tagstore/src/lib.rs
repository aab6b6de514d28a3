// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagstore
//!
//! Incremental, deduplicating storage for multi-tag industrial time series
//! (PLC / SCADA log exports, polled holding registers).
//!
//! # Features
//!
//! - **Parser** -- configurable delimited-text import (WinCC defaults)
//! - **Idempotent merge** -- `(tag, timestamp)` dedup, newest import wins
//! - **Atomic persistence** -- checksummed `.tsd` files, temp file + rename
//! - **Project index** -- project number → dataset name, JSON, repairable
//! - **Query views** -- per-tag series, inclusive windows, equality joins
//!
//! # Architecture
//!
//! ```text
//! raw text --parser--> Vec<Sample> --SeriesStore::merge--> Dataset (.tsd)
//!                                                             |
//!                                                         query views
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tagstore::{ImportSettings, SeriesStore, StoreConfig};
//!
//! let mut store = SeriesStore::open_dir(StoreConfig::builder().root("data").build())?;
//! let raw = std::fs::read_to_string("export.csv")?;
//! let (dataset, report) = store.import(607, &raw, &ImportSettings::default())?;
//! println!("{} samples, {} rows dropped", dataset.len(), report.dropped());
//! ```

pub mod acquisition;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod format;
pub mod index;
pub mod parser;
pub mod query;
pub mod sample;
pub mod store;

pub use acquisition::{RegisterMap, RegisterTag};
pub use config::{ConfigError, ImportSettings, StoreConfig};
pub use dataset::Dataset;
pub use error::{ParseError, StoreError};
pub use index::{IndexEntry, ProjectIndex};
pub use parser::{parse, parse_with_report, ParseReport};
pub use query::{join_sum, sample_interval, series_for, tags, window, windowed, Point, TimeWindow};
pub use sample::Sample;
pub use store::{DatasetBackend, FileBackend, MemoryBackend, SeriesStore};
