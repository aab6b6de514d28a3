// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// File-backed store behaviour: persistence round-trips, idempotent imports,
// index maintenance and failure modes on damaged or unwritable state.

#![allow(clippy::float_cmp)]

use chrono::{NaiveDate, NaiveDateTime};
use tagstore::{
    query, DatasetBackend, ImportSettings, IndexEntry, ParseError, Sample, SeriesStore,
    StoreConfig, StoreError,
};

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid time")
}

fn config(root: &std::path::Path) -> StoreConfig {
    StoreConfig::builder().root(root).build()
}

const EXPORT: &str = "\"VarName\";\"TimeString\";\"VarValue\";\"Validity\";\"Time_ms\"\n\
    \"PT270_Value\";\"01.01.2024 00:00:00\";4,71;1;45292,0\n\
    \"PT270_Value\";\"01.01.2024 00:01:00\";4,80;1;45292,0\n\
    \"FT01\";\"01.01.2024 00:00:00\";12,5;1;45292,0\n\
    \"FT01\";\"garbage\";1,0;1;45292,0\n";

#[test]
fn merge_replaces_colliding_sample() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");

    let dataset = store.open(1).expect("open");
    let dataset = store
        .merge(
            &dataset,
            &[Sample::new("T1", at(0, 0), 1.0), Sample::new("T1", at(0, 1), 2.0)],
        )
        .expect("first merge");
    let dataset = store
        .merge(&dataset, &[Sample::new("T1", at(0, 0), 9.0)])
        .expect("second merge");

    assert_eq!(
        query::series_for(&dataset, "T1"),
        vec![
            query::Point::new(at(0, 0), 9.0),
            query::Point::new(at(0, 1), 2.0)
        ]
    );
}

#[test]
fn save_load_roundtrip_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let saved = {
        let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");
        let (dataset, report) = store
            .import(607, EXPORT, &ImportSettings::default())
            .expect("import");
        assert_eq!(report.dropped_time, 1);
        dataset
    };

    let store = SeriesStore::open_dir(config(dir.path())).expect("reopen");
    assert_eq!(store.projects(), &[IndexEntry::new(607, "P607")]);

    let loaded = store.load(607).expect("load");
    assert_eq!(loaded, saved);
    assert_eq!(loaded.len(), 3);
    assert!(dir.path().join("P607.tsd").is_file());
}

#[test]
fn repeated_import_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");

    let (first, _) = store
        .import(3, EXPORT, &ImportSettings::default())
        .expect("import");
    let bytes_first = std::fs::read(dir.path().join("P003.tsd")).expect("read");

    let (second, _) = store
        .import(3, EXPORT, &ImportSettings::default())
        .expect("import again");
    let bytes_second = std::fs::read(dir.path().join("P003.tsd")).expect("read");

    assert_eq!(first, second);
    assert_eq!(bytes_first, bytes_second);
}

#[test]
fn samples_stay_sorted_after_out_of_order_imports() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");

    let dataset = store.open(2).expect("open");
    let dataset = store
        .merge(&dataset, &[Sample::new("A", at(5, 0), 5.0)])
        .expect("merge");
    let dataset = store
        .merge(
            &dataset,
            &[Sample::new("B", at(1, 0), 1.0), Sample::new("A", at(3, 0), 3.0)],
        )
        .expect("merge");

    let reloaded = store.load(2).expect("load");
    assert_eq!(reloaded, dataset);
    assert!(reloaded
        .samples()
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn import_all_bad_timestamps_is_format_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");

    let raw = "VarName;TimeString;VarValue\nT1;??;1\n";
    let err = store
        .import(1, raw, &ImportSettings::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::Parse(ParseError::Format { .. })));
    assert!(!dir.path().join("P001.tsd").exists());
}

#[test]
fn corrupt_dataset_is_an_error_not_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");
        store
            .import(5, EXPORT, &ImportSettings::default())
            .expect("import");
    }

    let path = dir.path().join("P005.tsd");
    let mut bytes = std::fs::read(&path).expect("read");
    let mid = bytes.len() - 10;
    bytes[mid] ^= 0x55;
    std::fs::write(&path, bytes).expect("write");

    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");
    match store.open(5) {
        Err(StoreError::CorruptStore { project, path: p, .. }) => {
            assert_eq!(project, Some(5));
            assert_eq!(p, path);
        }
        other => panic!("expected corrupt store, got {other:?}"),
    }
}

#[test]
fn repeated_sample_in_file_is_corrupt() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");
        store.open(6).expect("register");
    }

    let doubled = [
        Sample::new("FT01", at(0, 0), 1.0),
        Sample::new("FT01", at(0, 0), 2.0),
    ];
    let path = dir.path().join("P006.tsd");
    std::fs::write(&path, tagstore::format::encode(6, &doubled).expect("encode")).expect("write");

    let store = SeriesStore::open_dir(config(dir.path())).expect("store");
    assert!(matches!(
        store.load(6),
        Err(StoreError::CorruptStore { project: Some(6), .. })
    ));
}

#[test]
fn corrupt_index_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.json"), "[{\"project\": \"x\"}]").expect("write");

    assert!(matches!(
        SeriesStore::open_dir(config(dir.path())),
        Err(StoreError::CorruptStore { project: None, .. })
    ));
}

#[test]
fn failed_persist_leaves_previous_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");

    let dataset = store.open_named(8, "P008").expect("open");
    let dataset = store
        .merge(&dataset, &[Sample::new("T1", at(0, 0), 1.0)])
        .expect("merge");

    // A directory where the dataset file should go makes the rename fail.
    let blocked = store.open_named(9, "blocked").expect("open");
    std::fs::create_dir(dir.path().join("blocked.tsd")).expect("mkdir");
    let err = store
        .merge(&blocked, &[Sample::new("T1", at(0, 0), 1.0)])
        .unwrap_err();
    assert!(matches!(err, StoreError::Persistence { project: Some(9), .. }));
    assert!(blocked.is_empty());

    assert_eq!(store.load(8).expect("load"), dataset);
}

#[test]
fn index_conflict_and_overwrite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");

    store.open_named(607, "Plant607").expect("open");
    assert!(matches!(
        store.open_named(607, "P607"),
        Err(StoreError::IndexConflict { .. })
    ));

    store.register_overwrite(607, "P607").expect("overwrite");
    let reopened = SeriesStore::open_dir(config(dir.path())).expect("reopen");
    assert_eq!(reopened.index().lookup(607), Some("P607"));
}

#[test]
fn deduplicate_legacy_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");
        let dataset = store.open_named(4, "live").expect("open");
        store
            .merge(&dataset, &[Sample::new("T1", at(0, 0), 1.0)])
            .expect("merge");
    }

    std::fs::write(
        dir.path().join("index.json"),
        r#"[
            {"project": 4, "name": "ghost"},
            {"project": 4, "name": "live"},
            {"project": 6, "name": "P006"}
        ]"#,
    )
    .expect("write legacy index");

    let mut store = SeriesStore::open_dir(config(dir.path())).expect("store");
    assert_eq!(store.index().duplicates().len(), 1);
    assert!(store.backend().exists("live"));

    let removed = store.deduplicate_index().expect("dedup");
    assert_eq!(removed, vec![IndexEntry::new(4, "ghost")]);

    let reopened = SeriesStore::open_dir(config(dir.path())).expect("reopen");
    assert_eq!(
        reopened.projects(),
        &[IndexEntry::new(4, "live"), IndexEntry::new(6, "P006")]
    );
    assert_eq!(reopened.load(4).expect("load").len(), 1);
}
