// Test suite for the snapshot reader and writer
// Covers round trips, all-or-nothing validation, pinned references and
// the three branching policies.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tempfile::TempDir;
use vertab_core::{
    BranchingPolicy, ColumnDef, ColumnType, CommitId, Reference, Table, TableSchema, Value,
    VtErrorKind,
};
use vertab_store::graph::{commits, refs};
use vertab_store::{read_table, write_table, Store, StoreLocation, WriteOptions, WriteStatus};

fn setup_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = StoreLocation::new(temp_dir.path().join("repo")).open().unwrap();
    (temp_dir, store)
}

fn scooters(rows: &[(i64, &str, &str)]) -> Table {
    let schema = TableSchema::new(
        vec![
            ColumnDef::required("pk", ColumnType::Int),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("gear", ColumnType::Text),
        ],
        vec!["pk".into()],
    )
    .unwrap();
    Table::from_rows(
        schema,
        rows.iter()
            .map(|(pk, n, g)| vec![Value::Int(*pk), (*n).into(), (*g).into()])
            .collect(),
    )
    .unwrap()
}

fn branch(store: &Store, name: &str) -> Reference {
    Reference::Branch {
        name: name.into(),
        head: refs::get_ref(store.conn(), name).unwrap().unwrap(),
    }
}

/// Branches forked with `prefix`, oldest first
fn forks(store: &Store, prefix: &str) -> Vec<(String, CommitId)> {
    let mut found: Vec<_> = refs::list_refs(store.conn())
        .unwrap()
        .into_iter()
        .filter(|(name, _)| name.starts_with(&format!("{}-", prefix)))
        .collect();
    found.sort();
    found
}

fn at(now_ms: i64) -> WriteOptions {
    WriteOptions {
        now_ms,
        ..WriteOptions::default()
    }
}

fn with_policy(policy: BranchingPolicy, checkout: &str, now_ms: i64) -> WriteOptions {
    WriteOptions {
        policy,
        checkout_branch: Some(checkout.into()),
        now_ms,
        ..WriteOptions::default()
    }
}

#[test]
fn test_round_trip_ignores_row_order() {
    let (_dir, mut store) = setup_store();
    let table = scooters(&[(1, "Jeffrey", "binoculars"), (0, "Razor", "knee-pads")]);

    let main = branch(&store, "main");
    let out = write_table(&mut store, &main, "scooters", &table, &at(1)).unwrap();
    assert_eq!(out.status, WriteStatus::Committed);

    let read = read_table(&store, &branch(&store, "main"), "scooters").unwrap();
    assert_eq!(read.table, table);
    assert_eq!(read.commit, out.commit);
    assert_eq!(read.table.row(0).unwrap()[0], Value::Int(0), "sorted by key");
}

#[test]
fn test_read_copy_is_disconnected() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    write_table(&mut store, &main, "scooters", &scooters(&[(0, "Razor", "knee-pads")]), &at(1))
        .unwrap();

    let mut copy = read_table(&store, &branch(&store, "main"), "scooters")
        .unwrap()
        .table;
    copy.push_row(vec![Value::Int(9), "Ghost".into(), "none".into()])
        .unwrap();

    let again = read_table(&store, &branch(&store, "main"), "scooters").unwrap();
    assert_eq!(again.table.num_rows(), 1);
}

#[test]
fn test_missing_table_and_reference() {
    let (_dir, store) = setup_store();

    let err = read_table(&store, &branch(&store, "main"), "scooters").unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::TableNotFound);

    let gone = Reference::Branch {
        name: "nope".into(),
        head: CommitId::new("0".repeat(64)),
    };
    let err = read_table(&store, &gone, "scooters").unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::ReferenceNotFound);
}

#[test]
fn test_duplicate_key_commits_nothing() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    let before = main.commit().clone();

    let bad = scooters(&[(0, "Razor", "knee-pads"), (0, "Jeffrey", "binoculars")]);
    let err = write_table(&mut store, &main, "scooters", &bad, &at(1)).unwrap_err();

    assert_eq!(err.kind(), VtErrorKind::ValidationError);
    assert_eq!(refs::get_ref(store.conn(), "main").unwrap(), Some(before));
}

#[test]
fn test_type_mismatch_rejected() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    let mut bad = scooters(&[(0, "Razor", "knee-pads")]);
    bad.push_row(vec![Value::Int(1), Value::Int(7), "bell".into()])
        .unwrap();

    let err = write_table(&mut store, &main, "scooters", &bad, &at(1)).unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::ValidationError);
}

#[test]
fn test_pinned_reference_is_immutable() {
    let (_dir, mut store) = setup_store();
    let pinned = Reference::Pinned {
        commit: branch(&store, "main").commit().clone(),
    };

    let err = write_table(
        &mut store,
        &pinned,
        "scooters",
        &scooters(&[(0, "Razor", "knee-pads")]),
        &at(1),
    )
    .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::ImmutableReference);
    assert_eq!(refs::list_refs(store.conn()).unwrap().len(), 1);
}

#[test]
fn test_expected_head_detects_stale_write() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    let stale = main.commit().clone();
    write_table(&mut store, &main, "scooters", &scooters(&[(0, "Razor", "knee-pads")]), &at(1))
        .unwrap();

    let opts = WriteOptions {
        expected_head: Some(stale),
        ..at(2)
    };
    let main = branch(&store, "main");
    let err = write_table(&mut store, &main, "scooters", &scooters(&[(1, "J", "b")]), &opts)
        .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::StaleWrite);
}

#[test]
fn test_checkout_no_merge_leaves_original() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    let root = main.commit().clone();

    let out = write_table(
        &mut store,
        &main,
        "scooters",
        &scooters(&[(0, "Razor", "knee-pads")]),
        &with_policy(BranchingPolicy::CheckoutNoMerge, "run-1", 1),
    )
    .unwrap();

    assert!(out.branch.starts_with("run-1-"), "{}", out.branch);
    assert_eq!(out.checkout_branch.as_deref(), Some(out.branch.as_str()));
    assert_eq!(refs::get_ref(store.conn(), "main").unwrap(), Some(root.clone()));
    assert_eq!(refs::get_ref(store.conn(), &out.branch).unwrap(), Some(out.commit.clone()));
    assert_eq!(commits::parents(store.conn(), &out.commit).unwrap(), vec![root]);
}

#[test]
fn test_checkout_and_merge_fast_forwards() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");

    let out = write_table(
        &mut store,
        &main,
        "scooters",
        &scooters(&[(0, "Razor", "knee-pads")]),
        &with_policy(BranchingPolicy::CheckoutAndMerge, "run-1", 1),
    )
    .unwrap();

    assert_eq!(out.status, WriteStatus::FastForwarded);
    assert_eq!(refs::get_ref(store.conn(), "main").unwrap(), Some(out.commit.clone()));
    let fork = out.checkout_branch.clone().unwrap();
    assert!(fork.starts_with("run-1-"), "{}", fork);
    assert_eq!(refs::get_ref(store.conn(), &fork).unwrap(), Some(out.commit));
}

#[test]
fn test_checkout_and_merge_combines_disjoint_changes() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    write_table(
        &mut store,
        &main,
        "scooters",
        &scooters(&[(0, "Razor", "knee-pads"), (1, "Jeffrey", "binoculars")]),
        &at(1),
    )
    .unwrap();

    // resolved before a concurrent writer moves main
    let resolved = branch(&store, "main");
    let concurrent = branch(&store, "main");
    write_table(
        &mut store,
        &concurrent,
        "scooters",
        &scooters(&[(0, "Razor", "helmet"), (1, "Jeffrey", "binoculars")]),
        &at(2),
    )
    .unwrap();

    let out = write_table(
        &mut store,
        &resolved,
        "scooters",
        &scooters(&[(0, "Razor", "knee-pads"), (1, "Jeffrey", "binoculars"), (2, "Kedro", "bell")]),
        &with_policy(BranchingPolicy::CheckoutAndMerge, "run-2", 3),
    )
    .unwrap();

    assert_eq!(out.status, WriteStatus::Merged);
    assert_eq!(commits::parents(store.conn(), &out.commit).unwrap().len(), 2);

    let merged = read_table(&store, &branch(&store, "main"), "scooters").unwrap();
    assert_eq!(
        merged.table,
        scooters(&[(0, "Razor", "helmet"), (1, "Jeffrey", "binoculars"), (2, "Kedro", "bell")])
    );
}

#[test]
fn test_merge_conflict_applies_nothing() {
    let (_dir, mut store) = setup_store();
    let main = branch(&store, "main");
    write_table(&mut store, &main, "scooters", &scooters(&[(0, "Razor", "knee-pads")]), &at(1))
        .unwrap();

    let resolved = branch(&store, "main");
    let concurrent = branch(&store, "main");
    write_table(&mut store, &concurrent, "scooters", &scooters(&[(0, "Razor", "helmet")]), &at(2))
        .unwrap();
    let main_before = refs::get_ref(store.conn(), "main").unwrap();

    let err = write_table(
        &mut store,
        &resolved,
        "scooters",
        &scooters(&[(0, "Razor", "bell")]),
        &with_policy(BranchingPolicy::CheckoutAndMerge, "run-3", 3),
    )
    .unwrap_err();

    assert_eq!(err.kind(), VtErrorKind::MergeConflict);
    assert_eq!(refs::get_ref(store.conn(), "main").unwrap(), main_before);

    let forked = forks(&store, "run-3");
    assert_eq!(forked.len(), 1);
    let fork = read_table(&store, &branch(&store, &forked[0].0), "scooters").unwrap();
    assert_eq!(fork.table, scooters(&[(0, "Razor", "bell")]));
}

#[test]
fn test_checkout_prefix_reused_across_saves() {
    let (_dir, mut store) = setup_store();

    for (run, gear) in ["knee-pads", "helmet", "bell"].into_iter().enumerate() {
        let main = branch(&store, "main");
        let out = write_table(
            &mut store,
            &main,
            "scooters",
            &scooters(&[(0, "Razor", gear)]),
            &with_policy(BranchingPolicy::CheckoutAndMerge, "nightly", run as i64 + 1),
        )
        .unwrap();
        assert_eq!(out.status, WriteStatus::FastForwarded);
    }
    assert_eq!(forks(&store, "nightly").len(), 3);

    for run in 0..2 {
        let main = branch(&store, "main");
        write_table(
            &mut store,
            &main,
            "scooters",
            &scooters(&[(run, "Jeffrey", "binoculars")]),
            &with_policy(BranchingPolicy::CheckoutNoMerge, "sandbox", 10 + run),
        )
        .unwrap();
    }
    assert_eq!(forks(&store, "sandbox").len(), 2);

    let read = read_table(&store, &branch(&store, "main"), "scooters").unwrap();
    assert_eq!(read.table, scooters(&[(0, "Razor", "bell")]));
}

#[test]
fn test_nan_cells_stored_as_null() {
    let (_dir, mut store) = setup_store();
    let schema = TableSchema::new(
        vec![
            ColumnDef::required("pk", ColumnType::Int),
            ColumnDef::new("x", ColumnType::Float),
        ],
        vec!["pk".into()],
    )
    .unwrap();
    let table = Table::from_rows(
        schema.clone(),
        vec![
            vec![Value::Int(0), Value::Float(f64::NAN)],
            vec![Value::Int(1), Value::Float(f64::INFINITY)],
            vec![Value::Int(2), Value::Float(f64::NEG_INFINITY)],
            vec![Value::Int(3), Value::Float(-0.5)],
        ],
    )
    .unwrap();

    let main = branch(&store, "main");
    write_table(&mut store, &main, "readings", &table, &at(1)).unwrap();

    let read = read_table(&store, &branch(&store, "main"), "readings").unwrap();
    let expected = Table::from_rows(
        schema,
        vec![
            vec![Value::Int(0), Value::Null],
            vec![Value::Int(1), Value::Float(f64::INFINITY)],
            vec![Value::Int(2), Value::Float(f64::NEG_INFINITY)],
            vec![Value::Int(3), Value::Float(-0.5)],
        ],
    )
    .unwrap();
    assert_eq!(read.table, expected);
}

#[test]
fn test_required_column_rejects_nan() {
    let (_dir, mut store) = setup_store();
    let schema = TableSchema::new(
        vec![
            ColumnDef::required("pk", ColumnType::Int),
            ColumnDef::required("x", ColumnType::Float),
        ],
        vec!["pk".into()],
    )
    .unwrap();
    let table =
        Table::from_rows(schema, vec![vec![Value::Int(0), Value::Float(f64::NAN)]]).unwrap();

    let main = branch(&store, "main");
    let before = main.commit().clone();
    let err = write_table(&mut store, &main, "readings", &table, &at(1)).unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::ValidationError);
    assert_eq!(refs::get_ref(store.conn(), "main").unwrap(), Some(before));
}

#[test]
fn test_first_open_from_many_threads() {
    let temp_dir = TempDir::new().unwrap();
    let location = StoreLocation::new(temp_dir.path().join("repo"));

    let errors: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let location = location.clone();
                scope.spawn(move || -> Result<(), vertab_core::VtError> {
                    let tablename = format!("scooters_{}", n);
                    let mut store = location.open()?;
                    let main = Reference::Branch {
                        name: "main".into(),
                        head: refs::get_ref(store.conn(), "main")?.unwrap(),
                    };
                    let opts = WriteOptions {
                        policy: BranchingPolicy::CheckoutAndMerge,
                        now_ms: n,
                        ..WriteOptions::default()
                    };
                    let table = scooters(&[(n, "Razor", "knee-pads")]);
                    write_table(&mut store, &main, &tablename, &table, &opts)?;
                    drop(store);

                    let store = location.open()?;
                    let main = Reference::Branch {
                        name: "main".into(),
                        head: refs::get_ref(store.conn(), "main")?.unwrap(),
                    };
                    assert_eq!(read_table(&store, &main, &tablename)?.table, table);
                    Ok(())
                })
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().unwrap().err())
            .map(|e| e.to_string())
            .collect()
    });

    assert!(errors.is_empty(), "{:?}", errors);
}
