// Connector tests
// Drive load/save through a catalog against temporary stores and check the
// resulting commits, references and journal entries.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use vertab_core::diff::TableChange;
use vertab_core::logging_facility::init_test_capture;
use vertab_core::{
    BranchingPolicy, ColumnDef, ColumnType, JournalEntry, JournalFilter, OpKind, SaveMode, Table,
    TableSchema, Value, VtErrorKind,
};
use vertab_core_types::schema::EVENT_JOURNAL_WARNING;
use vertab_core_types::SessionId;
use vertab_engine::{
    CatalogConfig, Connector, DatasetConfig, JournalConfig, ManualClock, SaveOptions,
};
use vertab_store::graph::refs;
use vertab_store::{StoreLocation, WriteStatus};

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

fn dataset(root: &Path) -> DatasetConfig {
    DatasetConfig::new(root.join("repo"), "scooters", vec!["pk".into()]).with_journal(
        JournalConfig {
            store_location: None,
            tablename: "kedro_meta".into(),
        },
    )
}

fn connector(config: DatasetConfig) -> Connector {
    Connector::new(CatalogConfig::new().with_dataset("scooters", config))
        .with_clock(Arc::new(ManualClock::starting_at_epoch_2024()))
}

fn journal(conn: &Connector) -> Vec<JournalEntry> {
    let mut entries: Vec<_> = conn
        .journal_entries("scooters", JournalFilter::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    entries.sort_by_key(|e| e.timestamp);
    entries
}

fn main_head(root: &Path) -> Option<vertab_core::CommitId> {
    let store = StoreLocation::new(root.join("repo")).open().unwrap();
    refs::get_ref(store.conn(), "main").unwrap()
}

#[test]
fn test_load_modify_save_scenario() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let setup = SessionId::from_string("setup");
    let run = SessionId::from_string("run-42");

    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &setup)
        .unwrap();

    let mut table = conn.load("scooters", &run).unwrap();
    assert_eq!(table.num_rows(), 1);
    table
        .append_record([
            ("pk", Value::Int(1)),
            ("name", "Jeffrey".into()),
            ("gear", "binoculars".into()),
        ])
        .unwrap();
    conn.save("scooters", &table, &run).unwrap();

    let reloaded = conn.load("scooters", &SessionId::from_string("check")).unwrap();
    assert_eq!(
        reloaded,
        scooters(&[(0, "Razor", "knee-pads"), (1, "Jeffrey", "binoculars")])
    );

    let ours: Vec<_> = journal(&conn)
        .into_iter()
        .filter(|e| e.session_id == run)
        .collect();
    assert_eq!(ours.len(), 2);
    assert_eq!(ours[0].kind, OpKind::Load);
    assert_eq!(ours[1].kind, OpKind::Save);
    assert!(ours[0].timestamp < ours[1].timestamp);
    assert_ne!(ours[0].commit, ours[1].commit);
    assert_eq!(ours[1].commit, main_head(dir.path()).unwrap());
}

#[test]
fn test_load_missing_table() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));

    let err = conn
        .load("scooters", &SessionId::from_string("s"))
        .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::TableNotFound);
    assert!(journal(&conn).is_empty(), "failed loads are not journaled");
}

#[test]
fn test_unknown_branch_is_reference_not_found() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()).with_branch("feature"));

    let err = conn
        .load("scooters", &SessionId::from_string("s"))
        .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::ReferenceNotFound);
}

#[test]
fn test_identical_load_is_journaled_once() {
    let dir = TempDir::new().unwrap();
    let config = dataset(dir.path());
    let session = SessionId::from_string("same");
    connector(config.clone())
        .save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();

    let frozen = Arc::new(ManualClock::new(
        chrono::DateTime::from_timestamp(1_800_000_000, 0).unwrap(),
        chrono::Duration::zero(),
    ));
    let conn = Connector::new(CatalogConfig::new().with_dataset("scooters", config))
        .with_clock(frozen);
    conn.load("scooters", &session).unwrap();
    conn.load("scooters", &session).unwrap();

    let loads: Vec<_> = journal(&conn)
        .into_iter()
        .filter(|e| e.kind == OpKind::Load)
        .collect();
    assert_eq!(loads.len(), 1);
}

#[test]
fn test_invalid_save_commits_nothing() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let session = SessionId::from_string("s");
    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();
    let before = main_head(dir.path());
    let journaled = journal(&conn).len();

    let dup = scooters(&[(3, "A", "x"), (3, "B", "y")]);
    let err = conn.save("scooters", &dup, &session).unwrap_err();

    assert_eq!(err.kind(), VtErrorKind::ValidationError);
    assert_eq!(main_head(dir.path()), before);
    assert_eq!(journal(&conn).len(), journaled);
}

#[test]
fn test_save_rekeys_to_configured_primary_key() {
    let dir = TempDir::new().unwrap();
    let config = DatasetConfig::new(dir.path().join("repo"), "scooters", vec!["name".into()]);
    let conn = connector(config);

    let err = conn
        .save(
            "scooters",
            &scooters(&[(0, "Razor", "knee-pads"), (1, "Razor", "helmet")]),
            &SessionId::from_string("s"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::ValidationError, "names collide");
}

#[test]
fn test_pinned_commit_rejects_save() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::from_string("s");
    let first = connector(dataset(dir.path()))
        .save_with(
            "scooters",
            &scooters(&[(0, "Razor", "knee-pads")]),
            &session,
            SaveOptions::default(),
        )
        .unwrap();

    let pinned = connector(dataset(dir.path()).with_commit(first.commit.short()));
    let table = pinned.load("scooters", &session).unwrap();
    assert_eq!(table.num_rows(), 1);

    let journaled = journal(&pinned).len();
    let err = pinned
        .save("scooters", &scooters(&[(1, "Jeffrey", "binoculars")]), &session)
        .unwrap_err();

    assert_eq!(err.kind(), VtErrorKind::ImmutableReference);
    assert_eq!(main_head(dir.path()), Some(first.commit));
    assert_eq!(journal(&pinned).len(), journaled);
}

#[test]
fn test_journal_is_complete_after_cycles() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let session = SessionId::from_string("cycle");
    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();

    for i in 1..=5 {
        let mut table = conn.load("scooters", &session).unwrap();
        table
            .push_row(vec![Value::Int(i), "Rider".into(), "bell".into()])
            .unwrap();
        conn.save("scooters", &table, &session).unwrap();
    }

    let entries = journal(&conn);
    let loads = entries.iter().filter(|e| e.kind == OpKind::Load).count();
    let saves = entries.iter().filter(|e| e.kind == OpKind::Save).count();
    assert_eq!((loads, saves), (5, 6));
    assert!(entries.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(conn.history("scooters", 100).unwrap().len(), 7, "six saves plus root");
}

#[test]
fn test_unchanged_save_creates_no_commit() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let session = SessionId::from_string("s");
    let table = scooters(&[(0, "Razor", "knee-pads")]);

    let first = conn
        .save_with("scooters", &table, &session, SaveOptions::default())
        .unwrap();
    let second = conn
        .save_with("scooters", &table, &session, SaveOptions::default())
        .unwrap();

    assert_eq!(second.status, WriteStatus::Unchanged);
    assert_eq!(second.commit, first.commit);
}

#[test]
fn test_checkout_no_merge_via_config() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::from_string("s");
    connector(dataset(dir.path()))
        .save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();
    let before = main_head(dir.path());

    let conn = connector(
        dataset(dir.path())
            .with_policy(BranchingPolicy::CheckoutNoMerge)
            .with_checkout_branch("experiment"),
    );
    let report = conn
        .save_with(
            "scooters",
            &scooters(&[(0, "Razor", "helmet")]),
            &session,
            SaveOptions::default(),
        )
        .unwrap();

    assert!(report.branch.starts_with("experiment-"), "{}", report.branch);
    assert_eq!(main_head(dir.path()), before);
    assert_eq!(
        conn.load("scooters", &session).unwrap(),
        scooters(&[(0, "Razor", "knee-pads")])
    );

    let fork = connector(dataset(dir.path()).with_branch(report.branch));
    assert_eq!(
        fork.load("scooters", &session).unwrap(),
        scooters(&[(0, "Razor", "helmet")])
    );
}

#[test]
fn test_checkout_and_merge_generates_branch_name() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()).with_policy(BranchingPolicy::CheckoutAndMerge));
    let report = conn
        .save_with(
            "scooters",
            &scooters(&[(0, "Razor", "knee-pads")]),
            &SessionId::from_string("s"),
            SaveOptions::default(),
        )
        .unwrap();

    assert_eq!(report.status, WriteStatus::FastForwarded);
    assert_eq!(report.branch, "main");
    let fork = report.checkout_branch.unwrap();
    assert!(fork.starts_with("main-checkout-"), "{fork}");
    assert_eq!(main_head(dir.path()), Some(report.commit));
}

#[test]
fn test_configured_checkout_branch_survives_repeated_saves() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::from_string("nightly-run");
    let conn = connector(
        dataset(dir.path())
            .with_policy(BranchingPolicy::CheckoutAndMerge)
            .with_checkout_branch("nightly"),
    );

    let mut forks = Vec::new();
    for gear in ["knee-pads", "helmet"] {
        let report = conn
            .save_with(
                "scooters",
                &scooters(&[(0, "Razor", gear)]),
                &session,
                SaveOptions::default(),
            )
            .unwrap();
        assert_eq!(report.status, WriteStatus::FastForwarded);
        assert_eq!(report.branch, "main");
        forks.push(report.checkout_branch.unwrap());
    }

    assert!(forks.iter().all(|f| f.starts_with("nightly-")), "{forks:?}");
    assert_ne!(forks[0], forks[1]);
    assert_eq!(
        conn.load("scooters", &session).unwrap(),
        scooters(&[(0, "Razor", "helmet")])
    );
}

#[test]
fn test_nan_cells_load_as_null() {
    let dir = TempDir::new().unwrap();
    let config = DatasetConfig::new(dir.path().join("repo"), "readings", vec!["pk".into()]);
    let conn = Connector::new(CatalogConfig::new().with_dataset("readings", config))
        .with_clock(Arc::new(ManualClock::starting_at_epoch_2024()));
    let session = SessionId::from_string("s");
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
        ],
    )
    .unwrap();

    conn.save("readings", &table, &session).unwrap();

    let loaded = conn.load("readings", &session).unwrap();
    let expected = Table::from_rows(
        schema,
        vec![
            vec![Value::Int(0), Value::Null],
            vec![Value::Int(1), Value::Float(f64::INFINITY)],
        ],
    )
    .unwrap();
    assert_eq!(loaded, expected);
}

#[test]
fn test_concurrent_first_use_of_a_store() {
    let dir = TempDir::new().unwrap();
    let mut catalog = CatalogConfig::new();
    for n in 0..8 {
        let config = DatasetConfig::new(
            dir.path().join("repo"),
            format!("scooters_{}", n),
            vec!["pk".into()],
        )
        .with_policy(BranchingPolicy::CheckoutAndMerge);
        catalog = catalog.with_dataset(format!("scooters_{}", n), config);
    }
    let conn = Connector::new(catalog).with_clock(Arc::new(ManualClock::starting_at_epoch_2024()));

    let failures: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8i64)
            .map(|n| {
                let conn = &conn;
                scope.spawn(move || {
                    let name = format!("scooters_{}", n);
                    let session = SessionId::from_string(format!("worker-{}", n));
                    let table = scooters(&[(n, "Razor", "knee-pads")]);
                    conn.save(&name, &table, &session)?;
                    let loaded = conn.load(&name, &session)?;
                    assert_eq!(loaded, table);
                    Ok::<_, vertab_core::VtError>(())
                })
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().unwrap().err())
            .map(|e| e.to_string())
            .collect()
    });

    assert!(failures.is_empty(), "{failures:?}");
}

#[test]
fn test_update_mode_upserts() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::from_string("s");
    connector(dataset(dir.path()))
        .save(
            "scooters",
            &scooters(&[(0, "Razor", "knee-pads"), (1, "Jeffrey", "binoculars")]),
            &session,
        )
        .unwrap();

    let conn = connector(dataset(dir.path()).with_save_mode(SaveMode::Update));
    conn.save(
        "scooters",
        &scooters(&[(1, "Jeffrey", "helmet"), (2, "Kedro", "bell")]),
        &session,
    )
    .unwrap();

    assert_eq!(
        conn.load("scooters", &session).unwrap(),
        scooters(&[
            (0, "Razor", "knee-pads"),
            (1, "Jeffrey", "helmet"),
            (2, "Kedro", "bell")
        ])
    );
}

#[test]
fn test_expected_head_detects_concurrent_save() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let a = SessionId::from_string("a");
    let b = SessionId::from_string("b");
    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &a)
        .unwrap();

    let loaded = conn.load_with_report("scooters", &a).unwrap();
    conn.save("scooters", &scooters(&[(0, "Razor", "helmet")]), &b)
        .unwrap();

    let err = conn
        .save_with(
            "scooters",
            &loaded.table,
            &a,
            SaveOptions {
                expected_head: Some(loaded.commit),
                message: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::StaleWrite);
}

#[test]
fn test_journal_failure_is_a_warning() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"occupied").unwrap();

    let config = DatasetConfig::new(dir.path().join("repo"), "scooters", vec!["pk".into()])
        .with_journal(JournalConfig {
            store_location: Some(StoreLocation::new(&blocker)),
            tablename: "kedro_meta".into(),
        });
    let conn = connector(config);

    let report = conn
        .save_with(
            "scooters",
            &scooters(&[(0, "Razor", "warn-check")]),
            &SessionId::from_string("journal-down"),
            SaveOptions::default(),
        )
        .unwrap();

    let warning = report.journal_warning.expect("journal warning");
    assert_eq!(warning.kind(), VtErrorKind::JournalAppendFailed);
    assert_eq!(main_head(dir.path()), Some(report.commit.clone()));

    let warnings: Vec<_> = capture
        .events_with("commit", report.commit.as_str())
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_JOURNAL_WARNING))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("err_code"), Some("ERR_JOURNAL_APPEND_FAILED"));
}

#[test]
fn test_exists() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    assert!(!conn.exists("scooters").unwrap(), "no store yet");

    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &SessionId::new())
        .unwrap();
    assert!(conn.exists("scooters").unwrap());
}

#[test]
fn test_diff_between_journal_entries() {
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let session = SessionId::from_string("d");
    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();
    conn.save(
        "scooters",
        &scooters(&[(0, "Razor", "helmet"), (1, "Jeffrey", "binoculars")]),
        &session,
    )
    .unwrap();

    let saves: Vec<_> = journal(&conn)
        .into_iter()
        .filter(|e| e.kind == OpKind::Save)
        .collect();
    let diff = conn
        .diff_journal("scooters", &saves[1], &saves[0])
        .unwrap();

    assert_eq!(diff.from, saves[0].commit);
    let table = diff.table("scooters").unwrap();
    assert_eq!(table.status, TableChange::Modified);
    assert_eq!(table.rows_added, 1);
    assert_eq!(table.rows_modified, 1);
}

#[test]
fn test_catalog_from_toml() {
    let dir = TempDir::new().unwrap();
    let text = format!(
        r#"
[scooters]
store_location = "{}"
tablename = "scooters"
primary_key_columns = ["pk"]
branching_policy = "append_to_branch"

[scooters.journal]
tablename = "kedro_meta"
"#,
        dir.path().join("repo").display()
    );
    let catalog = CatalogConfig::from_toml_str(&text).unwrap();
    let conn = Connector::new(catalog);
    let session = SessionId::from_string("toml");

    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();
    assert_eq!(conn.load("scooters", &session).unwrap().num_rows(), 1);
}

#[test]
fn test_remote_uri_not_implemented() {
    let dir = TempDir::new().unwrap();
    let mut config = dataset(dir.path());
    config.uri = Some("https://example.invalid/repo".into());
    let conn = connector(config);

    let err = conn
        .load("scooters", &SessionId::from_string("s"))
        .unwrap_err();
    assert_eq!(err.kind(), VtErrorKind::NotImplemented);
}

#[test]
fn test_load_and_save_are_logged() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let conn = connector(dataset(dir.path()));
    let session = SessionId::from_string("logged-run-7");

    conn.save("scooters", &scooters(&[(0, "Razor", "knee-pads")]), &session)
        .unwrap();
    let head = main_head(dir.path()).unwrap();
    conn.load("scooters", &session).unwrap();

    let ours = capture.events_with("session_id", "logged-run-7");
    for op in ["save", "load"] {
        let end = ours
            .iter()
            .find(|e| e.op.as_deref() == Some(op) && e.event.as_deref() == Some("end"))
            .expect("end event");
        assert_eq!(end.field("table"), Some("scooters"));
        assert_eq!(end.field("commit"), Some(head.as_str()));
    }
    assert!(ours
        .iter()
        .any(|e| e.op.as_deref() == Some("load") && e.event.as_deref() == Some("start")));
}
