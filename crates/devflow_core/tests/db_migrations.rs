use devflow_core::config::StoreConfig;
use devflow_core::db::migrations::latest_version;
use devflow_core::db::{open_db, open_db_in_memory, DbError, Store};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "users",
        "tags",
        "questions",
        "question_tags",
        "answers",
        "votes",
        "collections",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devflow.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "votes");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_open_enables_wal_and_hands_out_migrated_connections() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        path: Some(dir.path().join("store.db")),
        ..StoreConfig::default()
    };

    let store = Store::open(&config).unwrap();
    let conn = store.connect().unwrap();
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
    assert_eq!(schema_version(&conn), latest_version());
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
    drop(conn);

    store.close().unwrap();
}

#[test]
fn store_open_requires_a_path() {
    let err = Store::open(&StoreConfig::default()).unwrap_err();
    assert!(matches!(err, DbError::InvalidConfig(_)));
}

#[test]
fn one_vote_per_voter_and_target_is_enforced_by_schema() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (id, name, image, created_at) VALUES ('u1', 'ada', NULL, 0);",
        [],
    )
    .unwrap();
    let insert = "INSERT INTO votes (id, voter_id, target_id, target_kind, vote_kind, created_at)
                  VALUES (?1, 'u1', 't1', 'question', 'upvote', 0);";
    conn.execute(insert, ["v1"]).unwrap();
    assert!(conn.execute(insert, ["v2"]).is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
