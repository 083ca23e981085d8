use super::*;
use crate::ledger::{init_ledger_table, record_applied, TrialRead};
use mg_db::{DuckDbBackend, SqliteBackend};
use std::fs;
use tempfile::TempDir;

const WIDGETS_DUCKDB: &str = "
    CREATE SEQUENCE widgets_seq START 100;
    CREATE TABLE widgets (id INTEGER PRIMARY KEY DEFAULT nextval('widgets_seq'), name VARCHAR);
    CREATE SEQUENCE parts_seq START 1;
    CREATE TABLE parts (
        id INTEGER PRIMARY KEY DEFAULT nextval('parts_seq'),
        widget_id INTEGER REFERENCES widgets(id),
        owner VARCHAR
    );
";

const WIDGETS_SQLITE: &str = "
    CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT);
    CREATE TABLE parts (
        id INTEGER PRIMARY KEY,
        widget_id INTEGER REFERENCES widgets(id),
        owner TEXT
    );
";

const BACK_REFERENCE: &str = r#"
variables:
  owner: hoge
seeds:
  - table: widgets
    insert:
      - name: gear
      - name: cog
  - table: parts
    insert:
      - widget_id: '{{id "widgets" 0}}'
        owner: '{{ var("owner") }}'
      - widget_id: '{{ id("widgets", 1) }}'
        owner: static
"#;

fn write_seed(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_back_reference_duckdb() {
    let dir = TempDir::new().unwrap();
    let file = write_seed(&dir, "widgets.yml", BACK_REFERENCE);
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(WIDGETS_DUCKDB).await.unwrap();

    let summary = apply_seeds(&db, &[file]).await.unwrap();
    assert_eq!(summary, SeedSummary { files: 1, rows: 4 });

    let first_widget = db
        .query_rows("SELECT id FROM widgets WHERE name = 'gear'")
        .await
        .unwrap();
    let parts = db
        .query_rows("SELECT widget_id, owner FROM parts ORDER BY id")
        .await
        .unwrap();
    assert_eq!(first_widget, vec![vec!["100".to_string()]]);
    assert_eq!(
        parts,
        vec![
            vec!["100".to_string(), "hoge".to_string()],
            vec!["101".to_string(), "static".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_back_reference_sqlite() {
    let dir = TempDir::new().unwrap();
    let file = write_seed(&dir, "widgets.yml", BACK_REFERENCE);
    let db = SqliteBackend::in_memory().unwrap();
    db.execute_batch(WIDGETS_SQLITE).await.unwrap();

    apply_seeds(&db, &[file]).await.unwrap();

    let parts = db
        .query_rows("SELECT widget_id FROM parts ORDER BY id")
        .await
        .unwrap();
    assert_eq!(parts, vec![vec!["1".to_string()], vec!["2".to_string()]]);
}

#[tokio::test]
async fn test_ids_do_not_leak_across_files() {
    let dir = TempDir::new().unwrap();
    let first = write_seed(
        &dir,
        "01_widgets.yml",
        "seeds:\n  - table: widgets\n    insert:\n      - name: gear\n",
    );
    let second = write_seed(
        &dir,
        "02_parts.yml",
        "seeds:\n  - table: parts\n    insert:\n      - widget_id: '{{ id(\"widgets\", 0) }}'\n",
    );
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(WIDGETS_DUCKDB).await.unwrap();

    let err = apply_seeds(&db, &[first, second]).await.unwrap_err();
    match err {
        EngineError::Template {
            file_index,
            table,
            row,
            column,
            source,
            ..
        } => {
            assert_eq!(file_index, 2);
            assert_eq!(table, "parts");
            assert_eq!(row, 0);
            assert_eq!(column, "widget_id");
            assert!(matches!(
                source,
                mg_template::TemplateError::UnknownTable { .. }
            ));
        }
        other => panic!("expected Template error, got {other}"),
    }
}

#[tokio::test]
async fn test_reference_to_row_without_id_fails() {
    let dir = TempDir::new().unwrap();
    let file = write_seed(
        &dir,
        "tags.yml",
        r#"
seeds:
  - table: tags
    insert:
      - label: red
  - table: notes
    insert:
      - tag: '{{ id("tags", 0) }}'
"#,
    );
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE tags (label VARCHAR); CREATE TABLE notes (tag VARCHAR);")
        .await
        .unwrap();

    let err = apply_seeds(&db, &[file]).await.unwrap_err();
    assert!(
        matches!(
            err,
            EngineError::Template {
                source: mg_template::TemplateError::MissingGeneratedId { .. },
                ..
            }
        ),
        "got {err}"
    );
    assert_eq!(db.query_count("SELECT * FROM notes").await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_failure_stops_run() {
    let dir = TempDir::new().unwrap();
    let file = write_seed(
        &dir,
        "bad.yml",
        "seeds:\n  - table: missing_table\n    insert:\n      - a: '1'\n",
    );
    let later = write_seed(
        &dir,
        "later.yml",
        "seeds:\n  - table: widgets\n    insert:\n      - name: never\n",
    );
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(WIDGETS_DUCKDB).await.unwrap();

    let err = apply_seeds(&db, &[file, later]).await.unwrap_err();
    assert!(matches!(err, EngineError::SqlExecution { .. }), "got {err}");
    assert!(err.to_string().contains("bad.yml"));
    assert_eq!(db.query_count("SELECT * FROM widgets").await.unwrap(), 0);
}

#[tokio::test]
async fn test_parse_failure_reports_file() {
    let dir = TempDir::new().unwrap();
    let file = write_seed(&dir, "broken.yml", "seeds: [not, a, group");
    let db = DuckDbBackend::in_memory().unwrap();

    let err = apply_seeds(&db, &[file]).await.unwrap_err();
    assert!(
        matches!(err, EngineError::SeedParse { file_index: 1, .. }),
        "got {err}"
    );
}

#[tokio::test]
async fn test_seed_database_truncates_first() {
    let dir = TempDir::new().unwrap();
    let file = write_seed(&dir, "widgets.yml", BACK_REFERENCE);
    let db = SqliteBackend::in_memory().unwrap();
    init_ledger_table(&db, &TrialRead).await.unwrap();
    record_applied(&db, "20200101000000").await.unwrap();
    db.execute_batch(WIDGETS_SQLITE).await.unwrap();

    seed_database(&db, &[file.clone()]).await.unwrap();
    seed_database(&db, &[file]).await.unwrap();

    assert_eq!(db.query_count("SELECT * FROM widgets").await.unwrap(), 2);
    assert_eq!(db.query_count("SELECT * FROM parts").await.unwrap(), 2);
    assert_eq!(db.query_count("SELECT * FROM migrations").await.unwrap(), 1);
}
