//! Integration tests for Migrant
//!
//! Library-level scenarios run against in-memory databases; CLI scenarios
//! drive the compiled binary with `--yes` against a DuckDB file.

use mg_core::{Config, SecretStore};
use mg_db::{Database, DuckDbBackend};
use mg_engine::{
    apply_migrations, check_migrations, init_ledger_table, seed_database, truncate_tables,
    TrialRead,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled migrant binary
fn migrant_bin() -> String {
    env!("CARGO_BIN_EXE_migrant").to_string()
}

/// Run a `migrant` command and return (stdout, stderr, success).
fn run_migrant(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(migrant_bin())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute migrant with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

/// A project directory with a config, one database and its migrations.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("migrations/local")).unwrap();
        fs::create_dir_all(root.join("seeds")).unwrap();
        fs::write(root.join("secrets.json"), r#"{"local_db": "app.duckdb"}"#).unwrap();

        let config = format!(
            "migrations: {root}/migrations\n\
             seeds: {root}/seeds\n\
             databases:\n  \
               local:\n    \
                 driver: duckdb\n    \
                 uri: {root}/app.duckdb\n    \
                 default: true\n\
             secrets:\n  \
               dev:\n    \
                 driver: json\n    \
                 uri: {root}/secrets.json\n",
            root = root.display()
        );
        fs::write(root.join("config.yml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn config_arg(&self) -> String {
        self.path("config.yml").display().to_string()
    }

    fn migration(&self, name: &str, sql: &str) {
        fs::write(self.path("migrations/local").join(name), sql).unwrap();
    }

    fn seed(&self, name: &str, content: &str) {
        fs::write(self.path("seeds").join(name), content).unwrap();
    }

    fn run(&self, args: &[&str]) -> (String, String, bool) {
        let config = self.config_arg();
        let mut full = vec!["--config", config.as_str(), "--yes"];
        full.extend_from_slice(args);
        run_migrant(&full)
    }

    fn open_db(&self) -> DuckDbBackend {
        DuckDbBackend::from_path(&self.path("app.duckdb")).unwrap()
    }
}

fn write_migrations(dir: &Path, files: &[(&str, &str)]) {
    for (name, sql) in files {
        fs::write(dir.join(name), sql).unwrap();
    }
}

// ── Engine scenarios ────────────────────────────────────────────────────

#[tokio::test]
async fn test_concrete_reconcile_and_apply_scenario() {
    let dir = TempDir::new().unwrap();
    write_migrations(
        dir.path(),
        &[
            ("20190101001122_test_1.sql", "CREATE TABLE one (id INT);"),
            ("20190102001122_test_2.sql", "CREATE TABLE two (id INT);"),
        ],
    );
    let db = DuckDbBackend::in_memory().unwrap();
    init_ledger_table(&db, &TrialRead).await.unwrap();
    db.execute("INSERT INTO migrations (name) VALUES ('20190101001122')")
        .await
        .unwrap();

    let records = check_migrations(&db, dir.path()).await.unwrap();
    let summary: Vec<(&str, &str, bool)> = records
        .iter()
        .map(|r| (r.prefix.as_str(), r.description.as_str(), r.applied))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("20190101001122", "test 1", true),
            ("20190102001122", "test 2", false),
        ]
    );

    let applied = apply_migrations(&db, &records).await.unwrap();
    assert_eq!(applied.applied, vec!["20190102001122".to_string()]);
    assert!(!db.relation_exists("one").await.unwrap());
    assert!(db.relation_exists("two").await.unwrap());
}

#[tokio::test]
async fn test_migrate_then_seed_then_truncate() {
    let dir = TempDir::new().unwrap();
    write_migrations(
        dir.path(),
        &[
            (
                "20200101000000_widgets.sql",
                "CREATE SEQUENCE widgets_seq START 1;
                 CREATE TABLE widgets (id INTEGER PRIMARY KEY DEFAULT nextval('widgets_seq'), name VARCHAR);",
            ),
            (
                "20200102000000_parts.sql",
                "CREATE TABLE parts (widget_id INTEGER REFERENCES widgets(id), owner VARCHAR);",
            ),
        ],
    );
    let seed = dir.path().join("seed.yml");
    fs::write(
        &seed,
        r#"
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
        owner: '{{var "owner"}}'
"#,
    )
    .unwrap();

    let db = DuckDbBackend::in_memory().unwrap();
    init_ledger_table(&db, &TrialRead).await.unwrap();
    let records = check_migrations(&db, dir.path()).await.unwrap();
    apply_migrations(&db, &records).await.unwrap();

    let summary = seed_database(&db, &[seed]).await.unwrap();
    assert_eq!(summary.rows, 3);

    let first_widget = db
        .query_rows("SELECT id FROM widgets WHERE name = 'gear'")
        .await
        .unwrap();
    let parts = db.query_rows("SELECT widget_id, owner FROM parts").await.unwrap();
    assert_eq!(
        parts,
        vec![vec![first_widget[0][0].clone(), "hoge".to_string()]]
    );

    truncate_tables(&db).await.unwrap();
    assert_eq!(db.query_count("SELECT * FROM widgets").await.unwrap(), 0);
    assert_eq!(db.query_count("SELECT * FROM parts").await.unwrap(), 0);
    assert_eq!(db.query_count("SELECT * FROM migrations").await.unwrap(), 2);
}

#[tokio::test]
async fn test_secret_reference_in_database_uri() {
    let project = Project::new();
    let config_path = project.path("config.yml");
    let original = fs::read_to_string(&config_path).unwrap();
    let rewritten = original.replace(
        &format!("uri: {}/app.duckdb", project.dir.path().display()),
        "uri: SECRET://dev/local_db",
    );
    fs::write(&config_path, rewritten).unwrap();

    let config = Config::discover(&config_path).unwrap();
    let secrets = SecretStore::load(&config).await.unwrap();
    let database = config
        .find_database(mg_core::DEFAULT_DATABASE)
        .unwrap()
        .resolved(&secrets)
        .unwrap();

    assert_eq!(database.name, "local");
    assert_eq!(database.uri, "app.duckdb");
}

// ── CLI scenarios ───────────────────────────────────────────────────────

#[test]
fn test_cli_gen_creates_template() {
    let project = Project::new();

    let (stdout, stderr, ok) = project.run(&["gen", "create", "users"]);
    assert!(ok, "gen failed: {stderr}");
    assert!(stdout.contains("Generated migration"));

    let files: Vec<_> = fs::read_dir(project.path("migrations/local"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.ends_with("_create_users.sql"), "unexpected name {name}");
    assert_eq!(
        fs::read_to_string(&files[0]).unwrap(),
        "-- Write your migration here"
    );
}

#[tokio::test]
async fn test_cli_up_is_idempotent() {
    let project = Project::new();
    project.migration("20200101000000_create_items.sql", "CREATE TABLE items (id INTEGER);");
    project.migration("20200102000000_fill_items.sql", "INSERT INTO items VALUES (1), (2);");

    let (stdout, stderr, ok) = project.run(&["up"]);
    assert!(ok, "first up failed: {stderr}");
    assert!(stdout.contains("create items"));
    assert!(stdout.contains("[NOT APPLIED]"));

    let (stdout, stderr, ok) = project.run(&["up"]);
    assert!(ok, "second up failed: {stderr}");
    assert!(stdout.contains("No migrations to apply"));
    assert!(!stdout.contains("[NOT APPLIED]"));

    let db = project.open_db();
    assert_eq!(db.query_count("SELECT * FROM items").await.unwrap(), 2);
}

#[test]
fn test_cli_up_reports_failing_migration() {
    let project = Project::new();
    project.migration("20200101000000_a.sql", "CREATE TABLE a (id INT);");
    project.migration("20200102000000_b.sql", "CREATE TABLE b (id INT;");
    project.migration("20200103000000_c.sql", "CREATE TABLE c (id INT);");

    let (_, stderr, ok) = project.run(&["up"]);
    assert!(!ok);
    assert!(stderr.contains("20200102000000"), "stderr: {stderr}");
}

#[tokio::test]
async fn test_cli_seed_and_reset() {
    let project = Project::new();
    project.migration(
        "20200101000000_tags.sql",
        "CREATE TABLE tags (label VARCHAR);",
    );
    project.seed("tags.yml", "seeds:\n  - table: tags\n    insert:\n      - label: red\n      - label: blue\n");

    let (_, stderr, ok) = project.run(&["up"]);
    assert!(ok, "up failed: {stderr}");

    let (stdout, stderr, ok) = project.run(&["seed"]);
    assert!(ok, "seed failed: {stderr}");
    assert!(stdout.contains("Seeded 2 row(s) from 1 file(s)"));

    let (_, stderr, ok) = project.run(&["reset"]);
    assert!(ok, "reset failed: {stderr}");

    let db = project.open_db();
    assert_eq!(db.query_count("SELECT * FROM tags").await.unwrap(), 0);
    assert_eq!(db.query_count("SELECT * FROM migrations").await.unwrap(), 1);
}

#[test]
fn test_cli_unknown_database() {
    let project = Project::new();
    let (_, stderr, ok) = project.run(&["--database", "nope", "up"]);
    assert!(!ok);
    assert!(stderr.contains("[C004]"), "stderr: {stderr}");
}

#[test]
fn test_cli_missing_config() {
    let (_, stderr, ok) = run_migrant(&["--config", "/nonexistent/migrant.yml", "up"]);
    assert!(!ok);
    assert!(stderr.contains("[C001]"), "stderr: {stderr}");
}
