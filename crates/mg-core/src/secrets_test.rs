use super::*;
use std::fs;
use tempfile::TempDir;

fn store() -> SecretStore {
    let mut store = SecretStore::default();
    store.insert_source(
        "vault",
        HashMap::from([("db_uri".to_string(), "/data/prod.duckdb".to_string())]),
    );
    store
}

#[test]
fn test_plain_value_unchanged() {
    assert_eq!(store().resolve("./local.duckdb").unwrap(), "./local.duckdb");
}

#[test]
fn test_resolve_secret() {
    assert_eq!(
        store().resolve("SECRET://vault/db_uri").unwrap(),
        "/data/prod.duckdb"
    );
}

#[test]
fn test_missing_key() {
    let err = store().resolve("SECRET://vault/nope").unwrap_err();
    match err {
        CoreError::SecretNotFound { source_name, key } => {
            assert_eq!(source_name, "vault");
            assert_eq!(key, "nope");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_source() {
    let err = store().resolve("SECRET://other/db_uri").unwrap_err();
    assert!(matches!(err, CoreError::SecretNotFound { .. }));
}

#[test]
fn test_reference_without_key() {
    let err = store().resolve("SECRET://vault").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_is_secret_uri() {
    assert!(is_secret_uri("SECRET://a/b"));
    assert!(!is_secret_uri("./db.duckdb"));
}

#[tokio::test]
async fn test_load_json_source() {
    let dir = TempDir::new().unwrap();
    let secrets_path = dir.path().join("secrets.json");
    fs::write(&secrets_path, r#"{"uri": ":memory:"}"#).unwrap();

    let yaml = format!(
        "databases:\n  local:\n    uri: SECRET://dev/uri\n    default: true\nsecrets:\n  dev:\n    driver: json\n    uri: {}",
        secrets_path.display()
    );
    let config: Config = serde_yaml::from_str(&yaml).unwrap();
    let store = SecretStore::load(&config).await.unwrap();

    let db = config.find_database("default!").unwrap();
    let resolved = db.resolved(&store).unwrap();
    assert_eq!(resolved.uri, ":memory:");
    assert_eq!(resolved.name, "local");
}

#[tokio::test]
async fn test_json_source_directory_rejected() {
    let dir = TempDir::new().unwrap();
    let yaml = format!(
        "secrets:\n  dev:\n    driver: json\n    uri: {}",
        dir.path().display()
    );
    let config: Config = serde_yaml::from_str(&yaml).unwrap();
    let err = SecretStore::load(&config).await.unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[tokio::test]
async fn test_aws_source_requires_region() {
    let yaml = "secrets:\n  prod:\n    driver: aws-secretsmanager\n    uri: db/creds";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = SecretStore::load(&config).await.unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }), "got {err}");
}

#[test]
fn test_parse_aws_uri() {
    let location = parse_aws_uri("prod", "db/creds?region=ap-northeast-1").unwrap();
    assert_eq!(
        location,
        AwsSecretLocation {
            secret_id: "db/creds".to_string(),
            region: "ap-northeast-1".to_string(),
        }
    );
}

#[test]
fn test_parse_aws_uri_without_secret_name() {
    let err = parse_aws_uri("prod", "?region=us-east-1").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }), "got {err}");
}

#[test]
fn test_secret_payload_stringifies_scalars() {
    let values =
        parse_secret_payload("prod", r#"{"user": "app", "port": 3306, "tls": true}"#).unwrap();
    assert_eq!(values["user"], "app");
    assert_eq!(values["port"], "3306");
    assert_eq!(values["tls"], "true");
}

#[test]
fn test_secret_payload_rejects_nested_values() {
    let err = parse_secret_payload("prod", r#"{"hosts": ["a", "b"]}"#).unwrap_err();
    assert!(matches!(err, CoreError::SecretSourceFailed { .. }), "got {err}");
}
