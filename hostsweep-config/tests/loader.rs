use std::collections::HashMap;
use std::fs;

use hostsweep_config::{
    ConfigGuardRailError, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    DatabaseBackend, EnvConfig,
};
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> EnvConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvConfig::from_lookup(|key| vars.get(key).cloned())
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("hostsweep.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn file_values_are_applied_over_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[server]
port = 9100

[database]
backend = "memory"

[discovery.pipeline]
url = "http://scanner.internal:5112/pipeline"
timeout_secs = 30

[scan]
group_size = 8

[queue]
workers = 2

[queue.retry]
max_attempts = 5
"#,
    );

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[]))
        .unwrap();
    let config = load.config;

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.database.backend, DatabaseBackend::Memory);
    assert_eq!(
        config.discovery.pipeline.url.as_str(),
        "http://scanner.internal:5112/pipeline"
    );
    assert_eq!(config.discovery.pipeline.timeout_secs, Some(30));
    assert_eq!(config.discovery.adhoc.url.as_str(), "http://127.0.0.1:5006/scan");
    assert_eq!(config.scan.group_size, 8);
    assert_eq!(config.scan.sub_batch_size, 20);
    assert_eq!(config.queue.workers, 2);
    assert_eq!(config.queue.retry.max_attempts, 5);
    assert_eq!(config.queue.retry.backoff_base_ms, 2_000);
    assert_eq!(config.report.public_base_url, "http://127.0.0.1:9100");
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));

    assert!(
        load.warnings
            .iter()
            .any(|w| w.message.contains("in-memory store"))
    );
}

#[test]
fn environment_overrides_file_and_cli_overrides_both() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[server]
host = "10.1.1.1"
port = 9100

[database]
url = "postgres://file@localhost/hostsweep"

[report]
public_base_url = "https://file.example"
"#,
    );

    let loader = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: Some(path),
        port: Some(7000),
        ..ConfigLoaderOptions::default()
    });
    let config = loader
        .load_with_env(env(&[
            ("SERVER_HOST", "127.0.0.2"),
            ("SERVER_PORT", "9200"),
            ("DATABASE_URL", "postgres://env@localhost/hostsweep"),
            ("HOSTSWEEP_PUBLIC_BASE_URL", "https://reports.example/"),
            ("HOSTSWEEP_QUEUE_WORKERS", "6"),
        ]))
        .unwrap()
        .config;

    assert_eq!(config.server.host, "127.0.0.2");
    assert_eq!(config.server.port, 7000);
    assert_eq!(
        config.database.url.as_deref(),
        Some("postgres://env@localhost/hostsweep")
    );
    assert_eq!(config.report.public_base_url, "https://reports.example");
    assert_eq!(config.queue.workers, 6);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .load_with_env(env(&[("DATABASE_URL", "postgres://localhost/db")]))
        .unwrap_err();

    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn postgres_without_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[database]\nbackend = \"postgres\"\n");

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[]))
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::MissingDatabaseUrl)
    ));
}

#[test]
fn zero_group_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "[database]\nbackend = \"memory\"\n\n[scan]\ngroup_size = 0\n",
    );

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[]))
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::Zero {
            field: "scan.group_size"
        })
    ));
}

#[test]
fn malformed_toml_reports_the_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[server\nport = 1");

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[]))
        .unwrap_err();

    match err {
        ConfigLoadError::Parse { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_endpoint_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[database]\nbackend = \"memory\"\n");

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[("HOSTSWEEP_ADHOC_URL", "not a url")]))
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigLoadError::InvalidUrl {
            field: "discovery.adhoc.url",
            ..
        }
    ));
}

#[test]
fn env_file_is_optional() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[database]\nbackend = \"memory\"\n");

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .with_env_file(dir.path().join("missing.env"))
        .load()
        .unwrap();

    assert!(!load.config.metadata.env_file_loaded);
}
