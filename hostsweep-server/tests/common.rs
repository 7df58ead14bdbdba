use std::fs;
use std::sync::Arc;

use axum_test::TestServer;
use hostsweep_config::{Config, ConfigLoader, EnvConfig};
use hostsweep_core::ScanStore;
use hostsweep_core::testing::{StubDiscoveryClient, StubRenderer, StubRendering};
use hostsweep_server::{
    AppState, create_app,
    infra::startup::{ServiceDeps, assemble},
};
use tempfile::TempDir;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub pipeline: Arc<StubDiscoveryClient>,
    pub adhoc: Arc<StubDiscoveryClient>,
    _dir: TempDir,
}

fn test_config(dir: &TempDir) -> Config {
    let path = dir.path().join("hostsweep.toml");
    let contents = format!(
        r#"
[database]
backend = "memory"

[scan]
group_size = 2

[report]
work_dir = "{work}"
public_dir = "{public}"
public_base_url = "http://reports.test"
"#,
        work = dir.path().join("work").display(),
        public = dir.path().join("public").display(),
    );
    fs::write(&path, contents).unwrap();

    ConfigLoader::new()
        .with_config_path(path)
        .load_with_env(EnvConfig::default())
        .unwrap()
        .config
}

pub fn spawn_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let pipeline = Arc::new(StubDiscoveryClient::default());
    let adhoc = Arc::new(StubDiscoveryClient::default());
    let deps = ServiceDeps {
        pipeline: pipeline.clone(),
        adhoc: adhoc.clone(),
        renderer: Arc::new(StubRenderer::new(StubRendering::WriteOutput)),
    };
    let state = assemble(&config, ScanStore::in_memory(), deps);
    let server = TestServer::new(create_app(state.clone())).unwrap();

    TestApp {
        server,
        state,
        pipeline,
        adhoc,
        _dir: dir,
    }
}
