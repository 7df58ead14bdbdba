//! Configuration for hostsweep.
//!
//! Values are layered: `.env`, then a TOML file, then process environment,
//! then explicit overrides from the command line. The result is a fully
//! resolved [`Config`] plus any non-fatal [`ConfigWarnings`].

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, DatabaseBackend, DatabaseConfig, DiscoveryConfig,
    EndpointConfig, LoggingConfig, QueueSettings, ReportConfig, RetrySettings,
    ScanConfig, ServerConfig,
};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
