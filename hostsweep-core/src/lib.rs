//! # hostsweep core
//!
//! Scan orchestration for network discovery: target submission, batched
//! asynchronous probing through an external discovery backend, live host
//! extraction and deduplication, and report generation.
//!
//! ## Architecture
//!
//! - [`extract`]: pure extraction of live hosts from backend responses
//! - [`discovery`]: the outbound probe client
//! - [`database`]: repository ports with Postgres and in-memory adapters
//! - [`orchestration`]: the in-process job runtime
//! - [`scan`]: submission, batch workers, ad-hoc scanning, dashboard reads
//! - [`report`]: report generation, rendering and publishing
//!
//! ## Feature Flags
//!
//! - `postgres-tests`: runs the Postgres adapter tests (needs `DATABASE_URL`)
//! - `test-utils`: exposes [`testing`] stubs to dependent crates

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod database;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod orchestration;
pub mod report;
pub mod scan;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod testing;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use database::ScanStore;
pub use error::{Result, SweepError};
pub use extract::{Extraction, ResultExtractor, extract_hosts};
