//! Repository ports for the scan bounded context. Implementations live in
//! [`crate::database::postgres`] and [`crate::database::memory`].

pub mod results;
pub mod scans;
pub mod targets;

pub use results::ResultRepository;
pub use scans::ScanRepository;
pub use targets::TargetRepository;
