pub mod adhoc;
pub mod health;
pub mod reports;
pub mod scans;

use hostsweep_core::types::ScanId;

use crate::infra::errors::AppError;

pub(crate) fn parse_scan_id(raw: &str) -> Result<ScanId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("Invalid scan id: {raw}")))
}
