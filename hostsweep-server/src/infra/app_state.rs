use std::{fmt, path::PathBuf, sync::Arc};

use hostsweep_core::ScanStore;
use hostsweep_core::orchestration::InProcJobRuntime;
use hostsweep_core::report::ReportService;
use hostsweep_core::scan::{
    AdhocRangeScanner, ScanQueryService, ScanSubmissionService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: ScanStore,
    pub runtime: InProcJobRuntime,
    pub submissions: Arc<ScanSubmissionService>,
    pub adhoc: Arc<AdhocRangeScanner>,
    pub queries: Arc<ScanQueryService>,
    pub reports: Arc<ReportService>,
    /// Root of the served tree; published reports live under `reports/`.
    pub public_dir: PathBuf,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("public_dir", &self.public_dir)
            .finish_non_exhaustive()
    }
}
