//! In-process store backing every repository port with one lock.
//!
//! Used for ephemeral deployments (`database.backend = "memory"`) and tests.
//! All aggregate updates run under the same lock, so the counter refresh and
//! the completion check are serialized exactly like their single-statement
//! Postgres counterparts.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::Result;
use crate::database::ports::{
    ResultRepository, ScanRepository, TargetRepository,
};
use crate::types::{
    NewScan, NewScanResult, Page, PageRequest, ReportUpdate, ResultId, Scan,
    ScanId, ScanResult, ScanStatus, ScanTarget, TargetId, TargetStatus,
};

type ResultKey = (ScanId, Option<TargetId>, String);

#[derive(Debug, Default)]
struct State {
    scans: HashMap<ScanId, Scan>,
    scan_order: Vec<ScanId>,
    targets: HashMap<TargetId, ScanTarget>,
    targets_by_scan: HashMap<ScanId, Vec<TargetId>>,
    results: Vec<ScanResult>,
    result_keys: HashSet<ResultKey>,
}

impl State {
    fn count_targets(
        &self,
        scan_id: ScanId,
        pred: impl Fn(TargetStatus) -> bool,
    ) -> usize {
        self.targets_by_scan
            .get(&scan_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.targets.get(id))
                    .filter(|target| pred(target.status))
                    .count()
            })
            .unwrap_or(0)
    }

    fn update_target(
        &mut self,
        id: TargetId,
        apply: impl FnOnce(&mut ScanTarget),
    ) {
        if let Some(target) = self.targets.get_mut(&id) {
            apply(target);
            target.updated_at = Utc::now();
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a scan and everything attached to it. Only used to exercise the
    /// "scan vanished mid-job" path.
    pub fn remove_scan(&self, id: ScanId) {
        let mut state = self.state.lock();
        state.scans.remove(&id);
        state.scan_order.retain(|scan_id| *scan_id != id);
        if let Some(target_ids) = state.targets_by_scan.remove(&id) {
            for target_id in target_ids {
                state.targets.remove(&target_id);
            }
        }
        state.results.retain(|result| result.scan_id != id);
        state.result_keys.retain(|(scan_id, _, _)| *scan_id != id);
    }

    /// Number of result rows across all scans.
    pub fn result_count(&self) -> usize {
        self.state.lock().results.len()
    }
}

#[async_trait]
impl ScanRepository for MemoryStore {
    async fn create_with_targets(
        &self,
        scan: NewScan,
    ) -> Result<(Scan, Vec<ScanTarget>)> {
        let total_targets = scan.total_targets()?;
        let now = Utc::now();
        let record = Scan {
            id: ScanId::new(),
            name: scan.name,
            status: ScanStatus::Pending,
            total_targets,
            completed_targets: 0,
            report_status: None,
            report_path: None,
            report_url: None,
            report_error: None,
            created_at: now,
            updated_at: now,
        };
        let targets: Vec<ScanTarget> = scan
            .targets
            .into_iter()
            .map(|target| ScanTarget {
                id: TargetId::new(),
                scan_id: record.id,
                target,
                status: TargetStatus::Pending,
                last_error: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let mut state = self.state.lock();
        state.scans.insert(record.id, record.clone());
        state.scan_order.push(record.id);
        state
            .targets_by_scan
            .insert(record.id, targets.iter().map(|t| t.id).collect());
        for target in &targets {
            state.targets.insert(target.id, target.clone());
        }

        Ok((record, targets))
    }

    async fn get(&self, id: ScanId) -> Result<Option<Scan>> {
        Ok(self.state.lock().scans.get(&id).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Scan>> {
        let state = self.state.lock();
        let items = state
            .scan_order
            .iter()
            .rev()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .filter_map(|id| state.scans.get(id).cloned())
            .collect();
        Ok(Page::new(items, page, state.scan_order.len() as i64))
    }

    async fn mark_running(&self, id: ScanId) -> Result<bool> {
        let mut state = self.state.lock();
        match state.scans.get_mut(&id) {
            Some(scan) if scan.status == ScanStatus::Pending => {
                scan.status = ScanStatus::Running;
                scan.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn refresh_completed_targets(&self, id: ScanId) -> Result<i32> {
        let mut state = self.state.lock();
        let done =
            state.count_targets(id, |status| status == TargetStatus::Done) as i32;
        if let Some(scan) = state.scans.get_mut(&id) {
            scan.completed_targets = done;
            scan.updated_at = Utc::now();
        }
        Ok(done)
    }

    async fn complete_if_drained(&self, id: ScanId) -> Result<bool> {
        let mut state = self.state.lock();
        let remaining = state.count_targets(id, |status| !status.is_terminal());
        match state.scans.get_mut(&id) {
            Some(scan) if scan.status == ScanStatus::Running && remaining == 0 => {
                scan.status = ScanStatus::Completed;
                scan.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: ScanId) -> Result<bool> {
        let mut state = self.state.lock();
        match state.scans.get_mut(&id) {
            Some(scan) if !scan.status.is_terminal() => {
                scan.status = ScanStatus::Failed;
                scan.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_report(&self, id: ScanId, update: ReportUpdate) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(scan) = state.scans.get_mut(&id) {
            scan.report_status = Some(update.status());
            match update {
                ReportUpdate::Ready { path, url } => {
                    scan.report_path = Some(path);
                    scan.report_url = Some(url);
                    scan.report_error = None;
                }
                ReportUpdate::Failed { error } => {
                    scan.report_error = Some(error);
                }
                ReportUpdate::Queued | ReportUpdate::NoResults => {}
            }
            scan.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl TargetRepository for MemoryStore {
    async fn get(&self, id: TargetId) -> Result<Option<ScanTarget>> {
        Ok(self.state.lock().targets.get(&id).cloned())
    }

    async fn list_for_scan(
        &self,
        scan_id: ScanId,
        page: PageRequest,
    ) -> Result<Page<ScanTarget>> {
        let state = self.state.lock();
        let ids = state
            .targets_by_scan
            .get(&scan_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let items = ids
            .iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .filter_map(|id| state.targets.get(id).cloned())
            .collect();
        Ok(Page::new(items, page, ids.len() as i64))
    }

    async fn mark_in_progress(&self, id: TargetId) -> Result<bool> {
        let mut state = self.state.lock();
        let restartable = state
            .targets
            .get(&id)
            .is_some_and(|target| !target.status.is_terminal());
        if !restartable {
            return Ok(false);
        }
        state.update_target(id, |target| {
            target.status = TargetStatus::InProgress;
            target.last_error = None;
        });
        Ok(true)
    }

    async fn mark_done(&self, id: TargetId) -> Result<()> {
        self.state.lock().update_target(id, |target| {
            target.status = TargetStatus::Done;
        });
        Ok(())
    }

    async fn mark_error(&self, id: TargetId, error: &str) -> Result<()> {
        self.state.lock().update_target(id, |target| {
            target.status = TargetStatus::Error;
            target.last_error = Some(error.to_string());
        });
        Ok(())
    }
}

#[async_trait]
impl ResultRepository for MemoryStore {
    async fn insert_if_absent(&self, result: NewScanResult) -> Result<bool> {
        let mut state = self.state.lock();
        let key = (result.scan_id, result.target_id, result.ip.clone());
        if !state.result_keys.insert(key) {
            return Ok(false);
        }
        state.results.push(ScanResult {
            id: ResultId::new(),
            scan_id: result.scan_id,
            target_id: result.target_id,
            ip: result.ip,
            data: Some(result.data),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_for_scan(&self, scan_id: ScanId) -> Result<Vec<ScanResult>> {
        Ok(self
            .state
            .lock()
            .results
            .iter()
            .filter(|result| result.scan_id == scan_id)
            .cloned()
            .collect())
    }

    async fn page_for_scan(
        &self,
        scan_id: ScanId,
        page: PageRequest,
    ) -> Result<Page<ScanResult>> {
        let state = self.state.lock();
        let matching: Vec<&ScanResult> = state
            .results
            .iter()
            .filter(|result| result.scan_id == scan_id)
            .collect();
        let items = matching
            .iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|result| ScanResult {
                data: None,
                ..(*result).clone()
            })
            .collect();
        Ok(Page::new(items, page, matching.len() as i64))
    }
}
