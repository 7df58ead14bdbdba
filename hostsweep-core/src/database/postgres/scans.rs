use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::Result;
use crate::database::ports::ScanRepository;
use crate::types::{
    NewScan, Page, PageRequest, ReportStatus, ReportUpdate, Scan, ScanId,
    ScanStatus, ScanTarget, TargetId, TargetStatus,
};

const SCAN_COLUMNS: &str = r#"
    id,
    name,
    status,
    total_targets,
    completed_targets,
    report_status,
    report_path,
    report_url,
    report_error,
    created_at,
    updated_at
"#;

#[derive(Debug, Clone)]
pub struct PostgresScanRepository {
    pool: PgPool,
}

impl PostgresScanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(super) fn map_row(row: &PgRow) -> Result<Scan> {
        let id: Uuid = row.try_get("id")?;
        let status: String = row.try_get("status")?;
        let report_status: Option<String> = row.try_get("report_status")?;

        Ok(Scan {
            id: ScanId(id),
            name: row.try_get("name")?,
            status: status.parse::<ScanStatus>()?,
            total_targets: row.try_get("total_targets")?,
            completed_targets: row.try_get("completed_targets")?,
            report_status: report_status
                .map(|value| value.parse::<ReportStatus>())
                .transpose()?,
            report_path: row.try_get("report_path")?,
            report_url: row.try_get("report_url")?,
            report_error: row.try_get("report_error")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl ScanRepository for PostgresScanRepository {
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

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO scans (id, name, status, total_targets, completed_targets, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $5)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(record.status.as_str())
        .bind(record.total_targets)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let ids: Vec<Uuid> = targets.iter().map(|t| t.id.as_uuid()).collect();
        let positions: Vec<i32> = (0..total_targets).collect();
        let expressions: Vec<String> =
            targets.iter().map(|t| t.target.clone()).collect();

        sqlx::query(
            r#"
            INSERT INTO scan_targets (id, scan_id, position, target, status, created_at, updated_at)
            SELECT t.id, $2, t.position, t.target, 'pending', $5, $5
            FROM UNNEST($1::uuid[], $3::int4[], $4::text[]) AS t(id, position, target)
            "#,
        )
        .bind(&ids)
        .bind(record.id.as_uuid())
        .bind(&positions)
        .bind(&expressions)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((record, targets))
    }

    async fn get(&self, id: ScanId) -> Result<Option<Scan>> {
        let sql = format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Scan>> {
        let sql = format!(
            "SELECT {SCAN_COLUMNS} FROM scans ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans")
            .fetch_one(self.pool())
            .await?;

        let items = rows.iter().map(Self::map_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }

    async fn mark_running(&self, id: ScanId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scans
            SET status = 'running', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.as_uuid())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn refresh_completed_targets(&self, id: ScanId) -> Result<i32> {
        let completed: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE scans
            SET completed_targets = (
                    SELECT COUNT(*)::int4
                    FROM scan_targets
                    WHERE scan_id = $1 AND status = 'done'
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING completed_targets
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await?;

        Ok(completed.unwrap_or(0))
    }

    async fn complete_if_drained(&self, id: ScanId) -> Result<bool> {
        let row = sqlx::query(
            r#"
            UPDATE scans s
            SET status = 'completed', updated_at = NOW()
            WHERE s.id = $1
              AND s.status = 'running'
              AND NOT EXISTS (
                  SELECT 1
                  FROM scan_targets t
                  WHERE t.scan_id = s.id
                    AND t.status IN ('pending', 'in_progress')
              )
            RETURNING s.id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.is_some())
    }

    async fn mark_failed(&self, id: ScanId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scans
            SET status = 'failed', updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'running')
            "#,
        )
        .bind(id.as_uuid())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_report(&self, id: ScanId, update: ReportUpdate) -> Result<()> {
        let status = update.status().as_str();
        let query = match update {
            ReportUpdate::Queued | ReportUpdate::NoResults => sqlx::query(
                r#"
                UPDATE scans
                SET report_status = $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id.as_uuid())
            .bind(status),
            ReportUpdate::Ready { path, url } => sqlx::query(
                r#"
                UPDATE scans
                SET report_status = $2,
                    report_path = $3,
                    report_url = $4,
                    report_error = NULL,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id.as_uuid())
            .bind(status)
            .bind(path)
            .bind(url),
            ReportUpdate::Failed { error } => sqlx::query(
                r#"
                UPDATE scans
                SET report_status = $2, report_error = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id.as_uuid())
            .bind(status)
            .bind(error),
        };

        query.execute(self.pool()).await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use super::*;
    use crate::database::postgres::PostgresTargetRepository;
    use crate::database::ports::TargetRepository;

    fn new_scan(targets: &[&str]) -> NewScan {
        NewScan {
            name: "pg-scan".into(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn creates_scan_with_targets_in_order(pool: PgPool) {
        let scans = PostgresScanRepository::new(pool.clone());
        let targets = PostgresTargetRepository::new(pool);

        let (scan, created) = scans
            .create_with_targets(new_scan(&["10.0.0.1", "10.0.0.0/30", "10.0.1.1"]))
            .await
            .unwrap();

        let stored = scans.get(scan.id).await.unwrap().unwrap();
        assert_eq!(stored.total_targets, 3);
        assert_eq!(stored.status, ScanStatus::Pending);

        let listed = targets
            .list_for_scan(scan.id, PageRequest::new(1, 50))
            .await
            .unwrap();
        let expressions: Vec<_> =
            listed.items.iter().map(|t| t.target.as_str()).collect();
        assert_eq!(expressions, ["10.0.0.1", "10.0.0.0/30", "10.0.1.1"]);
        assert_eq!(listed.items[0].id, created[0].id);
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn completion_requires_drained_targets_and_happens_once(pool: PgPool) {
        let scans = PostgresScanRepository::new(pool.clone());
        let targets = PostgresTargetRepository::new(pool);

        let (scan, created) =
            scans.create_with_targets(new_scan(&["a", "b"])).await.unwrap();
        assert!(scans.mark_running(scan.id).await.unwrap());
        assert!(!scans.mark_running(scan.id).await.unwrap());

        targets.mark_done(created[0].id).await.unwrap();
        assert!(!scans.complete_if_drained(scan.id).await.unwrap());

        targets.mark_error(created[1].id, "HTTP 500 boom").await.unwrap();
        assert_eq!(scans.refresh_completed_targets(scan.id).await.unwrap(), 1);

        let (first, second) = tokio::join!(
            scans.complete_if_drained(scan.id),
            scans.complete_if_drained(scan.id)
        );
        assert!(first.unwrap() ^ second.unwrap());

        let stored = scans.get(scan.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
        assert!(!scans.mark_running(scan.id).await.unwrap());
        assert!(!scans.mark_failed(scan.id).await.unwrap());
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn report_updates_replace_error_on_success(pool: PgPool) {
        let scans = PostgresScanRepository::new(pool);
        let (scan, _) = scans.create_with_targets(new_scan(&["a"])).await.unwrap();

        scans
            .set_report(scan.id, ReportUpdate::Failed { error: "boom".into() })
            .await
            .unwrap();
        scans
            .set_report(
                scan.id,
                ReportUpdate::Ready {
                    path: "/tmp/r.pdf".into(),
                    url: "http://host/r.pdf".into(),
                },
            )
            .await
            .unwrap();

        let stored = scans.get(scan.id).await.unwrap().unwrap();
        assert_eq!(stored.report_status, Some(ReportStatus::Ready));
        assert_eq!(stored.report_url.as_deref(), Some("http://host/r.pdf"));
        assert_eq!(stored.report_error, None);
    }
}
