use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::Result;
use crate::database::ports::TargetRepository;
use crate::types::{
    Page, PageRequest, ScanId, ScanTarget, TargetId, TargetStatus,
};

#[derive(Debug, Clone)]
pub struct PostgresTargetRepository {
    pool: PgPool,
}

impl PostgresTargetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<ScanTarget> {
        let id: Uuid = row.try_get("id")?;
        let scan_id: Uuid = row.try_get("scan_id")?;
        let status: String = row.try_get("status")?;

        Ok(ScanTarget {
            id: TargetId(id),
            scan_id: ScanId(scan_id),
            target: row.try_get("target")?,
            status: status.parse::<TargetStatus>()?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn set_terminal(
        &self,
        id: TargetId,
        status: TargetStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scan_targets
            SET status = $2, last_error = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(error)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TargetRepository for PostgresTargetRepository {
    async fn get(&self, id: TargetId) -> Result<Option<ScanTarget>> {
        let row = sqlx::query(
            r#"
            SELECT id, scan_id, target, status, last_error, created_at, updated_at
            FROM scan_targets
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list_for_scan(
        &self,
        scan_id: ScanId,
        page: PageRequest,
    ) -> Result<Page<ScanTarget>> {
        let rows = sqlx::query(
            r#"
            SELECT id, scan_id, target, status, last_error, created_at, updated_at
            FROM scan_targets
            WHERE scan_id = $1
            ORDER BY position
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(scan_id.as_uuid())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scan_targets WHERE scan_id = $1",
        )
        .bind(scan_id.as_uuid())
        .fetch_one(self.pool())
        .await?;

        let items = rows.iter().map(Self::map_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }

    async fn mark_in_progress(&self, id: TargetId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scan_targets
            SET status = 'in_progress', last_error = NULL, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(id.as_uuid())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_done(&self, id: TargetId) -> Result<()> {
        self.set_terminal(id, TargetStatus::Done, None).await
    }

    async fn mark_error(&self, id: TargetId, error: &str) -> Result<()> {
        self.set_terminal(id, TargetStatus::Error, Some(error)).await
    }
}
