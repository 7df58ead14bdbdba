use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::Result;
use crate::database::ports::ResultRepository;
use crate::types::{
    NewScanResult, Page, PageRequest, ResultId, ScanId, ScanResult, TargetId,
};

#[derive(Debug, Clone)]
pub struct PostgresResultRepository {
    pool: PgPool,
}

impl PostgresResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow, with_data: bool) -> Result<ScanResult> {
        let id: Uuid = row.try_get("id")?;
        let scan_id: Uuid = row.try_get("scan_id")?;
        let target_id: Option<Uuid> = row.try_get("target_id")?;
        let data: Option<Value> = if with_data {
            row.try_get("data")?
        } else {
            None
        };

        Ok(ScanResult {
            id: ResultId(id),
            scan_id: ScanId(scan_id),
            target_id: target_id.map(TargetId),
            ip: row.try_get("ip")?,
            data,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ResultRepository for PostgresResultRepository {
    async fn insert_if_absent(&self, result: NewScanResult) -> Result<bool> {
        let outcome = sqlx::query(
            r#"
            INSERT INTO scan_results (id, scan_id, target_id, ip, data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(ResultId::new().as_uuid())
        .bind(result.scan_id.as_uuid())
        .bind(result.target_id.map(|id| id.as_uuid()))
        .bind(&result.ip)
        .bind(&result.data)
        .execute(self.pool())
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    async fn list_for_scan(&self, scan_id: ScanId) -> Result<Vec<ScanResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, scan_id, target_id, ip, data, created_at
            FROM scan_results
            WHERE scan_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(scan_id.as_uuid())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(|row| Self::map_row(row, true)).collect()
    }

    async fn page_for_scan(
        &self,
        scan_id: ScanId,
        page: PageRequest,
    ) -> Result<Page<ScanResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, scan_id, target_id, ip, created_at
            FROM scan_results
            WHERE scan_id = $1
            ORDER BY created_at, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(scan_id.as_uuid())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scan_results WHERE scan_id = $1",
        )
        .bind(scan_id.as_uuid())
        .fetch_one(self.pool())
        .await?;

        let items = rows
            .iter()
            .map(|row| Self::map_row(row, false))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }
}
