// Database queries for sync run audit records

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::schema::SyncRunRow;
use crate::domain::SyncRun;
use crate::errors::Result;

/// Append a sync run record. The table is append-only by convention.
pub async fn insert(pool: &PgPool, run: &SyncRun) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sync_runs (
            id, tenant_id, platform, account_id, started_at, finished_at, status, error
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(run.id)
    .bind(run.tenant_id)
    .bind(run.platform.as_str())
    .bind(&run.account_id)
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(run.status.as_str())
    .bind(&run.error)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent runs for a tenant, newest first
pub async fn recent_for_tenant(pool: &PgPool, tenant_id: Uuid, limit: i64) -> Result<Vec<SyncRun>> {
    let rows = sqlx::query_as::<_, SyncRunRow>(
        r#"
        SELECT id, tenant_id, platform, account_id, started_at, finished_at, status, error
        FROM sync_runs
        WHERE tenant_id = $1
        ORDER BY started_at DESC
        LIMIT $2
        "#,
    )
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SyncRun::try_from).collect()
}
