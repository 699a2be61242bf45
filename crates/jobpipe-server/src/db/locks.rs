//! Postgres-backed lock store on the `cron_locks` table

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use crate::ingest::lock::LockStore;
use crate::ingest::store::StoreResult;

#[derive(Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockStore for PgLockStore {
    async fn try_acquire(&self, name: &str, ttl: Duration, holder: &str) -> StoreResult<bool> {
        // One statement: insert, or take over only when expired. A held lock
        // makes the conditional update match nothing and RETURNING yields no row.
        let acquired = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO cron_locks (lock_name, locked_until, locked_by)
            VALUES ($1, NOW() + ($2 * INTERVAL '1 second'), $3)
            ON CONFLICT (lock_name) DO UPDATE
                SET locked_until = EXCLUDED.locked_until,
                    locked_by = EXCLUDED.locked_by
                WHERE cron_locks.locked_until < NOW()
            RETURNING lock_name
            "#,
        )
        .bind(name)
        .bind(ttl.as_secs_f64())
        .bind(holder)
        .fetch_optional(&self.pool)
        .await?;

        Ok(acquired.is_some())
    }

    async fn release(&self, name: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE cron_locks SET locked_until = TIMESTAMPTZ '2000-01-01 00:00:00+00' WHERE lock_name = $1",
        )
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
