use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

const LOCK_NAMESPACE: i64 = 0x5345_4354_4F52; // "SECTOR"

fn lock_key(trade_date: NaiveDate) -> i64 {
    LOCK_NAMESPACE ^ i64::from(trade_date.num_days_from_ce())
}

/// Session-level advisory lock on one trade date. The lock lives on the held connection, so it is
/// unlocked on that same connection by [`TradeDateLock::release`]. Dropping the guard without
/// releasing closes the connection instead of returning it, which also frees the lock.
pub struct TradeDateLock {
    conn: Option<PoolConnection<Postgres>>,
    key: i64,
    trade_date: NaiveDate,
}

impl TradeDateLock {
    /// `Ok(None)` when another session already holds the lock for `trade_date`.
    pub async fn try_acquire(
        pool: &sqlx::PgPool,
        trade_date: NaiveDate,
    ) -> anyhow::Result<Option<Self>> {
        let key = lock_key(trade_date);
        let mut conn = pool.acquire().await.context("lock connection unavailable")?;

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .persistent(false)
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("pg_try_advisory_lock failed (date={trade_date})"))?;

        if !acquired {
            return Ok(None);
        }
        tracing::debug!(%trade_date, key, "trade date lock acquired");
        Ok(Some(Self {
            conn: Some(conn),
            key,
            trade_date,
        }))
    }

    pub async fn release(mut self) -> anyhow::Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .persistent(false)
            .bind(self.key)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("pg_advisory_unlock failed (date={})", self.trade_date))?;
        Ok(())
    }
}

impl Drop for TradeDateLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(trade_date = %self.trade_date, "trade date lock dropped without release");
            drop(conn.detach());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_and_distinct_per_date() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_ne!(lock_key(a), lock_key(b));
        assert_eq!(lock_key(a), lock_key(a));
    }
}
