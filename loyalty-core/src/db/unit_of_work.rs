// loyalty-core/src/db/unit_of_work.rs

use std::time::{Duration, Instant};
use sqlx::{PgConnection, Pool, Postgres, Transaction};
use tracing::{debug, info};
use crate::Error;

/// One database transaction scoped to a single engine operation.
///
/// It ends through `commit` or `rollback`. If it is dropped first (early
/// return, `?`, a panic, or the caller's future being cancelled) sqlx rolls the
/// transaction back when the connection goes back to the pool, so no partial
/// write ever becomes visible.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    label: &'static str,
    started: Instant,
}

impl UnitOfWork {
    pub(crate) async fn begin(
        pool: &Pool<Postgres>,
        label: &'static str,
        lock_timeout: Duration,
    ) -> Result<Self, Error> {
        let mut tx = pool.begin().await?;

        // SET cannot take bind parameters.
        let stmt = format!("SET LOCAL lock_timeout = '{}ms'", lock_timeout.as_millis());
        sqlx::query(&stmt).execute(&mut *tx).await?;

        Ok(Self {
            tx,
            label,
            started: Instant::now(),
        })
    }

    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    /// Hands the finished work back uncommitted, with the line to log once it
    /// is durable.
    pub fn stage<T>(self, value: T, summary: String) -> Staged<T> {
        Staged { uow: self, value, summary }
    }

    pub async fn commit(self) -> Result<(), Error> {
        let (label, started) = (self.label, self.started);
        self.tx.commit().await?;
        debug!("unit of work '{}' committed after {:?}", label, started.elapsed());
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), Error> {
        let (label, started) = (self.label, self.started);
        self.tx.rollback().await?;
        debug!("unit of work '{}' rolled back after {:?}", label, started.elapsed());
        Ok(())
    }
}

/// A mutation whose writes and checks are done and which only awaits COMMIT.
///
/// The engine bounds the work that produces a `Staged` with its operation
/// deadline, and commits outside it: once COMMIT is sent the outcome is
/// reported as it is, never as a timeout.
pub struct Staged<T> {
    uow: UnitOfWork,
    value: T,
    summary: String,
}

impl<T> Staged<T> {
    pub async fn commit(self) -> Result<T, Error> {
        self.uow.commit().await?;
        info!("{}", self.summary);
        Ok(self.value)
    }
}
