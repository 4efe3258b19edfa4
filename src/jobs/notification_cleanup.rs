use anyhow::Result;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::app::notifications::notification_from_row;
use crate::domain::notification::Notification;
use crate::infra::db::Db;

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time. Expiry is compared as an instant, so the offset does not matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[axum::async_trait]
pub trait NotificationStore: Send + Sync {
    type Tx: NotificationTx;

    async fn begin(&self) -> Result<Self::Tx>;
}

/// One unit of work against the store. Dropping it without `commit` discards
/// every change made through it.
#[axum::async_trait]
pub trait NotificationTx: Send {
    /// Expired candidates. A store may leave out rows that are not globally
    /// acknowledged; the caller still applies the full retention rule.
    async fn find_expired_before(&mut self, instant: OffsetDateTime) -> Result<Vec<Notification>>;

    async fn delete_all(&mut self, ids: &[Uuid]) -> Result<u64>;

    async fn commit(self) -> Result<()>;
}

/// Deletes notifications that are expired and globally acknowledged, and are
/// either acknowledged by their owner or have no known owner.
///
/// Store errors propagate unchanged. Returns the ids that were removed.
pub async fn clean_up_notifications<S, C>(store: &S, clock: &C) -> Result<Vec<Uuid>>
where
    S: NotificationStore,
    C: Clock,
{
    let now = clock.now();
    let mut tx = store.begin().await?;

    let expired = tx.find_expired_before(now).await?;
    let scanned = expired.len();
    let removable: Vec<Uuid> = expired
        .iter()
        .filter(|notification| notification.is_removable_at(now))
        .map(|notification| notification.id)
        .collect();

    if !removable.is_empty() {
        tx.delete_all(&removable).await?;
    }
    tx.commit().await?;

    if removable.is_empty() {
        debug!(scanned, "no notifications eligible for cleanup");
    } else {
        info!(scanned, deleted = removable.len(), "cleaned up notifications");
    }

    Ok(removable)
}

#[derive(Clone)]
pub struct PgNotificationStore {
    db: Db,
}

impl PgNotificationStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

pub struct PgNotificationTx {
    tx: Transaction<'static, Postgres>,
}

#[axum::async_trait]
impl NotificationStore for PgNotificationStore {
    type Tx = PgNotificationTx;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(PgNotificationTx {
            tx: self.db.begin().await?,
        })
    }
}

#[axum::async_trait]
impl NotificationTx for PgNotificationTx {
    async fn find_expired_before(&mut self, instant: OffsetDateTime) -> Result<Vec<Notification>> {
        // Row locks keep the selected set stable until the delete commits.
        // Rows that are not globally acknowledged can never qualify, so they
        // are neither loaded nor locked.
        let rows = sqlx::query(
            "SELECT id, municipality_id, namespace, errand_id, owner_id, created_by, \
                    notification_type, description, content, expires, acknowledged, \
                    global_acknowledged, created_at, updated_at \
             FROM notifications \
             WHERE expires < $1 AND global_acknowledged \
             FOR UPDATE",
        )
        .bind(instant)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn delete_all(&mut self, ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
