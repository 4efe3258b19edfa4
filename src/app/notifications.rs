use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::domain::scope::Scope;
use crate::infra::db::Db;

const NOTIFICATION_COLUMNS: &str = "id, municipality_id, namespace, errand_id, owner_id, created_by, \
     notification_type, description, content, expires, acknowledged, global_acknowledged, \
     created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub errand_id: Uuid,
    pub owner_id: Option<String>,
    pub notification_type: String,
    pub description: String,
    pub content: Option<String>,
    pub expires: Option<OffsetDateTime>,
    pub acknowledged: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationPatch {
    pub description: Option<String>,
    pub content: Option<String>,
    pub expires: Option<OffsetDateTime>,
    pub acknowledged: Option<bool>,
    pub global_acknowledged: Option<bool>,
}

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
    ttl: Duration,
}

impl NotificationService {
    pub fn new(db: Db, ttl_days: i64) -> Self {
        Self {
            db,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Returns `None` when the errand does not exist in the scope.
    pub async fn create(
        &self,
        scope: &Scope,
        notification: NewNotification,
        author: Option<&str>,
    ) -> Result<Option<Notification>> {
        let expires = notification
            .expires
            .unwrap_or_else(|| OffsetDateTime::now_utc() + self.ttl);
        let acknowledged = notification
            .acknowledged
            .unwrap_or_else(|| is_self_notification(notification.owner_id.as_deref(), author));

        let row = sqlx::query(&format!(
            "INSERT INTO notifications \
                (municipality_id, namespace, errand_id, owner_id, created_by, notification_type, \
                 description, content, expires, acknowledged) \
             SELECT e.municipality_id, e.namespace, e.id, $4, $5, $6, $7, $8, $9, $10 \
             FROM errands e \
             WHERE e.id = $1 AND e.municipality_id = $2 AND e.namespace = $3 \
             RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification.errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .bind(notification.owner_id)
        .bind(author)
        .bind(notification.notification_type)
        .bind(notification.description)
        .bind(notification.content)
        .bind(expires)
        .bind(acknowledged)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    pub async fn get(&self, scope: &Scope, notification_id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notifications \
             WHERE id = $1 AND municipality_id = $2 AND namespace = $3",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    pub async fn list_for_owner(&self, scope: &Scope, owner_id: &str) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications \
             WHERE owner_id = $1 AND municipality_id = $2 AND namespace = $3 \
             ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(owner_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    pub async fn list_for_errand(&self, scope: &Scope, errand_id: Uuid) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications \
             WHERE errand_id = $1 AND municipality_id = $2 AND namespace = $3 \
             ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    pub async fn update(
        &self,
        scope: &Scope,
        notification_id: Uuid,
        patch: NotificationPatch,
    ) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "UPDATE notifications \
             SET description = COALESCE($4, description), \
                 content = COALESCE($5, content), \
                 expires = COALESCE($6, expires), \
                 acknowledged = COALESCE($7, acknowledged), \
                 global_acknowledged = COALESCE($8, global_acknowledged), \
                 updated_at = now() \
             WHERE id = $1 AND municipality_id = $2 AND namespace = $3 \
             RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .bind(patch.description)
        .bind(patch.content)
        .bind(patch.expires)
        .bind(patch.acknowledged)
        .bind(patch.global_acknowledged)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    /// Marks every notification on the errand as seen by everyone.
    /// Returns the number of rows that changed.
    pub async fn global_acknowledge_errand(&self, scope: &Scope, errand_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET global_acknowledged = true, updated_at = now() \
             WHERE errand_id = $1 AND municipality_id = $2 AND namespace = $3 \
               AND global_acknowledged = false",
        )
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, scope: &Scope, notification_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE id = $1 AND municipality_id = $2 AND namespace = $3",
        )
        .bind(notification_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// The acting user raising an alert for themselves has already seen it.
fn is_self_notification(owner_id: Option<&str>, author: Option<&str>) -> bool {
    match (owner_id, author) {
        (Some(owner), Some(author)) => {
            !owner.trim().is_empty() && owner.trim().eq_ignore_ascii_case(author.trim())
        }
        _ => false,
    }
}

pub(crate) fn notification_from_row(row: &PgRow) -> Notification {
    Notification {
        id: row.get("id"),
        municipality_id: row.get("municipality_id"),
        namespace: row.get("namespace"),
        errand_id: row.get("errand_id"),
        owner_id: row.get("owner_id"),
        created_by: row.get("created_by"),
        notification_type: row.get("notification_type"),
        description: row.get("description"),
        content: row.get("content"),
        expires: row.get("expires"),
        acknowledged: row.get("acknowledged"),
        global_acknowledged: row.get("global_acknowledged"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
