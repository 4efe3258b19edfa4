use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::errand::{format_errand_number, Errand, Priority, DEFAULT_STATUS};
use crate::domain::scope::Scope;
use crate::infra::db::Db;

const ERRAND_COLUMNS: &str = "id, municipality_id, namespace, errand_number, title, description, \
     case_type, status, priority, created_by, updated_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewErrand {
    pub title: String,
    pub description: Option<String>,
    pub case_type: String,
    pub status: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default)]
pub struct ErrandPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Clone)]
pub struct ErrandService {
    db: Db,
}

impl ErrandService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, scope: &Scope, errand: NewErrand, author: Option<&str>) -> Result<Errand> {
        let sequence: i64 = sqlx::query_scalar("SELECT nextval('errand_number_seq')")
            .fetch_one(self.db.pool())
            .await?;
        let errand_number =
            format_errand_number(&scope.namespace, OffsetDateTime::now_utc().year(), sequence);

        let row = sqlx::query(&format!(
            "INSERT INTO errands \
                (municipality_id, namespace, errand_number, title, description, case_type, \
                 status, priority, created_by, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {}",
            ERRAND_COLUMNS
        ))
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .bind(&errand_number)
        .bind(errand.title)
        .bind(errand.description)
        .bind(errand.case_type)
        .bind(errand.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()))
        .bind(errand.priority.unwrap_or_default().as_db())
        .bind(author)
        .fetch_one(self.db.pool())
        .await?;

        errand_from_row(&row)
    }

    pub async fn get(&self, scope: &Scope, errand_id: Uuid) -> Result<Option<Errand>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM errands \
             WHERE id = $1 AND municipality_id = $2 AND namespace = $3",
            ERRAND_COLUMNS
        ))
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(errand_from_row).transpose()
    }

    pub async fn exists(&self, scope: &Scope, errand_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM errands \
             WHERE id = $1 AND municipality_id = $2 AND namespace = $3)",
        )
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_one(self.db.pool())
        .await?;

        Ok(exists)
    }

    pub async fn list(
        &self,
        scope: &Scope,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Errand>> {
        let rows = match cursor {
            Some((created_at, errand_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM errands \
                     WHERE municipality_id = $1 AND namespace = $2 \
                       AND (created_at < $3 OR (created_at = $3 AND id < $4)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $5",
                    ERRAND_COLUMNS
                ))
                .bind(&scope.municipality_id)
                .bind(&scope.namespace)
                .bind(created_at)
                .bind(errand_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM errands \
                     WHERE municipality_id = $1 AND namespace = $2 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3",
                    ERRAND_COLUMNS
                ))
                .bind(&scope.municipality_id)
                .bind(&scope.namespace)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(errand_from_row).collect()
    }

    pub async fn update(
        &self,
        scope: &Scope,
        errand_id: Uuid,
        patch: ErrandPatch,
        author: Option<&str>,
    ) -> Result<Option<Errand>> {
        let row = sqlx::query(&format!(
            "UPDATE errands \
             SET title = COALESCE($4, title), \
                 description = COALESCE($5, description), \
                 status = COALESCE($6, status), \
                 priority = COALESCE($7, priority), \
                 updated_by = $8, \
                 updated_at = now() \
             WHERE id = $1 AND municipality_id = $2 AND namespace = $3 \
             RETURNING {}",
            ERRAND_COLUMNS
        ))
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.status)
        .bind(patch.priority.map(|p| p.as_db()))
        .bind(author)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(errand_from_row).transpose()
    }

    /// Stakeholders and notifications go with the errand (ON DELETE CASCADE).
    pub async fn delete(&self, scope: &Scope, errand_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM errands WHERE id = $1 AND municipality_id = $2 AND namespace = $3",
        )
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn errand_from_row(row: &PgRow) -> Result<Errand> {
    let priority: String = row.get("priority");
    let priority =
        Priority::from_db(&priority).ok_or_else(|| anyhow!("unknown errand priority: {}", priority))?;

    Ok(Errand {
        id: row.get("id"),
        municipality_id: row.get("municipality_id"),
        namespace: row.get("namespace"),
        errand_number: row.get("errand_number"),
        title: row.get("title"),
        description: row.get("description"),
        case_type: row.get("case_type"),
        status: row.get("status"),
        priority,
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
