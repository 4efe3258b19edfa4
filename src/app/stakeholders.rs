use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::scope::Scope;
use crate::domain::stakeholder::{Stakeholder, StakeholderType};
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub struct NewStakeholder {
    pub stakeholder_type: StakeholderType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Clone)]
pub struct StakeholderService {
    db: Db,
}

impl StakeholderService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Returns `None` when the errand does not exist in the scope.
    pub async fn add(
        &self,
        scope: &Scope,
        errand_id: Uuid,
        stakeholder: NewStakeholder,
    ) -> Result<Option<Stakeholder>> {
        let row = sqlx::query(
            "INSERT INTO stakeholders \
                (errand_id, stakeholder_type, first_name, last_name, organization_name, roles) \
             SELECT e.id, $4, $5, $6, $7, $8 \
             FROM errands e \
             WHERE e.id = $1 AND e.municipality_id = $2 AND e.namespace = $3 \
             RETURNING id, errand_id, stakeholder_type, first_name, last_name, \
                       organization_name, roles, created_at",
        )
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .bind(stakeholder.stakeholder_type.as_db())
        .bind(stakeholder.first_name)
        .bind(stakeholder.last_name)
        .bind(stakeholder.organization_name)
        .bind(stakeholder.roles)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(stakeholder_from_row).transpose()
    }

    pub async fn list(&self, scope: &Scope, errand_id: Uuid) -> Result<Vec<Stakeholder>> {
        let rows = sqlx::query(
            "SELECT s.id, s.errand_id, s.stakeholder_type, s.first_name, s.last_name, \
                    s.organization_name, s.roles, s.created_at \
             FROM stakeholders s \
             JOIN errands e ON e.id = s.errand_id \
             WHERE s.errand_id = $1 AND e.municipality_id = $2 AND e.namespace = $3 \
             ORDER BY s.created_at ASC, s.id ASC",
        )
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(stakeholder_from_row).collect()
    }

    pub async fn get(
        &self,
        scope: &Scope,
        errand_id: Uuid,
        stakeholder_id: Uuid,
    ) -> Result<Option<Stakeholder>> {
        let row = sqlx::query(
            "SELECT s.id, s.errand_id, s.stakeholder_type, s.first_name, s.last_name, \
                    s.organization_name, s.roles, s.created_at \
             FROM stakeholders s \
             JOIN errands e ON e.id = s.errand_id \
             WHERE s.id = $1 AND s.errand_id = $2 \
               AND e.municipality_id = $3 AND e.namespace = $4",
        )
        .bind(stakeholder_id)
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(stakeholder_from_row).transpose()
    }

    pub async fn remove(&self, scope: &Scope, errand_id: Uuid, stakeholder_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM stakeholders s \
             USING errands e \
             WHERE s.id = $1 AND s.errand_id = $2 AND e.id = s.errand_id \
               AND e.municipality_id = $3 AND e.namespace = $4",
        )
        .bind(stakeholder_id)
        .bind(errand_id)
        .bind(&scope.municipality_id)
        .bind(&scope.namespace)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn stakeholder_from_row(row: &PgRow) -> Result<Stakeholder> {
    let stakeholder_type: String = row.get("stakeholder_type");
    let stakeholder_type = StakeholderType::from_db(&stakeholder_type)
        .ok_or_else(|| anyhow!("unknown stakeholder type: {}", stakeholder_type))?;

    Ok(Stakeholder {
        id: row.get("id"),
        errand_id: row.get("errand_id"),
        stakeholder_type,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        organization_name: row.get("organization_name"),
        roles: row.get("roles"),
        created_at: row.get("created_at"),
    })
}
