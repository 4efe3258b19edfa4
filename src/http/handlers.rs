use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::errands::{ErrandPatch, ErrandService, NewErrand};
use crate::app::notifications::{NewNotification, NotificationPatch, NotificationService};
use crate::app::stakeholders::{NewStakeholder, StakeholderService};
use crate::domain::errand::{Errand, Priority};
use crate::domain::notification::Notification;
use crate::domain::scope::Scope;
use crate::domain::stakeholder::{Stakeholder, StakeholderType};
use crate::http::{AppError, RequestContext};
use crate::AppState;

const MAX_TITLE_LEN: usize = 255;
const MAX_TEXT_LEN: usize = 8192;
const MAX_NAME_LEN: usize = 255;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct ScopePath {
    pub municipality_id: String,
    pub namespace: String,
}

#[derive(Deserialize)]
pub struct ErrandPath {
    pub municipality_id: String,
    pub namespace: String,
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct StakeholderPath {
    pub municipality_id: String,
    pub namespace: String,
    pub id: Uuid,
    pub stakeholder_id: Uuid,
}

fn scope_of(municipality_id: &str, namespace: &str) -> Result<Scope, AppError> {
    Scope::parse(municipality_id, namespace)
        .ok_or_else(|| AppError::bad_request("invalid municipality_id or namespace"))
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn require_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{} is required", field)));
    }
    limit_text(field, value, max)
}

fn limit_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::bad_request(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Errands
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateErrandRequest {
    pub title: String,
    pub description: Option<String>,
    pub case_type: String,
    pub status: Option<String>,
    pub priority: Option<Priority>,
}

pub async fn create_errand(
    ctx: RequestContext,
    Path(path): Path<ScopePath>,
    State(state): State<AppState>,
    Json(payload): Json<CreateErrandRequest>,
) -> Result<Json<Errand>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    require_text("title", &payload.title, MAX_TITLE_LEN)?;
    require_text("case_type", &payload.case_type, MAX_NAME_LEN)?;
    if let Some(description) = &payload.description {
        limit_text("description", description, MAX_TEXT_LEN)?;
    }
    if let Some(status) = &payload.status {
        require_text("status", status, MAX_NAME_LEN)?;
    }

    let service = ErrandService::new(state.db.clone());
    let errand = service
        .create(
            &scope,
            NewErrand {
                title: payload.title.trim().to_string(),
                description: payload.description,
                case_type: payload.case_type.trim().to_string(),
                status: payload.status.map(|s| s.trim().to_string()),
                priority: payload.priority,
            },
            ctx.author(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, namespace = %scope.namespace, "failed to create errand");
            AppError::internal("failed to create errand")
        })?;

    tracing::info!(errand_id = %errand.id, errand_number = %errand.errand_number, "errand created");
    Ok(Json(errand))
}

pub async fn list_errands(
    Path(path): Path<ScopePath>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Errand>>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let limit = query.limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    let cursor = parse_cursor(query.cursor)?;

    let service = ErrandService::new(state.db.clone());
    let mut errands = service
        .list(&scope, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, namespace = %scope.namespace, "failed to list errands");
            AppError::internal("failed to list errands")
        })?;

    let next_cursor = if errands.len() > limit as usize {
        errands.truncate(limit as usize);
        errands.last().map(|last| (last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: errands,
        next_cursor: encode_cursor(next_cursor),
    }))
}

pub async fn get_errand(
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
) -> Result<Json<Errand>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let service = ErrandService::new(state.db.clone());
    let errand = service.get(&scope, path.id).await.map_err(|err| {
        tracing::error!(error = ?err, errand_id = %path.id, "failed to get errand");
        AppError::internal("failed to get errand")
    })?;

    errand
        .map(Json)
        .ok_or_else(|| AppError::not_found("errand not found"))
}

#[derive(Deserialize)]
pub struct UpdateErrandRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
}

pub async fn update_errand(
    ctx: RequestContext,
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateErrandRequest>,
) -> Result<Json<Errand>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    if let Some(title) = &payload.title {
        require_text("title", title, MAX_TITLE_LEN)?;
    }
    if let Some(description) = &payload.description {
        limit_text("description", description, MAX_TEXT_LEN)?;
    }
    if let Some(status) = &payload.status {
        require_text("status", status, MAX_NAME_LEN)?;
    }

    let service = ErrandService::new(state.db.clone());
    let errand = service
        .update(
            &scope,
            path.id,
            ErrandPatch {
                title: payload.title.map(|t| t.trim().to_string()),
                description: payload.description,
                status: payload.status.map(|s| s.trim().to_string()),
                priority: payload.priority,
            },
            ctx.author(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %path.id, "failed to update errand");
            AppError::internal("failed to update errand")
        })?;

    errand
        .map(Json)
        .ok_or_else(|| AppError::not_found("errand not found"))
}

pub async fn delete_errand(
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let service = ErrandService::new(state.db.clone());
    let deleted = service.delete(&scope, path.id).await.map_err(|err| {
        tracing::error!(error = ?err, errand_id = %path.id, "failed to delete errand");
        AppError::internal("failed to delete errand")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("errand not found"))
    }
}

// ---------------------------------------------------------------------------
// Stakeholders
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateStakeholderRequest {
    #[serde(rename = "type")]
    pub stakeholder_type: StakeholderType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn add_stakeholder(
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
    Json(payload): Json<CreateStakeholderRequest>,
) -> Result<Json<Stakeholder>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let first_name = non_blank(payload.first_name);
    let last_name = non_blank(payload.last_name);
    let organization_name = non_blank(payload.organization_name);

    for (field, value) in [
        ("first_name", &first_name),
        ("last_name", &last_name),
        ("organization_name", &organization_name),
    ] {
        if let Some(value) = value {
            limit_text(field, value, MAX_NAME_LEN)?;
        }
    }
    match payload.stakeholder_type {
        StakeholderType::Person if first_name.is_none() && last_name.is_none() => {
            return Err(AppError::bad_request(
                "person stakeholder requires first_name or last_name",
            ));
        }
        StakeholderType::Organization if organization_name.is_none() => {
            return Err(AppError::bad_request(
                "organization stakeholder requires organization_name",
            ));
        }
        _ => {}
    }
    let roles: Vec<String> = payload
        .roles
        .into_iter()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .collect();

    let service = StakeholderService::new(state.db.clone());
    let stakeholder = service
        .add(
            &scope,
            path.id,
            NewStakeholder {
                stakeholder_type: payload.stakeholder_type,
                first_name,
                last_name,
                organization_name,
                roles,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %path.id, "failed to add stakeholder");
            AppError::internal("failed to add stakeholder")
        })?;

    stakeholder
        .map(Json)
        .ok_or_else(|| AppError::not_found("errand not found"))
}

pub async fn list_stakeholders(
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Stakeholder>>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let errands = ErrandService::new(state.db.clone());
    let exists = errands.exists(&scope, path.id).await.map_err(|err| {
        tracing::error!(error = ?err, errand_id = %path.id, "failed to check errand");
        AppError::internal("failed to list stakeholders")
    })?;
    if !exists {
        return Err(AppError::not_found("errand not found"));
    }

    let service = StakeholderService::new(state.db.clone());
    let stakeholders = service.list(&scope, path.id).await.map_err(|err| {
        tracing::error!(error = ?err, errand_id = %path.id, "failed to list stakeholders");
        AppError::internal("failed to list stakeholders")
    })?;

    Ok(Json(stakeholders))
}

pub async fn get_stakeholder(
    Path(path): Path<StakeholderPath>,
    State(state): State<AppState>,
) -> Result<Json<Stakeholder>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let service = StakeholderService::new(state.db.clone());
    let stakeholder = service
        .get(&scope, path.id, path.stakeholder_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, stakeholder_id = %path.stakeholder_id, "failed to get stakeholder");
            AppError::internal("failed to get stakeholder")
        })?;

    stakeholder
        .map(Json)
        .ok_or_else(|| AppError::not_found("stakeholder not found"))
}

pub async fn delete_stakeholder(
    Path(path): Path<StakeholderPath>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let service = StakeholderService::new(state.db.clone());
    let removed = service
        .remove(&scope, path.id, path.stakeholder_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, stakeholder_id = %path.stakeholder_id, "failed to delete stakeholder");
            AppError::internal("failed to delete stakeholder")
        })?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("stakeholder not found"))
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

fn notification_service(state: &AppState) -> NotificationService {
    NotificationService::new(state.db.clone(), state.notification_ttl_days)
}

#[derive(Deserialize)]
pub struct CreateNotificationRequest {
    pub errand_id: Uuid,
    pub owner_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub description: String,
    pub content: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
    pub acknowledged: Option<bool>,
}

pub async fn create_notification(
    ctx: RequestContext,
    Path(path): Path<ScopePath>,
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<Json<Notification>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    require_text("type", &payload.notification_type, MAX_NAME_LEN)?;
    require_text("description", &payload.description, MAX_TITLE_LEN)?;
    if let Some(content) = &payload.content {
        limit_text("content", content, MAX_TEXT_LEN)?;
    }
    if let Some(owner_id) = &payload.owner_id {
        limit_text("owner_id", owner_id, MAX_NAME_LEN)?;
    }

    let errand_id = payload.errand_id;
    let notification = notification_service(&state)
        .create(
            &scope,
            NewNotification {
                errand_id,
                owner_id: payload.owner_id.map(|o| o.trim().to_string()),
                notification_type: payload.notification_type.trim().to_string(),
                description: payload.description.trim().to_string(),
                content: payload.content,
                expires: payload.expires,
                acknowledged: payload.acknowledged,
            },
            ctx.author(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %errand_id, "failed to create notification");
            AppError::internal("failed to create notification")
        })?;

    notification
        .map(Json)
        .ok_or_else(|| AppError::not_found("errand not found"))
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

pub async fn list_notifications(
    Path(path): Path<ScopePath>,
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let owner_id = non_blank(query.owner_id)
        .ok_or_else(|| AppError::bad_request("owner_id is required"))?;

    let notifications = notification_service(&state)
        .list_for_owner(&scope, &owner_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, owner_id = %owner_id, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;

    Ok(Json(notifications))
}

pub async fn list_errand_notifications(
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let exists = ErrandService::new(state.db.clone())
        .exists(&scope, path.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %path.id, "failed to check errand");
            AppError::internal("failed to list notifications")
        })?;
    if !exists {
        return Err(AppError::not_found("errand not found"));
    }

    let notifications = notification_service(&state)
        .list_for_errand(&scope, path.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %path.id, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;

    Ok(Json(notifications))
}

pub async fn global_acknowledge_errand_notifications(
    Path(path): Path<ErrandPath>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let exists = ErrandService::new(state.db.clone())
        .exists(&scope, path.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %path.id, "failed to check errand");
            AppError::internal("failed to acknowledge notifications")
        })?;
    if !exists {
        return Err(AppError::not_found("errand not found"));
    }

    let updated = notification_service(&state)
        .global_acknowledge_errand(&scope, path.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, errand_id = %path.id, "failed to acknowledge notifications");
            AppError::internal("failed to acknowledge notifications")
        })?;

    tracing::debug!(errand_id = %path.id, updated, "notifications globally acknowledged");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct NotificationPath {
    pub municipality_id: String,
    pub namespace: String,
    pub id: Uuid,
}

pub async fn get_notification(
    Path(path): Path<NotificationPath>,
    State(state): State<AppState>,
) -> Result<Json<Notification>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let notification = notification_service(&state)
        .get(&scope, path.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, notification_id = %path.id, "failed to get notification");
            AppError::internal("failed to get notification")
        })?;

    notification
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification not found"))
}

#[derive(Deserialize)]
pub struct UpdateNotificationRequest {
    pub description: Option<String>,
    pub content: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
    pub acknowledged: Option<bool>,
    pub global_acknowledged: Option<bool>,
}

pub async fn update_notification(
    Path(path): Path<NotificationPath>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateNotificationRequest>,
) -> Result<Json<Notification>, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    if let Some(description) = &payload.description {
        require_text("description", description, MAX_TITLE_LEN)?;
    }
    if let Some(content) = &payload.content {
        limit_text("content", content, MAX_TEXT_LEN)?;
    }

    let notification = notification_service(&state)
        .update(
            &scope,
            path.id,
            NotificationPatch {
                description: payload.description.map(|d| d.trim().to_string()),
                content: payload.content,
                expires: payload.expires,
                acknowledged: payload.acknowledged,
                global_acknowledged: payload.global_acknowledged,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, notification_id = %path.id, "failed to update notification");
            AppError::internal("failed to update notification")
        })?;

    notification
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification not found"))
}

pub async fn delete_notification(
    Path(path): Path<NotificationPath>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let scope = scope_of(&path.municipality_id, &path.namespace)?;
    let deleted = notification_service(&state)
        .delete(&scope, path.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, notification_id = %path.id, "failed to delete notification");
            AppError::internal("failed to delete notification")
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("notification not found"))
    }
}
