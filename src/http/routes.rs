use axum::{routing::delete, routing::get, routing::patch, routing::post, routing::put, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn errands() -> Router<AppState> {
    Router::new()
        .route(
            "/:municipality_id/:namespace/errands",
            post(handlers::create_errand),
        )
        .route(
            "/:municipality_id/:namespace/errands",
            get(handlers::list_errands),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id",
            get(handlers::get_errand),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id",
            patch(handlers::update_errand),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id",
            delete(handlers::delete_errand),
        )
}

pub fn stakeholders() -> Router<AppState> {
    Router::new()
        .route(
            "/:municipality_id/:namespace/errands/:id/stakeholders",
            post(handlers::add_stakeholder),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id/stakeholders",
            get(handlers::list_stakeholders),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id/stakeholders/:stakeholder_id",
            get(handlers::get_stakeholder),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id/stakeholders/:stakeholder_id",
            delete(handlers::delete_stakeholder),
        )
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route(
            "/:municipality_id/:namespace/errands/:id/notifications",
            get(handlers::list_errand_notifications),
        )
        .route(
            "/:municipality_id/:namespace/errands/:id/notifications/global-acknowledged",
            put(handlers::global_acknowledge_errand_notifications),
        )
        .route(
            "/:municipality_id/:namespace/notifications",
            post(handlers::create_notification),
        )
        .route(
            "/:municipality_id/:namespace/notifications",
            get(handlers::list_notifications),
        )
        .route(
            "/:municipality_id/:namespace/notifications/:id",
            get(handlers::get_notification),
        )
        .route(
            "/:municipality_id/:namespace/notifications/:id",
            patch(handlers::update_notification),
        )
        .route(
            "/:municipality_id/:namespace/notifications/:id",
            delete(handlers::delete_notification),
        )
}
