use axum::Router;

use crate::AppState;

mod context;
mod error;
mod handlers;
mod routes;

pub use context::{RequestContext, SENT_BY_HEADER};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::errands())
        .merge(routes::stakeholders())
        .merge(routes::notifications())
        .with_state(state)
}
