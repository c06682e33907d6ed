pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod images;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{ApiError, ApiResult};
use crate::images::ImageStore;
use crate::models::resume::{Certificate, Experience, Qualification, Skill};
use crate::store::Store;

/// Shared request context: the document store handle and the image backend,
/// both constructed once at startup and passed in explicitly.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub images: Arc<dyn ImageStore>,
}

/// Build the full router against a prepared state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", handlers::auth::routes())
        .nest("/api/v1/profile", handlers::profile::routes(state.clone()))
        .nest("/api/v1/skills", handlers::resource::routes::<Skill>(state.clone()))
        .nest(
            "/api/v1/experience",
            handlers::resource::routes::<Experience>(state.clone()),
        )
        .nest(
            "/api/v1/qualifications",
            handlers::resource::routes::<Qualification>(state.clone()),
        )
        .nest(
            "/api/v1/certificates",
            handlers::resource::routes::<Certificate>(state.clone()),
        )
        .nest("/api/v1/journal", handlers::journal::routes(state.clone()))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!("health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "database": "ok"
    })))
}

async fn not_found() -> ApiError {
    ApiError::not_found("NotFound")
}
