//! Journal HTTP surface. Each handler shapes input, calls one
//! `JournalService` operation and serializes the result.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{middleware, Extension, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{optional_auth, require_auth, AuthUser};
use crate::models::journal::{Entry, EntryDraft, JournalEntry, JournalMeta};
use crate::services::journal::{JournalService, PublicListingQuery};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create))
        .route("/:journalid", put(append).delete(remove))
        .route("/:journalid/version", put(set_version))
        .route("/:journalid/status", put(set_status))
        .route("/:journalid/process", put(process))
        .route("/:journalid/versions", get(versions))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let split_visibility = Router::new()
        .route("/:journalid", get(get_one))
        .route_layer(middleware::from_fn_with_state(state, optional_auth));

    Router::new()
        .route("/", get(list_public))
        .route("/u/:userid", get(list_for_user))
        .route("/:journalid/meta", get(meta))
        .merge(protected)
        .merge(split_visibility)
}

#[derive(Debug, Deserialize)]
struct VersionRequest {
    version: u32,
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: String,
}

async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(draft), _): WithRejection<Json<EntryDraft>, ApiError>,
) -> ApiResult<(StatusCode, Json<JournalEntry>)> {
    let journal = JournalService::new(&state.store).create(&user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(journal)))
}

async fn append(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(journal_id): Path<String>,
    WithRejection(Json(draft), _): WithRejection<Json<EntryDraft>, ApiError>,
) -> ApiResult<Json<JournalEntry>> {
    let journal = JournalService::new(&state.store)
        .append(&journal_id, &user.id, draft)
        .await?;
    Ok(Json(journal))
}

async fn set_version(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(journal_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<VersionRequest>, ApiError>,
) -> ApiResult<Json<JournalEntry>> {
    let journal = JournalService::new(&state.store)
        .set_current_version(&journal_id, &user.id, req.version)
        .await?;
    Ok(Json(journal))
}

async fn set_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(journal_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<StatusRequest>, ApiError>,
) -> ApiResult<Json<Value>> {
    JournalService::new(&state.store)
        .set_status(&journal_id, &user.id, &req.status)
        .await?;
    Ok(Json(json!({ "message": "Journal status updated" })))
}

async fn process(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(journal_id): Path<String>,
) -> ApiResult<Json<Value>> {
    JournalService::new(&state.store)
        .mark_processing(&journal_id, &user.id)
        .await?;
    Ok(Json(json!({ "message": "Journal entry is being processed" })))
}

/// Visibility split: authenticated readers get the full history,
/// anonymous readers a reduced single-entry projection.
async fn get_one(
    State(state): State<AppState>,
    Path(journal_id): Path<String>,
    user: Option<Extension<AuthUser>>,
) -> ApiResult<Response> {
    let journal = JournalService::new(&state.store).get(&journal_id).await?;
    Ok(match user {
        Some(_) => Json(journal.owner_view()).into_response(),
        None => Json(journal.public_view()).into_response(),
    })
}

async fn meta(
    State(state): State<AppState>,
    Path(journal_id): Path<String>,
) -> ApiResult<Json<JournalMeta>> {
    let journal = JournalService::new(&state.store).get(&journal_id).await?;
    Ok(Json(journal.meta()))
}

async fn versions(
    State(state): State<AppState>,
    Path(journal_id): Path<String>,
) -> ApiResult<Json<Vec<Entry>>> {
    let journal = JournalService::new(&state.store).get(&journal_id).await?;
    Ok(Json(journal.entries))
}

async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PublicListingQuery>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let journals = JournalService::new(&state.store).list_public(&query).await?;
    Ok(Json(journals))
}

async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let journals = JournalService::new(&state.store).list_for_user(&user_id).await?;
    Ok(Json(journals))
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(journal_id): Path<String>,
) -> ApiResult<Json<Value>> {
    JournalService::new(&state.store)
        .delete(&journal_id, &user.id)
        .await?;
    Ok(Json(json!({ "message": "Journal entry deleted" })))
}
