//! Generic CRUD over user-owned sub-resources (skills, experience,
//! qualifications, certificates). One instantiation per resource type; each
//! handler is a single document-store round trip.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use super::ensure_owner;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{require_auth, AuthUser};
use crate::models::resume::{UserResource, USER_ID_FIELD};
use crate::store::{Collection, DocFilter};
use crate::AppState;

pub fn routes<R: UserResource>(state: AppState) -> Router<AppState> {
    use axum::routing::{post, put};

    let protected = Router::new()
        .route("/:userid", post(create::<R>))
        .route("/:userid/:id", put(replace::<R>).delete(remove::<R>))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/:userid", get(list::<R>))
        .route("/:userid/:id", get(get_one::<R>))
        .merge(protected)
}

fn collection<R: UserResource>(state: &AppState) -> Collection<R> {
    state.store.collection(R::COLLECTION)
}

fn by_user(user_id: &str) -> DocFilter {
    DocFilter::new().eq(USER_ID_FIELD, user_id)
}

fn by_user_and_id<R: UserResource>(user_id: &str, id: &str) -> DocFilter {
    by_user(user_id).eq(R::ID_FIELD, id)
}

async fn list<R: UserResource>(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<R>>> {
    let items = collection::<R>(&state).find_many(by_user(&user_id)).await?;
    Ok(Json(items))
}

async fn get_one<R: UserResource>(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
) -> ApiResult<Json<R>> {
    let item = collection::<R>(&state)
        .find_required(by_user_and_id::<R>(&user_id, &id), R::LABEL)
        .await?;
    Ok(Json(item))
}

/// Create with a server-assigned opaque id; the id is returned in the body.
async fn create<R: UserResource>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    WithRejection(Json(mut item), _): WithRejection<Json<R>, ApiError>,
) -> ApiResult<(StatusCode, Json<R>)> {
    ensure_owner(&user, &user_id)?;
    item.set_owner(&user_id);
    item.set_id(Uuid::new_v4().to_string());
    collection::<R>(&state).insert_one(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace with upsert semantics: creates the document when absent.
async fn replace<R: UserResource>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, id)): Path<(String, String)>,
    WithRejection(Json(mut item), _): WithRejection<Json<R>, ApiError>,
) -> ApiResult<Json<R>> {
    ensure_owner(&user, &user_id)?;
    item.set_owner(&user_id);
    item.set_id(id.clone());
    collection::<R>(&state)
        .upsert_one(by_user_and_id::<R>(&user_id, &id), &item)
        .await?;
    Ok(Json(item))
}

async fn remove<R: UserResource>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    ensure_owner(&user, &user_id)?;
    collection::<R>(&state)
        .delete_one(by_user_and_id::<R>(&user_id, &id))
        .await?;
    Ok(Json(json!({ "message": format!("{} deleted", R::LABEL) })))
}
