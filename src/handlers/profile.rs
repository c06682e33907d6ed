//! Profile handlers: one document per user plus the image upload.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{middleware, Extension, Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};

use super::ensure_owner;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{require_auth, AuthUser};
use crate::models::profile::{fields, Profile};
use crate::store::{collections, Collection, DocFilter};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/:userid", put(put_profile).post(post_profile))
        .route("/:userid/image", put(put_image))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new().route("/:userid", get(get_profile)).merge(protected)
}

fn profiles(state: &AppState) -> Collection<Profile> {
    state.store.collection(collections::PROFILES)
}

fn by_user(user_id: &str) -> DocFilter {
    DocFilter::new().eq(fields::USER_ID, user_id)
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Profile>> {
    let profile = profiles(&state)
        .find_required(by_user(&user_id), "Profile")
        .await?;
    Ok(Json(profile))
}

async fn post_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    WithRejection(Json(mut profile), _): WithRejection<Json<Profile>, ApiError>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_owner(&user, &user_id)?;
    profile.user_id = user_id;
    profiles(&state).insert_one(&profile).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Profile created" }))))
}

async fn put_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    WithRejection(Json(mut profile), _): WithRejection<Json<Profile>, ApiError>,
) -> ApiResult<Json<Value>> {
    ensure_owner(&user, &user_id)?;
    profile.user_id = user_id.clone();
    profiles(&state).upsert_one(by_user(&user_id), &profile).await?;
    Ok(Json(json!({ "message": "Profile updated" })))
}

/// Multipart upload of the `profileImage` field. The stored URL is merged
/// into the profile document, creating it when absent.
async fn put_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    ensure_owner(&user, &user_id)?;

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Profile image not found"))?
    {
        if field.name() == Some("profileImage") {
            let filename = field.file_name().unwrap_or("image").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("Could not read image"))?;
            image = Some((filename, data));
            break;
        }
    }
    let (filename, data) = image.ok_or_else(|| ApiError::bad_request("Profile image not found"))?;

    let url = state.images.save_image(&user_id, &filename, data).await?;

    profiles(&state)
        .merge_upsert(
            by_user(&user_id),
            json!({ "user_id": user_id, "profile_img": url }),
        )
        .await?;

    Ok(Json(json!({ "profileImage": url })))
}
