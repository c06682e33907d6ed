//! Registration, login and logout. The JWT travels in an HttpOnly cookie;
//! login also returns it in the body for non-browser clients.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::config;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{self, LoginRequest, RegisterRequest, User};
use crate::store::{collections, DocFilter};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let users = state.store.collection::<User>(collections::USERS);

    let existing = users
        .find_one(DocFilter::new().eq(user::fields::EMAIL, req.email.as_str()))
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password = auth::hash_password(&req.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal("Could not hash password")
    })?;

    let new_user = User {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        email: req.email,
        password,
    };
    users.insert_one(&new_user).await?;

    Ok((StatusCode::CREATED, Json(json!({ "message": "User created" }))))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let users = state.store.collection::<User>(collections::USERS);

    // Same message for unknown email and wrong password
    let found = users
        .find_one(DocFilter::new().eq(user::fields::EMAIL, req.email.as_str()))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;
    if !auth::verify_password(&req.password, &found.password) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = auth::generate_jwt(&Claims::new(&found.id)).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal("Could not create session")
    })?;

    let cookie = Cookie::build((config::config().security.cookie_name.clone(), token.clone()))
        .path("/")
        .http_only(true)
        .build();

    Ok((jar.add(cookie), Json(json!({ "token": token }))))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let mut cookie = Cookie::from(config::config().security.cookie_name.clone());
    cookie.set_path("/");
    (jar.remove(cookie), Json(json!({ "message": "Logged out" })))
}
