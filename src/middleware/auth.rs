use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use crate::auth;
use crate::config;
use crate::error::ApiError;
use crate::models::user::{self, User};
use crate::store::{collections, DocFilter};
use crate::AppState;

/// Authenticated user context resolved from the JWT cookie.
///
/// The credential only proves identity; ownership checks happen per handler
/// by filtering on the user id.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Middleware for routes that refuse anonymous callers. A missing or invalid
/// cookie, or a token whose user no longer exists, is a 401.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &jar)
        .await
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware for routes with a visibility split: any authentication failure
/// falls through as anonymous instead of rejecting the request.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = authenticate(&state, &jar).await {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

async fn authenticate(state: &AppState, jar: &CookieJar) -> Option<AuthUser> {
    let cookie = jar.get(&config::config().security.cookie_name)?;
    let claims = auth::validate_jwt(cookie.value()).ok()?;

    // The token must still resolve to a stored user
    let users = state.store.collection::<User>(collections::USERS);
    let found = users
        .find_one(DocFilter::new().eq(user::fields::ID, claims.sub.as_str()))
        .await
        .ok()??;

    Some(AuthUser {
        id: found.id,
        name: found.name,
        email: found.email,
    })
}
