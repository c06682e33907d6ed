pub mod auth;
pub mod journal;
pub mod profile;
pub mod resource;

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Mutating sub-resource routes are owner-only: the authenticated identity
/// must match the `userid` path segment.
pub(crate) fn ensure_owner(user: &AuthUser, user_id: &str) -> Result<(), ApiError> {
    if user.id != user_id {
        return Err(ApiError::unauthorized("Not authorized"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_check_compares_identity_to_path() {
        let user = AuthUser {
            id: "u1".to_string(),
            name: "A".to_string(),
            email: "a@example.com".to_string(),
        };
        assert!(ensure_owner(&user, "u1").is_ok());
        assert!(ensure_owner(&user, "u2").is_err());
    }
}
