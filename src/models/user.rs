use serde::{Deserialize, Serialize};

/// A registered user. The password field holds the argon2 hash, never the
/// plaintext; this type is never serialized into a response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// JSON field names used in store filters.
pub mod fields {
    pub const ID: &str = "id";
    pub const EMAIL: &str = "email";
}

/// Request body for POST /auth/register
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
