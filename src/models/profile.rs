use serde::{Deserialize, Serialize};

/// A user's profile. One document per user, keyed by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub number: Option<String>,
    pub bio: Option<String>,
    pub profile_img: Option<String>,
    pub interests: Option<String>,
    pub domain: Option<String>,
}

pub mod fields {
    pub const USER_ID: &str = "user_id";
    pub const PROFILE_IMG: &str = "profile_img";
}
