//! Resume sub-resources: skills, experience, qualifications, certificates.
//!
//! These are uniform user-owned CRUD collections; the [`UserResource`] trait
//! is what the generic handlers in `handlers::resource` are written against.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const USER_ID_FIELD: &str = "user_id";

/// A document owned by a user and addressed by an opaque per-resource id.
pub trait UserResource: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Store collection the resource lives in
    const COLLECTION: &'static str;
    /// JSON name of the resource id field
    const ID_FIELD: &'static str;
    /// Label used in error messages ("Skill not found")
    const LABEL: &'static str;

    fn set_owner(&mut self, user_id: &str);
    fn set_id(&mut self, id: String);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub skill_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub proficiency_level: String,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub last_used: String,
    #[serde(default)]
    pub description: String,
}

impl UserResource for Skill {
    const COLLECTION: &'static str = crate::store::collections::SKILLS;
    const ID_FIELD: &'static str = "skill_id";
    const LABEL: &'static str = "Skill";

    fn set_owner(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
    }

    fn set_id(&mut self, id: String) {
        self.skill_id = id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub experience_id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
}

impl UserResource for Experience {
    const COLLECTION: &'static str = crate::store::collections::EXPERIENCE;
    const ID_FIELD: &'static str = "experience_id";
    const LABEL: &'static str = "Experience";

    fn set_owner(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
    }

    fn set_id(&mut self, id: String) {
        self.experience_id = id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qualification {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub qualification_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub description: String,
}

impl UserResource for Qualification {
    const COLLECTION: &'static str = crate::store::collections::QUALIFICATIONS;
    const ID_FIELD: &'static str = "qualification_id";
    const LABEL: &'static str = "Qualification";

    fn set_owner(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
    }

    fn set_id(&mut self, id: String) {
        self.qualification_id = id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub certificate_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub description: String,
}

impl UserResource for Certificate {
    const COLLECTION: &'static str = crate::store::collections::CERTIFICATES;
    const ID_FIELD: &'static str = "certificate_id";
    const LABEL: &'static str = "Certificate";

    fn set_owner(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
    }

    fn set_id(&mut self, id: String) {
        self.certificate_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_map_to_distinct_collections() {
        let names = [
            Skill::COLLECTION,
            Experience::COLLECTION,
            Qualification::COLLECTION,
            Certificate::COLLECTION,
        ];
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn partial_bodies_bind_with_defaults() {
        let skill: Skill = serde_json::from_value(serde_json::json!({
            "name": "Rust"
        }))
        .unwrap();
        assert_eq!(skill.name, "Rust");
        assert!(skill.skill_id.is_empty());
        assert!(skill.user_id.is_empty());
    }
}
