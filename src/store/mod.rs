pub mod collection;
pub mod filter;

pub use collection::Collection;
pub use filter::{DocFilter, FilterParam};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the document store layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Collection names. Tables are created from this list at startup and
/// nothing else ever reaches the SQL layer as an identifier.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROFILES: &str = "profiles";
    pub const SKILLS: &str = "skills";
    pub const EXPERIENCE: &str = "experience";
    pub const QUALIFICATIONS: &str = "qualifications";
    pub const CERTIFICATES: &str = "certificates";
    pub const JOURNAL: &str = "journal";

    pub const ALL: &[&str] = &[
        USERS,
        PROFILES,
        SKILLS,
        EXPERIENCE,
        QUALIFICATIONS,
        CERTIFICATES,
        JOURNAL,
    ];
}

/// Handle to the backing document store.
///
/// Constructed once in `main` and carried in the router state; handlers get
/// typed [`Collection`] handles from it instead of reaching for ambient
/// globals.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect eagerly and verify the database answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!("connected to document store");
        Ok(Self { pool })
    }

    /// Build a store around a lazy pool. No connection is attempted until
    /// the first query, which lets router tests run without a database.
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn collection<T>(&self, name: &'static str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Send + Unpin,
    {
        Collection::new(name, self.pool.clone())
    }

    /// Idempotent DDL: one JSONB table plus a containment index per
    /// collection.
    pub async fn ensure_collections(&self) -> Result<(), StoreError> {
        for name in collections::ALL {
            let table = format!("CREATE TABLE IF NOT EXISTS \"{}\" (doc JSONB NOT NULL)", name);
            sqlx::query(&table).execute(&self.pool).await?;

            let index = format!(
                "CREATE INDEX IF NOT EXISTS \"{n}_doc_idx\" ON \"{n}\" USING GIN (doc jsonb_path_ops)",
                n = name
            );
            sqlx::query(&index).execute(&self.pool).await?;
        }
        info!("ensured {} collections", collections::ALL.len());
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
