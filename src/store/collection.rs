use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use super::filter::{DocFilter, FilterParam};
use super::StoreError;

/// Typed handle onto one document collection (a single-JSONB-column table).
///
/// Documents are stored exactly as their serde serialization; filters match
/// against the same representation, so field names in filters are the JSON
/// names, not Rust ones.
pub struct Collection<T> {
    name: &'static str,
    pool: PgPool,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + Unpin,
{
    pub(super) fn new(name: &'static str, pool: PgPool) -> Self {
        Self {
            name,
            pool,
            _marker: std::marker::PhantomData,
        }
    }

    pub async fn find_one(&self, filter: DocFilter) -> Result<Option<T>, StoreError> {
        let (clause, params) = filter.to_sql(1);
        let sql = if clause.is_empty() {
            format!("SELECT doc FROM \"{}\" LIMIT 1", self.name)
        } else {
            format!("SELECT doc FROM \"{}\" WHERE {} LIMIT 1", self.name, clause)
        };

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for param in params {
            query = bind_scalar(query, param);
        }
        let row = query.fetch_optional(&self.pool).await?;
        row.map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .transpose()
    }

    /// Like [`find_one`](Self::find_one) but absence is an error.
    pub async fn find_required(&self, filter: DocFilter, what: &str) -> Result<T, StoreError> {
        self.find_one(filter)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{} not found", what)))
    }

    pub async fn find_many(&self, filter: DocFilter) -> Result<Vec<T>, StoreError> {
        let (clause, params) = filter.to_sql(1);
        let sql = if clause.is_empty() {
            format!("SELECT doc FROM \"{}\"", self.name)
        } else {
            format!("SELECT doc FROM \"{}\" WHERE {}", self.name, clause)
        };

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for param in params {
            query = bind_scalar(query, param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn insert_one(&self, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        let sql = format!("INSERT INTO \"{}\" (doc) VALUES ($1)", self.name);
        sqlx::query(&sql).bind(value).execute(&self.pool).await?;
        Ok(())
    }

    /// Replace the single document matching `filter` with `doc`. Returns the
    /// number of documents replaced (0 or 1). A zero return is the
    /// compare-and-set miss signal: the filter no longer matches anything.
    pub async fn replace_one(&self, filter: DocFilter, doc: &T) -> Result<u64, StoreError> {
        let value = serde_json::to_value(doc)?;
        let (clause, params) = filter.to_sql(2);
        let sql = format!(
            "UPDATE \"{n}\" SET doc = $1 WHERE ctid IN (SELECT ctid FROM \"{n}\" WHERE {c} LIMIT 1)",
            n = self.name,
            c = clause
        );

        let mut query = sqlx::query(&sql).bind(value);
        for param in params {
            query = bind_exec(query, param);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Replace-or-insert, keyed by `filter`.
    pub async fn upsert_one(&self, filter: DocFilter, doc: &T) -> Result<(), StoreError> {
        if self.replace_one(filter, doc).await? == 0 {
            self.insert_one(doc).await?;
        }
        Ok(())
    }

    /// Shallow-merge `patch` into the single matching document (JSONB `||`),
    /// the analogue of a targeted `$set` on top-level fields.
    pub async fn merge_one(&self, filter: DocFilter, patch: Value) -> Result<u64, StoreError> {
        let (clause, params) = filter.to_sql(2);
        let sql = format!(
            "UPDATE \"{n}\" SET doc = doc || $1 WHERE ctid IN (SELECT ctid FROM \"{n}\" WHERE {c} LIMIT 1)",
            n = self.name,
            c = clause
        );

        let mut query = sqlx::query(&sql).bind(patch);
        for param in params {
            query = bind_exec(query, param);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Merge-or-insert: when nothing matches, the patch itself becomes the
    /// new document.
    pub async fn merge_upsert(&self, filter: DocFilter, patch: Value) -> Result<(), StoreError> {
        if self.merge_one(filter, patch.clone()).await? == 0 {
            let sql = format!("INSERT INTO \"{}\" (doc) VALUES ($1)", self.name);
            sqlx::query(&sql).bind(patch).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Delete the single matching document. Returns the deleted count; a zero
    /// is not an error (callers decide whether absence matters).
    pub async fn delete_one(&self, filter: DocFilter) -> Result<u64, StoreError> {
        let (clause, params) = filter.to_sql(1);
        let sql = format!(
            "DELETE FROM \"{n}\" WHERE ctid IN (SELECT ctid FROM \"{n}\" WHERE {c} LIMIT 1)",
            n = self.name,
            c = clause
        );

        let mut query = sqlx::query(&sql);
        for param in params {
            query = bind_exec(query, param);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn bind_scalar<'q>(
    query: sqlx::query::QueryScalar<'q, sqlx::Postgres, Value, sqlx::postgres::PgArguments>,
    param: FilterParam,
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, Value, sqlx::postgres::PgArguments> {
    match param {
        FilterParam::Json(v) => query.bind(v),
        FilterParam::Text(s) => query.bind(s),
    }
}

fn bind_exec<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    param: FilterParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match param {
        FilterParam::Json(v) => query.bind(v),
        FilterParam::Text(s) => query.bind(s),
    }
}
