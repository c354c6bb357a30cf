use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::model::{NewUser, User, UserFilter};

/// Whether `email` and `phone` carry unique indexes in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniquenessPolicy {
    #[default]
    Enforced,
    Relaxed,
}

#[derive(Debug, Error)]
#[error("unknown uniqueness policy {0:?}, expected \"enforced\" or \"relaxed\"")]
pub struct UnknownPolicy(String);

impl FromStr for UniquenessPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforced" => Ok(Self::Enforced),
            "relaxed" => Ok(Self::Relaxed),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated ({})", .constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db.constraint().map(str::to_string),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Result of an unordered bulk insert: rows that conflicted with existing
/// data are skipped rather than failing the whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    pub inserted: u64,
    pub skipped: u64,
}

/// The document collection holding user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Cheap existence check; must not scan the whole table.
    async fn exists_any(&self) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Matching records ordered by creation, skipping `skip` and returning at most `take`.
    async fn find(&self, filter: &UserFilter, skip: u64, take: u64)
        -> Result<Vec<User>, StoreError>;

    async fn count(&self, filter: &UserFilter) -> Result<u64, StoreError>;

    async fn insert(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn insert_many_unordered(&self, batch: &[NewUser])
        -> Result<BulkInsertOutcome, StoreError>;
}
