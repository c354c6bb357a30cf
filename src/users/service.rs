use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::UserError;
use super::model::{NewUser, User, UserFilter};
use super::store::{StoreError, UserStore};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
/// Upper bound on page size; larger requests are clamped.
pub const MAX_PAGE_LIMIT: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter: UserFilter,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of matches plus the count of all matches.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub records: Vec<User>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Read and create operations over the user store.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<User, UserError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            warn!(%id, "get_by_id invalid_id");
            return Err(UserError::InvalidArgument("Invalid user id".into()));
        };

        let user = self.store.find_by_id(uuid).await.map_err(|e| {
            error!(error = %e, %id, "get_by_id failed");
            UserError::from(e)
        })?;

        match user {
            Some(user) => {
                info!(%id, "get_by_id ok");
                Ok(user)
            }
            None => {
                warn!(%id, "get_by_id not_found");
                Err(UserError::NotFound)
            }
        }
    }

    pub async fn list(&self, query: ListQuery) -> Result<UserPage, UserError> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_PAGE_LIMIT);
        if page == 0 || limit == 0 {
            return Err(UserError::InvalidArgument(
                "page and limit must be at least 1".into(),
            ));
        }
        if query.filter.contains_nul() {
            warn!("list rejected nul in filter");
            return Err(UserError::InvalidArgument(
                "filters must not contain NUL characters".into(),
            ));
        }
        let skip = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| UserError::InvalidArgument("page out of range".into()))?;

        let filter = &query.filter;
        // Independent reads; the count may see a slightly newer snapshot.
        let records = self.store.find(filter, skip, limit).await.map_err(|e| {
            error!(error = %e, page, limit, ?filter, "list find failed");
            UserError::from(e)
        })?;
        let total = self.store.count(filter).await.map_err(|e| {
            error!(error = %e, ?filter, "list count failed");
            UserError::from(e)
        })?;

        info!(
            page,
            limit,
            count = records.len(),
            total,
            name = filter.name.as_deref().unwrap_or(""),
            email = filter.email.as_deref().unwrap_or(""),
            phone = filter.phone.as_deref().unwrap_or(""),
            "list ok"
        );
        Ok(UserPage {
            records,
            total,
            page,
            limit,
        })
    }

    /// Inserts a validated user. Uniqueness is left to the store.
    pub async fn create(&self, input: NewUser) -> Result<User, UserError> {
        match self.store.insert(&input).await {
            Ok(created) => {
                info!(id = %created.id, name = %created.name, "create ok");
                Ok(created)
            }
            Err(StoreError::UniqueViolation { constraint }) => {
                warn!(
                    constraint = constraint.as_deref().unwrap_or("unknown"),
                    email = %input.email,
                    phone = %input.phone,
                    "create duplicate key"
                );
                Err(UserError::Conflict("Email or phone already exists".into()))
            }
            Err(e) => {
                error!(error = %e, email = %input.email, "create failed");
                Err(UserError::Internal(e))
            }
        }
    }
}
