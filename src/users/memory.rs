//! In-process user store for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{NewUser, User, UserFilter};
use super::store::{BulkInsertOutcome, StoreError, UniquenessPolicy, UserStore};

/// A [`UserFilter`] evaluated in Rust: the escaped name pattern through the
/// `regex` crate, case-insensitively, and exact email/phone comparison.
pub struct CompiledFilter<'a> {
    name: Option<Regex>,
    email: Option<&'a str>,
    phone: Option<&'a str>,
}

impl<'a> CompiledFilter<'a> {
    pub fn new(filter: &'a UserFilter) -> Self {
        let name = filter.name_pattern().and_then(|p| {
            RegexBuilder::new(&p)
                .case_insensitive(true)
                .build()
                .ok()
        });
        Self {
            name,
            email: filter.email(),
            phone: filter.phone(),
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.name.as_ref().map_or(true, |re| re.is_match(&user.name))
            && self.email.map_or(true, |e| user.email == e)
            && self.phone.map_or(true, |p| user.phone == p)
    }
}

#[derive(Default)]
struct Rows {
    users: Vec<User>,
    emails: HashSet<String>,
    phones: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Rows>,
    policy: UniquenessPolicy,
    unreachable: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryUserStore {
    pub fn new(policy: UniquenessPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Every subsequent call fails as if the database were down.
    pub fn set_unreachable(&self, down: bool) {
        self.unreachable.store(down, Ordering::SeqCst);
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<User> {
        self.rows.lock().unwrap().users.clone()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn conflict(&self, rows: &Rows, user: &NewUser) -> Option<&'static str> {
        if self.policy == UniquenessPolicy::Relaxed {
            None
        } else if rows.emails.contains(&user.email) {
            Some("users_email_key")
        } else if rows.phones.contains(&user.phone) {
            Some("users_phone_key")
        } else {
            None
        }
    }

    fn push(rows: &mut Rows, user: &NewUser) -> User {
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            birth_date: user.birth_date,
            created_at: now,
            updated_at: now,
        };
        rows.emails.insert(row.email.clone());
        rows.phones.insert(row.phone.clone());
        rows.users.push(row.clone());
        row
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn exists_any(&self) -> Result<bool, StoreError> {
        self.enter()?;
        Ok(!self.rows.lock().unwrap().users.is_empty())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.enter()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find(
        &self,
        filter: &UserFilter,
        skip: u64,
        take: u64,
    ) -> Result<Vec<User>, StoreError> {
        self.enter()?;
        let compiled = CompiledFilter::new(filter);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .users
            .iter()
            .filter(|u| compiled.matches(u))
            .skip(skip as usize)
            .take(take as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, StoreError> {
        self.enter()?;
        let compiled = CompiledFilter::new(filter);
        let rows = self.rows.lock().unwrap();
        Ok(rows.users.iter().filter(|u| compiled.matches(u)).count() as u64)
    }

    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(constraint) = self.conflict(&rows, user) {
            return Err(StoreError::UniqueViolation {
                constraint: Some(constraint.to_string()),
            });
        }
        Ok(Self::push(&mut rows, user))
    }

    async fn insert_many_unordered(
        &self,
        batch: &[NewUser],
    ) -> Result<BulkInsertOutcome, StoreError> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        let mut outcome = BulkInsertOutcome::default();
        for user in batch {
            if self.conflict(&rows, user).is_some() {
                outcome.skipped += 1;
            } else {
                Self::push(&mut rows, user);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn user(name: &str) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: "someone@example.com".into(),
            phone: "+380000000000".into(),
            birth_date: date!(1990 - 01 - 01),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn name_filter_is_literal_and_case_insensitive() {
        let f = UserFilter::by_name("a.*b");
        let compiled = CompiledFilter::new(&f);
        assert!(compiled.matches(&user("xxA.*Byy")));
        assert!(!compiled.matches(&user("aXXXb")));
    }

    #[test]
    fn empty_filter_matches_everyone() {
        let f = UserFilter {
            name: Some(String::new()),
            ..UserFilter::default()
        };
        assert!(CompiledFilter::new(&f).matches(&user("anyone")));
    }
}
