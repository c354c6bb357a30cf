use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// User record as stored in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert shape; id and timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
}

/// Optional list filters, AND-combined.
///
/// `name` is a case-insensitive literal substring match; `email` and `phone`
/// are exact. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UserFilter {
    #[cfg(test)]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Name filter as a regex with every metacharacter escaped.
    pub fn name_pattern(&self) -> Option<String> {
        non_empty(&self.name).map(regex::escape)
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(&self.email)
    }

    pub fn phone(&self) -> Option<&str> {
        non_empty(&self.phone)
    }

    /// Postgres text cannot hold NUL, so such filters can never match.
    pub fn contains_nul(&self) -> bool {
        [&self.name, &self.email, &self.phone]
            .into_iter()
            .flatten()
            .any(|v| v.contains('\0'))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.len()),
            phone: "+380000000000".into(),
            birth_date: date!(1990 - 01 - 01),
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    #[test]
    fn name_pattern_escapes_metacharacters() {
        let f = UserFilter::by_name("a.*b");
        assert_eq!(f.name_pattern().as_deref(), Some(r"a\.\*b"));
    }

    #[test]
    fn nul_in_any_field_is_detected() {
        assert!(UserFilter::by_name("a\0b").contains_nul());
        let f = UserFilter {
            phone: Some("+38\0".into()),
            ..UserFilter::default()
        };
        assert!(f.contains_nul());
        assert!(!UserFilter::by_name("plain").contains_nul());
    }

    #[test]
    fn empty_strings_are_ignored() {
        let f = UserFilter {
            name: Some(String::new()),
            email: Some(String::new()),
            phone: None,
        };
        assert_eq!(f.name_pattern(), None);
        assert_eq!(f.email(), None);
        assert_eq!(f.phone(), None);
    }

    #[test]
    fn user_serializes_with_iso_birth_date() {
        let json = serde_json::to_value(user("Ann")).unwrap();
        assert_eq!(json["birthDate"], "1990-01-01");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
    }
}
