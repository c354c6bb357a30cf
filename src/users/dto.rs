use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use super::error::UserError;
use super::model::{NewUser, UserFilter};
use super::service::ListQuery;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Body of `POST /add-user`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// ISO date (`1990-01-01`) or RFC 3339 timestamp.
    pub birth_date: String,
}

impl CreateUserRequest {
    /// Field-shape checks done before the request reaches the service.
    pub fn validate(self) -> Result<NewUser, UserError> {
        if [&self.name, &self.email, &self.phone, &self.birth_date]
            .iter()
            .any(|v| v.contains('\0'))
        {
            return Err(UserError::InvalidArgument("fields must not contain NUL characters".into()));
        }
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(UserError::InvalidArgument("name must not be empty".into()));
        }
        let email = self.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(UserError::InvalidArgument("email must be a valid address".into()));
        }
        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            return Err(UserError::InvalidArgument("phone must not be empty".into()));
        }
        let birth_date = parse_iso_date(self.birth_date.trim()).ok_or_else(|| {
            UserError::InvalidArgument("birthDate must be an ISO date".into())
        })?;

        Ok(NewUser {
            name,
            email,
            phone,
            birth_date,
        })
    }
}

fn parse_iso_date(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|t| t.date()))
}

/// Query string of `GET /get-users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<ListUsersParams> for ListQuery {
    fn from(p: ListUsersParams) -> Self {
        ListQuery {
            filter: UserFilter {
                name: p.name,
                email: p.email,
                phone: p.phone,
            },
            page: p.page,
            limit: p.limit,
        }
    }
}
