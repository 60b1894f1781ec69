use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Student,
    Organizer,
    Admin,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Student => "student",
            AccountType::Organizer => "organizer",
            AccountType::Admin => "admin",
        }
    }
}

impl FromStr for AccountType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(AccountType::Student),
            "organizer" => Ok(AccountType::Organizer),
            "admin" => Ok(AccountType::Admin),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user record. Not serializable: responses go through [`UserView`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: String,
    pub account_type: AccountType,
    pub graduation_year: Option<i32>,
    pub created_at: OffsetDateTime,
    pub is_deleted: bool,
    pub delete_date: Option<OffsetDateTime>,
}

/// Public part of the user returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub account_type: AccountType,
    pub graduation_year: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone_number: u.phone_number,
            account_type: u.account_type,
            graduation_year: u.graduation_year,
            created_at: u.created_at,
        }
    }
}
