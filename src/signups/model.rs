use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Where a signup sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SignupStatus {
    SignedUp,
    Approved,
    Withdrawn,
}

/// A user's signup for an opportunity (`userOpportunities`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: Uuid,
    pub user_id: Uuid,
    pub opportunity_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delete_date: Option<OffsetDateTime>,
    pub approved_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_on: Option<OffsetDateTime>,
}

impl Association {
    pub fn new(user_id: Uuid, opportunity_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            opportunity_id,
            created_at: OffsetDateTime::now_utc(),
            is_deleted: false,
            delete_date: None,
            approved_by: None,
            approved_on: None,
        }
    }

    pub fn status(&self) -> SignupStatus {
        if self.is_deleted {
            SignupStatus::Withdrawn
        } else if self.approved_by.is_some() {
            SignupStatus::Approved
        } else {
            SignupStatus::SignedUp
        }
    }
}
