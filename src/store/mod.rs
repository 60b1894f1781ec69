//! Storage boundary for the three collections: users, opportunities and the
//! user/opportunity signups.
//!
//! Every `find_*` and `list_*` call sees active records only. `*_raw` lookups
//! ignore the soft-delete flag and exist for audits and tests. Deletes never
//! remove rows; they flip `is_deleted` and stamp `delete_date`, returning
//! whether an active record matched.
//!
//! Implementations must enforce two things independently of the services:
//! the record schema (see [`schema`]) and one active record per natural key.
//! Services pre-check natural keys for a friendlier error, but the store's
//! unique index is what holds under concurrent writers.

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    error::Violations, opportunities::model::Opportunity, signups::model::Association,
    users::model::User,
};

mod memory;
mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const USER_EMAIL_KEY: &str = "email";
pub const OPPORTUNITY_KEY: &str = "title+date";
pub const SIGNUP_KEY: &str = "userId+opportunityId";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An active record already holds this natural key.
    #[error("duplicate {key}")]
    Duplicate { key: &'static str },

    /// The record points at a row that does not exist.
    #[error("referenced {entity} does not exist")]
    MissingReference { entity: &'static str },

    /// The record failed the storage-side schema.
    #[error("schema validation failed: {0}")]
    Schema(Violations),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
    async fn close(&self);

    // users
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_raw(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Overwrites mutable fields of an active user. `created_at` is never touched.
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    async fn soft_delete_user(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool>;

    // opportunities
    async fn insert_opportunity(&self, opp: &Opportunity) -> StoreResult<()>;
    async fn find_opportunity(&self, id: Uuid) -> StoreResult<Option<Opportunity>>;
    async fn find_opportunity_by_key(&self, title: &str, date: Date)
        -> StoreResult<Option<Opportunity>>;
    async fn find_opportunity_raw(&self, id: Uuid) -> StoreResult<Option<Opportunity>>;
    async fn list_opportunities(&self) -> StoreResult<Vec<Opportunity>>;
    async fn update_opportunity(&self, opp: &Opportunity) -> StoreResult<bool>;
    async fn soft_delete_opportunity(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool>;

    // signups
    async fn insert_association(&self, assoc: &Association) -> StoreResult<()>;
    async fn find_association(&self, id: Uuid) -> StoreResult<Option<Association>>;
    async fn find_active_signup(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> StoreResult<Option<Association>>;
    async fn find_association_raw(&self, id: Uuid) -> StoreResult<Option<Association>>;
    async fn list_associations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Association>>;
    async fn approve_association(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool>;
    async fn soft_delete_association(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool>;
}
