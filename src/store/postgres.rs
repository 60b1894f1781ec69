use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    schema, Store, StoreError, StoreResult, OPPORTUNITY_KEY, SIGNUP_KEY, USER_EMAIL_KEY,
};
use crate::{
    error::Violations,
    opportunities::model::Opportunity,
    signups::model::Association,
    users::model::{AccountType, User},
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, phone_number, \
     account_type, graduation_year, created_at, is_deleted, delete_date";
const OPPORTUNITY_COLUMNS: &str = "id, organizer_id, title, description, location, date, time, \
     duration, created_at, is_deleted, delete_date";
const ASSOCIATION_COLUMNS: &str =
    "id, user_id, opportunity_id, created_at, is_deleted, delete_date, approved_by, approved_on";

/// Postgres-backed store. Owns the connection pool; built once at startup and
/// shared through `AppState`. Records pass [`schema`] before every write and the
/// table CHECK constraints after it.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        info!("database schema up to date");
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    phone_number: String,
    account_type: String,
    graduation_year: Option<i32>,
    created_at: OffsetDateTime,
    is_deleted: bool,
    delete_date: Option<OffsetDateTime>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let account_type = r.account_type.parse::<AccountType>().map_err(|()| {
            StoreError::Backend(anyhow::anyhow!(
                "invalid account_type `{}` in users.account_type",
                r.account_type
            ))
        })?;
        Ok(User {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            password_hash: r.password_hash,
            phone_number: r.phone_number,
            account_type,
            graduation_year: r.graduation_year,
            created_at: r.created_at,
            is_deleted: r.is_deleted,
            delete_date: r.delete_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct OpportunityRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: String,
    location: String,
    date: Date,
    time: String,
    duration: f64,
    created_at: OffsetDateTime,
    is_deleted: bool,
    delete_date: Option<OffsetDateTime>,
}

impl From<OpportunityRow> for Opportunity {
    fn from(r: OpportunityRow) -> Self {
        Self {
            id: r.id,
            organizer_id: r.organizer_id,
            title: r.title,
            description: r.description,
            location: r.location,
            date: r.date,
            time: r.time,
            duration: r.duration,
            created_at: r.created_at,
            is_deleted: r.is_deleted,
            delete_date: r.delete_date,
        }
    }
}

#[derive(Debug, FromRow)]
struct AssociationRow {
    id: Uuid,
    user_id: Uuid,
    opportunity_id: Uuid,
    created_at: OffsetDateTime,
    is_deleted: bool,
    delete_date: Option<OffsetDateTime>,
    approved_by: Option<Uuid>,
    approved_on: Option<OffsetDateTime>,
}

impl From<AssociationRow> for Association {
    fn from(r: AssociationRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            opportunity_id: r.opportunity_id,
            created_at: r.created_at,
            is_deleted: r.is_deleted,
            delete_date: r.delete_date,
            approved_by: r.approved_by,
            approved_on: r.approved_on,
        }
    }
}

/// Unique-index and CHECK violations become typed store errors; anything else
/// is logged and passed on as a backend failure.
fn map_db_err(e: sqlx::Error, op: &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        let constraint = db.constraint().unwrap_or_default();
        match db.code().as_deref() {
            Some("23505") => return StoreError::Duplicate { key: natural_key(constraint) },
            Some("23503") => {
                return StoreError::MissingReference {
                    entity: referenced_entity(constraint),
                }
            }
            Some("23514") | Some("23502") => {
                return StoreError::Schema(Violations::single(
                    field_for_constraint(constraint),
                    "rejected by storage schema",
                ));
            }
            _ => {}
        }
    }
    error!(error = %e, op, "database operation failed");
    StoreError::Backend(anyhow::Error::new(e).context(op))
}

fn natural_key(index: &str) -> &'static str {
    match index {
        "users_email_active_key" => USER_EMAIL_KEY,
        "opportunities_title_date_active_key" => OPPORTUNITY_KEY,
        "user_opportunities_pair_active_key" => SIGNUP_KEY,
        _ => "id",
    }
}

// Postgres names inline REFERENCES constraints `<table>_<column>_fkey`.
fn referenced_entity(constraint: &str) -> &'static str {
    match constraint {
        "opportunities_organizer_id_fkey" => "organizer",
        "user_opportunities_user_id_fkey" => "user",
        "user_opportunities_opportunity_id_fkey" => "opportunity",
        "user_opportunities_approved_by_fkey" => "approver",
        _ => "record",
    }
}

// Postgres folds unquoted constraint names to lower case.
fn field_for_constraint(constraint: &str) -> String {
    let suffix = constraint.rsplit("_chk_").next().unwrap_or(constraint);
    match suffix {
        "firstname" => "firstName",
        "lastname" => "lastName",
        "passwordhash" => "passwordHash",
        "phonenumber" => "phoneNumber",
        "accounttype" => "accountType",
        "graduationyear" => "graduationYear",
        "deletedate" => "deleteDate",
        "approvedon" => "approvedOn",
        other => other,
    }
    .to_string()
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "ping"))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        schema::check_user(user)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, phone_number,
                               account_type, graduation_year, created_at, is_deleted, delete_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(user.account_type.as_str())
        .bind(user.graduation_year)
        .bind(user.created_at)
        .bind(user.is_deleted)
        .bind(user.delete_date)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "insert user"))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND NOT is_deleted");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find user"))?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND NOT is_deleted");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find user by email"))?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_raw(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find user (raw)"))?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE NOT is_deleted ORDER BY created_at, id"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "list users"))?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        schema::check_user(user)?;
        let res = sqlx::query(
            r#"
            UPDATE users
               SET first_name = $2, last_name = $3, email = $4, password_hash = $5,
                   phone_number = $6, account_type = $7, graduation_year = $8
             WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(user.account_type.as_str())
        .bind(user.graduation_year)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "update user"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn soft_delete_user(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let res = sqlx::query(
            "UPDATE users SET is_deleted = TRUE, delete_date = $2 WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "soft delete user"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_opportunity(&self, opp: &Opportunity) -> StoreResult<()> {
        schema::check_opportunity(opp)?;
        sqlx::query(
            r#"
            INSERT INTO opportunities (id, organizer_id, title, description, location, date, time,
                                       duration, created_at, is_deleted, delete_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(opp.id)
        .bind(opp.organizer_id)
        .bind(&opp.title)
        .bind(&opp.description)
        .bind(&opp.location)
        .bind(opp.date)
        .bind(&opp.time)
        .bind(opp.duration)
        .bind(opp.created_at)
        .bind(opp.is_deleted)
        .bind(opp.delete_date)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "insert opportunity"))?;
        Ok(())
    }

    async fn find_opportunity(&self, id: Uuid) -> StoreResult<Option<Opportunity>> {
        let sql = format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1 AND NOT is_deleted"
        );
        let row = sqlx::query_as::<_, OpportunityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find opportunity"))?;
        Ok(row.map(Opportunity::from))
    }

    async fn find_opportunity_by_key(
        &self,
        title: &str,
        date: Date,
    ) -> StoreResult<Option<Opportunity>> {
        let sql = format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
             WHERE title = $1 AND date = $2 AND NOT is_deleted"
        );
        let row = sqlx::query_as::<_, OpportunityRow>(&sql)
            .bind(title)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find opportunity by key"))?;
        Ok(row.map(Opportunity::from))
    }

    async fn find_opportunity_raw(&self, id: Uuid) -> StoreResult<Option<Opportunity>> {
        let sql = format!("SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1");
        let row = sqlx::query_as::<_, OpportunityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find opportunity (raw)"))?;
        Ok(row.map(Opportunity::from))
    }

    async fn list_opportunities(&self) -> StoreResult<Vec<Opportunity>> {
        let sql = format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE NOT is_deleted \
             ORDER BY date, time, id"
        );
        let rows = sqlx::query_as::<_, OpportunityRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "list opportunities"))?;
        Ok(rows.into_iter().map(Opportunity::from).collect())
    }

    async fn update_opportunity(&self, opp: &Opportunity) -> StoreResult<bool> {
        schema::check_opportunity(opp)?;
        let res = sqlx::query(
            r#"
            UPDATE opportunities
               SET organizer_id = $2, title = $3, description = $4, location = $5,
                   date = $6, time = $7, duration = $8
             WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(opp.id)
        .bind(opp.organizer_id)
        .bind(&opp.title)
        .bind(&opp.description)
        .bind(&opp.location)
        .bind(opp.date)
        .bind(&opp.time)
        .bind(opp.duration)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "update opportunity"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn soft_delete_opportunity(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let res = sqlx::query(
            "UPDATE opportunities SET is_deleted = TRUE, delete_date = $2 \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "soft delete opportunity"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_association(&self, assoc: &Association) -> StoreResult<()> {
        schema::check_association(assoc)?;
        sqlx::query(
            r#"
            INSERT INTO user_opportunities (id, user_id, opportunity_id, created_at, is_deleted,
                                            delete_date, approved_by, approved_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(assoc.id)
        .bind(assoc.user_id)
        .bind(assoc.opportunity_id)
        .bind(assoc.created_at)
        .bind(assoc.is_deleted)
        .bind(assoc.delete_date)
        .bind(assoc.approved_by)
        .bind(assoc.approved_on)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "insert signup"))?;
        Ok(())
    }

    async fn find_association(&self, id: Uuid) -> StoreResult<Option<Association>> {
        let sql = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM user_opportunities WHERE id = $1 AND NOT is_deleted"
        );
        let row = sqlx::query_as::<_, AssociationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find signup"))?;
        Ok(row.map(Association::from))
    }

    async fn find_active_signup(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> StoreResult<Option<Association>> {
        let sql = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM user_opportunities \
             WHERE user_id = $1 AND opportunity_id = $2 AND NOT is_deleted"
        );
        let row = sqlx::query_as::<_, AssociationRow>(&sql)
            .bind(user_id)
            .bind(opportunity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find active signup"))?;
        Ok(row.map(Association::from))
    }

    async fn find_association_raw(&self, id: Uuid) -> StoreResult<Option<Association>> {
        let sql = format!("SELECT {ASSOCIATION_COLUMNS} FROM user_opportunities WHERE id = $1");
        let row = sqlx::query_as::<_, AssociationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "find signup (raw)"))?;
        Ok(row.map(Association::from))
    }

    async fn list_associations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Association>> {
        let sql = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM user_opportunities \
             WHERE user_id = $1 AND NOT is_deleted ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, AssociationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err(e, "list signups"))?;
        Ok(rows.into_iter().map(Association::from).collect())
    }

    async fn approve_association(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let res = sqlx::query(
            "UPDATE user_opportunities SET approved_by = $2, approved_on = $3 \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(approved_by)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "approve signup"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn soft_delete_association(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let res = sqlx::query(
            "UPDATE user_opportunities SET is_deleted = TRUE, delete_date = $2 \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "withdraw signup"))?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_names_map_to_natural_keys() {
        assert_eq!(natural_key("users_email_active_key"), "email");
        assert_eq!(natural_key("opportunities_title_date_active_key"), "title+date");
        assert_eq!(natural_key("user_opportunities_pair_active_key"), "userId+opportunityId");
        assert_eq!(natural_key("users_pkey"), "id");
    }

    #[test]
    fn foreign_keys_map_to_missing_entities() {
        assert_eq!(referenced_entity("opportunities_organizer_id_fkey"), "organizer");
        assert_eq!(referenced_entity("user_opportunities_user_id_fkey"), "user");
        assert_eq!(referenced_entity("user_opportunities_opportunity_id_fkey"), "opportunity");
        assert_eq!(referenced_entity("user_opportunities_approved_by_fkey"), "approver");
        assert_eq!(referenced_entity("something_else_fkey"), "record");
    }

    #[test]
    fn check_constraints_map_to_fields() {
        assert_eq!(field_for_constraint("users_chk_email"), "email");
        assert_eq!(field_for_constraint("users_chk_phonenumber"), "phoneNumber");
        assert_eq!(field_for_constraint("opportunities_chk_duration"), "duration");
        assert_eq!(field_for_constraint("user_opportunities_chk_approvedon"), "approvedOn");
    }
}
