use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{password::hash_password, policy::ensure, Principal},
    error::{AppError, Violations},
    state::AppState,
    store::USER_EMAIL_KEY,
    users::{
        dto::{UserProfile, ValidUser},
        model::{User, UserView},
    },
};

pub async fn list_users(st: &AppState) -> Result<Vec<UserView>, AppError> {
    let users = st.store.list_users().await?;
    Ok(users.into_iter().map(UserView::from).collect())
}

pub async fn get_user(st: &AppState, id: Uuid) -> Result<UserView, AppError> {
    st.store
        .find_user(id)
        .await?
        .map(UserView::from)
        .ok_or_else(|| AppError::not_found("user"))
}

/// `principal` is the authenticated caller, if any; anonymous callers may
/// only register non-admin accounts.
pub async fn create_user(
    st: &AppState,
    principal: Option<&Principal>,
    input: ValidUser,
) -> Result<UserView, AppError> {
    let ValidUser { profile, password } = input;
    let Some(password) = password else {
        return Err(AppError::Validation(Violations::single("password", "is required")));
    };
    ensure(
        st.policy.can_assign_role(principal, None, profile.account_type),
        &format!("register {} accounts", profile.account_type),
    )?;

    ensure_email_free(st, &profile.email, None).await?;

    let password_hash = hash_password(&password).map_err(AppError::Storage)?;
    let user = build_user(Uuid::new_v4(), profile, password_hash, OffsetDateTime::now_utc());
    st.store.insert_user(&user).await?;

    info!(user_id = %user.id, account_type = %user.account_type, "user created");
    Ok(user.into())
}

pub async fn update_user(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
    input: ValidUser,
) -> Result<UserView, AppError> {
    ensure(st.policy.can_manage_user(principal, id), "update this user")?;

    let current = st
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let ValidUser { profile, password } = input;
    if profile.account_type != current.account_type {
        ensure(
            st.policy.can_assign_role(Some(principal), Some(current.account_type), profile.account_type),
            "change this account's role",
        )?;
    }
    if profile.email != current.email {
        ensure_email_free(st, &profile.email, Some(id)).await?;
    }

    let password_hash = match password {
        Some(p) => hash_password(&p).map_err(AppError::Storage)?,
        None => current.password_hash,
    };

    let user = build_user(id, profile, password_hash, current.created_at);
    if !st.store.update_user(&user).await? {
        // Deleted between the lookup and the write.
        return Err(AppError::not_found("user"));
    }

    info!(user_id = %id, by = %principal.id, "user updated");
    Ok(user.into())
}

pub async fn delete_user(st: &AppState, principal: &Principal, id: Uuid) -> Result<(), AppError> {
    ensure(st.policy.can_manage_user(principal, id), "delete this user")?;

    if !st.store.soft_delete_user(id, OffsetDateTime::now_utc()).await? {
        return Err(AppError::not_found("user"));
    }
    info!(user_id = %id, by = %principal.id, "user soft-deleted");
    Ok(())
}

async fn ensure_email_free(st: &AppState, email: &str, owner: Option<Uuid>) -> Result<(), AppError> {
    match st.store.find_user_by_email(email).await? {
        Some(existing) if Some(existing.id) != owner => {
            warn!(existing_id = %existing.id, "email already registered");
            Err(AppError::Conflict { key: USER_EMAIL_KEY })
        }
        _ => Ok(()),
    }
}

fn build_user(id: Uuid, p: UserProfile, password_hash: String, created_at: OffsetDateTime) -> User {
    User {
        id,
        first_name: p.first_name,
        last_name: p.last_name,
        email: p.email,
        password_hash,
        phone_number: p.phone_number,
        account_type: p.account_type,
        graduation_year: p.graduation_year,
        created_at,
        is_deleted: false,
        delete_date: None,
    }
}
