use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{policy::ensure, Principal},
    error::AppError,
    signups::{dto::SignupView, model::Association},
    state::AppState,
    store::SIGNUP_KEY,
};

/// Active signups of one user.
pub async fn list_for_user(st: &AppState, user_id: Uuid) -> Result<Vec<SignupView>, AppError> {
    if st.store.find_user(user_id).await?.is_none() {
        return Err(AppError::not_found("user"));
    }
    let signups = st.store.list_associations_for_user(user_id).await?;
    Ok(signups.into_iter().map(SignupView::from).collect())
}

pub async fn sign_up(
    st: &AppState,
    principal: &Principal,
    user_id: Uuid,
    opportunity_id: Uuid,
) -> Result<SignupView, AppError> {
    ensure(st.policy.can_manage_signup(principal, user_id), "sign up this user")?;

    if st.store.find_user(user_id).await?.is_none() {
        return Err(AppError::not_found("user"));
    }
    if st.store.find_opportunity(opportunity_id).await?.is_none() {
        return Err(AppError::not_found("opportunity"));
    }
    if let Some(existing) = st.store.find_active_signup(user_id, opportunity_id).await? {
        warn!(signup_id = %existing.id, "already signed up");
        return Err(AppError::Conflict { key: SIGNUP_KEY });
    }

    let assoc = Association::new(user_id, opportunity_id);
    st.store.insert_association(&assoc).await?;

    info!(signup_id = %assoc.id, %user_id, %opportunity_id, "signed up");
    Ok(assoc.into())
}

/// Soft-deletes the signup. A withdrawn signup cannot be withdrawn or approved again.
pub async fn withdraw(st: &AppState, principal: &Principal, id: Uuid) -> Result<(), AppError> {
    let assoc = st
        .store
        .find_association(id)
        .await?
        .ok_or_else(|| AppError::not_found("signup"))?;
    ensure(st.policy.can_manage_signup(principal, assoc.user_id), "withdraw this signup")?;

    if !st.store.soft_delete_association(id, OffsetDateTime::now_utc()).await? {
        return Err(AppError::not_found("signup"));
    }
    info!(signup_id = %id, by = %principal.id, "signup withdrawn");
    Ok(())
}

/// Records `approver_id` as having approved the signup's hours. Approving
/// again overwrites the previous approver and timestamp.
pub async fn approve(
    st: &AppState,
    principal: &Principal,
    approver_id: Uuid,
    id: Uuid,
) -> Result<SignupView, AppError> {
    let assoc = st
        .store
        .find_association(id)
        .await?
        .ok_or_else(|| AppError::not_found("signup"))?;
    let approver = st
        .store
        .find_user(approver_id)
        .await?
        .ok_or_else(|| AppError::not_found("approver"))?;

    ensure(st.policy.can_approve(principal, &approver), "approve as this user")?;
    if approver.id == assoc.user_id {
        return Err(AppError::Forbidden("cannot approve your own signup".into()));
    }

    let now = OffsetDateTime::now_utc();
    if !st.store.approve_association(id, approver.id, now).await? {
        return Err(AppError::not_found("signup"));
    }

    info!(signup_id = %id, approver_id = %approver.id, "signup approved");
    Ok(Association {
        approved_by: Some(approver.id),
        approved_on: Some(now),
        ..assoc
    }
    .into())
}
