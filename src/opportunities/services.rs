use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{policy::ensure, Principal},
    error::AppError,
    opportunities::{dto::ValidOpportunity, model::Opportunity},
    state::AppState,
    store::OPPORTUNITY_KEY,
};

pub async fn list_opportunities(st: &AppState) -> Result<Vec<Opportunity>, AppError> {
    Ok(st.store.list_opportunities().await?)
}

pub async fn get_opportunity(st: &AppState, id: Uuid) -> Result<Opportunity, AppError> {
    st.store
        .find_opportunity(id)
        .await?
        .ok_or_else(|| AppError::not_found("opportunity"))
}

pub async fn create_opportunity(
    st: &AppState,
    principal: &Principal,
    input: ValidOpportunity,
) -> Result<Opportunity, AppError> {
    ensure(
        st.policy.can_manage_opportunity(principal, input.organizer_id),
        "create opportunities for this organizer",
    )?;
    ensure_organizer_active(st, input.organizer_id).await?;
    ensure_key_free(st, &input, None).await?;

    let opp = build_opportunity(Uuid::new_v4(), input, OffsetDateTime::now_utc());
    st.store.insert_opportunity(&opp).await?;

    info!(opportunity_id = %opp.id, organizer_id = %opp.organizer_id, "opportunity created");
    Ok(opp)
}

pub async fn update_opportunity(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
    input: ValidOpportunity,
) -> Result<Opportunity, AppError> {
    let current = get_opportunity(st, id).await?;
    ensure(
        st.policy.can_manage_opportunity(principal, current.organizer_id),
        "update this opportunity",
    )?;

    if input.organizer_id != current.organizer_id {
        ensure(
            st.policy.can_manage_opportunity(principal, input.organizer_id),
            "hand this opportunity to another organizer",
        )?;
        ensure_organizer_active(st, input.organizer_id).await?;
    }
    if !current.same_key(&input.title, input.date) {
        ensure_key_free(st, &input, Some(id)).await?;
    }

    let opp = build_opportunity(id, input, current.created_at);
    if !st.store.update_opportunity(&opp).await? {
        return Err(AppError::not_found("opportunity"));
    }

    info!(opportunity_id = %id, by = %principal.id, "opportunity updated");
    Ok(opp)
}

pub async fn delete_opportunity(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<(), AppError> {
    let current = get_opportunity(st, id).await?;
    ensure(
        st.policy.can_manage_opportunity(principal, current.organizer_id),
        "delete this opportunity",
    )?;

    if !st.store.soft_delete_opportunity(id, OffsetDateTime::now_utc()).await? {
        return Err(AppError::not_found("opportunity"));
    }
    info!(opportunity_id = %id, by = %principal.id, "opportunity soft-deleted");
    Ok(())
}

async fn ensure_organizer_active(st: &AppState, organizer_id: Uuid) -> Result<(), AppError> {
    if st.store.find_user(organizer_id).await?.is_none() {
        warn!(%organizer_id, "organizer missing or deleted");
        return Err(AppError::not_found("organizer"));
    }
    Ok(())
}

async fn ensure_key_free(
    st: &AppState,
    input: &ValidOpportunity,
    owner: Option<Uuid>,
) -> Result<(), AppError> {
    match st.store.find_opportunity_by_key(&input.title, input.date).await? {
        Some(existing) if Some(existing.id) != owner => {
            warn!(existing_id = %existing.id, "title and date already taken");
            Err(AppError::Conflict { key: OPPORTUNITY_KEY })
        }
        _ => Ok(()),
    }
}

fn build_opportunity(id: Uuid, input: ValidOpportunity, created_at: OffsetDateTime) -> Opportunity {
    Opportunity {
        id,
        organizer_id: input.organizer_id,
        title: input.title,
        description: input.description,
        location: input.location,
        date: input.date,
        time: input.time,
        duration: input.duration,
        created_at,
        is_deleted: false,
        delete_date: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::policy::PermissivePolicy,
        test_support,
        users::model::AccountType,
    };
    use std::sync::Arc;
    use time::macros::date;

    fn input(organizer_id: Uuid, title: &str) -> ValidOpportunity {
        ValidOpportunity {
            organizer_id,
            title: title.into(),
            description: "Sort donations".into(),
            location: "Food bank".into(),
            date: date!(2026 - 12 - 01),
            time: "18:30".into(),
            duration: 2.0,
        }
    }

    async fn organizer(state: &AppState, email: &str) -> Principal {
        Principal::from(&test_support::seed_user(state, email, AccountType::Organizer).await)
    }

    #[tokio::test]
    async fn organizer_creates_and_duplicates_conflict() {
        let state = AppState::fake();
        let org = organizer(&state, "org@example.com").await;

        let opp = create_opportunity(&state, &org, input(org.id, "Pantry night")).await.unwrap();
        assert_eq!(get_opportunity(&state, opp.id).await.unwrap(), opp);

        let err = create_opportunity(&state, &org, input(org.id, "Pantry night"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { key: "title+date" }));

        let mut other_day = input(org.id, "Pantry night");
        other_day.date = date!(2026 - 12 - 02);
        assert!(create_opportunity(&state, &org, other_day).await.is_ok());
    }

    #[tokio::test]
    async fn deleted_key_can_be_reused() {
        let state = AppState::fake();
        let org = organizer(&state, "org@example.com").await;
        let first = create_opportunity(&state, &org, input(org.id, "Tree planting")).await.unwrap();
        delete_opportunity(&state, &org, first.id).await.unwrap();

        assert!(matches!(
            get_opportunity(&state, first.id).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(list_opportunities(&state).await.unwrap().is_empty());
        assert!(state.store.find_opportunity_raw(first.id).await.unwrap().unwrap().is_deleted);

        let second = create_opportunity(&state, &org, input(org.id, "Tree planting")).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn students_and_other_organizers_are_refused() {
        let state = AppState::fake();
        let org = organizer(&state, "org@example.com").await;
        let rival = organizer(&state, "rival@example.com").await;
        let student =
            Principal::from(&test_support::seed_user(&state, "s@example.com", AccountType::Student).await);

        assert!(matches!(
            create_opportunity(&state, &student, input(student.id, "Mine")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            create_opportunity(&state, &rival, input(org.id, "Not mine")).await,
            Err(AppError::Forbidden(_))
        ));

        let opp = create_opportunity(&state, &org, input(org.id, "Ours")).await.unwrap();
        assert!(matches!(
            delete_opportunity(&state, &rival, opp.id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn permissive_policy_lets_anyone_through() {
        let state = AppState::fake().with_policy(Arc::new(PermissivePolicy));
        let org = organizer(&state, "org@example.com").await;
        let student =
            Principal::from(&test_support::seed_user(&state, "s@example.com", AccountType::Student).await);

        assert!(create_opportunity(&state, &student, input(org.id, "Open")).await.is_ok());
    }

    #[tokio::test]
    async fn organizer_must_be_active() {
        let state = AppState::fake().with_policy(Arc::new(PermissivePolicy));
        let org = organizer(&state, "org@example.com").await;
        state.store.soft_delete_user(org.id, OffsetDateTime::now_utc()).await.unwrap();

        assert!(matches!(
            create_opportunity(&state, &org, input(org.id, "Ghost")).await,
            Err(AppError::NotFound { entity: "organizer" })
        ));
        assert!(matches!(
            create_opportunity(&state, &org, input(Uuid::new_v4(), "Nobody")).await,
            Err(AppError::NotFound { entity: "organizer" })
        ));
    }

    #[tokio::test]
    async fn update_checks_key_only_when_it_changes() {
        let state = AppState::fake();
        let org = organizer(&state, "org@example.com").await;
        let a = create_opportunity(&state, &org, input(org.id, "A")).await.unwrap();
        create_opportunity(&state, &org, input(org.id, "B")).await.unwrap();

        let mut same_key = input(org.id, "A");
        same_key.duration = 4.5;
        let updated = update_opportunity(&state, &org, a.id, same_key).await.unwrap();
        assert_eq!(updated.duration, 4.5);
        assert_eq!(updated.created_at, a.created_at);

        assert!(matches!(
            update_opportunity(&state, &org, a.id, input(org.id, "B")).await,
            Err(AppError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let state = AppState::fake();
        let org = organizer(&state, "org@example.com").await;
        let opp = create_opportunity(&state, &org, input(org.id, "Once")).await.unwrap();
        delete_opportunity(&state, &org, opp.id).await.unwrap();
        assert!(matches!(
            delete_opportunity(&state, &org, opp.id).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
