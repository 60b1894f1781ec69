//! Fixtures shared by the unit tests.

use serde_json::json;
use time::{macros::date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::Principal,
    opportunities::model::Opportunity,
    state::AppState,
    users::{
        dto::UserRequest,
        model::{AccountType, User},
        services,
    },
};

pub const PASSWORD: &str = "Corr3ct-Horse!Battery";

/// Inserts a user straight into the store. The hash is not a real one, so the
/// user cannot log in; use [`create_user`] for that.
pub async fn seed_user(state: &AppState, email: &str, account_type: AccountType) -> User {
    let user = User {
        id: Uuid::new_v4(),
        first_name: "Test".into(),
        last_name: "User".into(),
        email: email.to_lowercase(),
        password_hash: "not-a-phc-string".into(),
        phone_number: "1234567890".into(),
        account_type,
        graduation_year: (account_type == AccountType::Student).then_some(2026),
        created_at: OffsetDateTime::now_utc(),
        is_deleted: false,
        delete_date: None,
    };
    state.store.insert_user(&user).await.expect("seed user");
    user
}

/// Creates a user through the service with [`PASSWORD`], on behalf of an admin
/// so any account type is allowed.
pub async fn create_user(state: &AppState, email: &str, account_type: AccountType) -> User {
    let request: UserRequest = serde_json::from_value(json!({
        "firstName": "Test",
        "lastName": "User",
        "email": email,
        "password": PASSWORD,
        "phoneNumber": "(555)123-4567",
        "accountType": account_type.as_str(),
        "graduationYear": 2027
    }))
    .expect("user request");
    let input = request.validate(true).expect("valid user");
    let admin = Principal {
        id: Uuid::nil(),
        account_type: AccountType::Admin,
    };
    let view = services::create_user(state, Some(&admin), input)
        .await
        .expect("create user");
    state
        .store
        .find_user(view.id)
        .await
        .expect("find user")
        .expect("user is active")
}

pub async fn seed_opportunity(state: &AppState, organizer_id: Uuid, title: &str) -> Opportunity {
    let opp = Opportunity {
        id: Uuid::new_v4(),
        organizer_id,
        title: title.into(),
        description: "Pick up litter along the shore".into(),
        location: "North Beach".into(),
        date: date!(2026 - 11 - 14),
        time: "09:00".into(),
        duration: 3.0,
        created_at: OffsetDateTime::now_utc(),
        is_deleted: false,
        delete_date: None,
    };
    state.store.insert_opportunity(&opp).await.expect("seed opportunity");
    opp
}
