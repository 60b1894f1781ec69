//! Storage-side record schema. Runs on typed records right before they are
//! written, regardless of what the request layer already checked. Postgres
//! carries the same rules as CHECK constraints (see `migrations/`).

use crate::{
    error::Violations,
    opportunities::model::Opportunity,
    signups::model::Association,
    store::StoreError,
    users::model::{AccountType, User},
    validation,
};

pub fn check_user(user: &User) -> Result<(), StoreError> {
    let mut v = Violations::new();
    non_empty(&mut v, "firstName", &user.first_name);
    non_empty(&mut v, "lastName", &user.last_name);
    non_empty(&mut v, "passwordHash", &user.password_hash);
    if !validation::is_valid_email(&user.email) {
        v.push("email", "must be a valid email");
    }
    if !validation::is_valid_phone_number(&user.phone_number) {
        v.push("phoneNumber", "must be (123)456-7890, 1234567890, or 123.456.7890");
    }
    match (user.account_type, user.graduation_year) {
        (_, Some(year)) if !validation::is_valid_graduation_year(year) => {
            v.push("graduationYear", "must be an integer year between 1900 and 2035");
        }
        (AccountType::Student, None) => v.push("graduationYear", "is required for students"),
        _ => {}
    }
    soft_delete_pair(&mut v, user.is_deleted, user.delete_date.is_some());
    v.into_result().map_err(StoreError::Schema)
}

pub fn check_opportunity(opp: &Opportunity) -> Result<(), StoreError> {
    let mut v = Violations::new();
    non_empty(&mut v, "title", &opp.title);
    non_empty(&mut v, "description", &opp.description);
    non_empty(&mut v, "location", &opp.location);
    if !validation::is_valid_time(&opp.time) {
        v.push("time", "must be HH:MM (24-hour)");
    }
    if !validation::is_valid_duration(opp.duration) {
        v.push("duration", "must be a non-negative number");
    }
    soft_delete_pair(&mut v, opp.is_deleted, opp.delete_date.is_some());
    v.into_result().map_err(StoreError::Schema)
}

pub fn check_association(assoc: &Association) -> Result<(), StoreError> {
    let mut v = Violations::new();
    if assoc.approved_by.is_some() != assoc.approved_on.is_some() {
        v.push("approvedOn", "approvedBy and approvedOn are set together");
    }
    soft_delete_pair(&mut v, assoc.is_deleted, assoc.delete_date.is_some());
    v.into_result().map_err(StoreError::Schema)
}

fn non_empty(v: &mut Violations, field: &str, value: &str) {
    if value.trim().is_empty() {
        v.push(field, "is required");
    }
}

fn soft_delete_pair(v: &mut Violations, is_deleted: bool, has_date: bool) {
    if is_deleted != has_date {
        v.push("deleteDate", "is set exactly when the record is deleted");
    }
}
