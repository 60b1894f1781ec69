use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    users::model::{AccountType, User},
};

/// The authenticated caller, attached to a request by [`super::AuthUser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub account_type: AccountType,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }
}

impl From<&User> for Principal {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            account_type: u.account_type,
        }
    }
}

/// Authorization decisions for mutating operations.
pub trait AccessPolicy: Send + Sync {
    fn can_manage_user(&self, principal: &Principal, user_id: Uuid) -> bool;
    fn can_manage_opportunity(&self, principal: &Principal, organizer_id: Uuid) -> bool;
    fn can_manage_signup(&self, principal: &Principal, user_id: Uuid) -> bool;
    fn can_approve(&self, principal: &Principal, approver: &User) -> bool;
    /// `principal` is `None` for anonymous sign-up; `current` is `None` when the
    /// account is being created.
    fn can_assign_role(
        &self,
        principal: Option<&Principal>,
        current: Option<AccountType>,
        target: AccountType,
    ) -> bool;
}

/// Admins may do anything. Everyone else acts on their own records, and only
/// organizers create opportunities or approve hours. New accounts may register
/// as students or organizers; only admins grant admin or change a role.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleBasedPolicy;

impl AccessPolicy for RoleBasedPolicy {
    fn can_manage_user(&self, principal: &Principal, user_id: Uuid) -> bool {
        principal.is_admin() || principal.id == user_id
    }

    fn can_manage_opportunity(&self, principal: &Principal, organizer_id: Uuid) -> bool {
        principal.is_admin()
            || (principal.account_type == AccountType::Organizer && principal.id == organizer_id)
    }

    fn can_manage_signup(&self, principal: &Principal, user_id: Uuid) -> bool {
        principal.is_admin() || principal.id == user_id
    }

    fn can_approve(&self, principal: &Principal, approver: &User) -> bool {
        principal.is_admin()
            || (principal.id == approver.id && approver.account_type == AccountType::Organizer)
    }

    fn can_assign_role(
        &self,
        principal: Option<&Principal>,
        current: Option<AccountType>,
        target: AccountType,
    ) -> bool {
        if principal.is_some_and(Principal::is_admin) {
            return true;
        }
        current.is_none() && target != AccountType::Admin
    }
}

/// Allows every authenticated caller everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissivePolicy;

impl AccessPolicy for PermissivePolicy {
    fn can_manage_user(&self, _: &Principal, _: Uuid) -> bool {
        true
    }

    fn can_manage_opportunity(&self, _: &Principal, _: Uuid) -> bool {
        true
    }

    fn can_manage_signup(&self, _: &Principal, _: Uuid) -> bool {
        true
    }

    fn can_approve(&self, _: &Principal, _: &User) -> bool {
        true
    }

    fn can_assign_role(&self, _: Option<&Principal>, _: Option<AccountType>, _: AccountType) -> bool {
        true
    }
}

pub fn from_name(name: &str) -> anyhow::Result<Arc<dyn AccessPolicy>> {
    match name {
        "role" => Ok(Arc::new(RoleBasedPolicy)),
        "permissive" => Ok(Arc::new(PermissivePolicy)),
        other => anyhow::bail!("unknown ACCESS_POLICY `{other}` (expected `role` or `permissive`)"),
    }
}

pub fn ensure(allowed: bool, action: &str) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("not allowed to {action}")))
    }
}
