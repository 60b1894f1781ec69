use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    schema, Store, StoreError, StoreResult, OPPORTUNITY_KEY, SIGNUP_KEY, USER_EMAIL_KEY,
};
use crate::{opportunities::model::Opportunity, signups::model::Association, users::model::User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    opportunities: Vec<Opportunity>,
    associations: Vec<Association>,
}

/// In-process store with the same schema and active-record unique indexes as
/// the Postgres one. Records keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn reject_duplicate_id<T>(items: &[T], id: Uuid, id_of: impl Fn(&T) -> Uuid) -> StoreResult<()> {
    if items.iter().any(|i| id_of(i) == id) {
        return Err(StoreError::Duplicate { key: "id" });
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) {}

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        schema::check_user(user)?;
        let mut c = self.inner.write().await;
        reject_duplicate_id(&c.users, user.id, |u| u.id)?;
        if c.users.iter().any(|u| !u.is_deleted && u.email == user.email) {
            return Err(StoreError::Duplicate { key: USER_EMAIL_KEY });
        }
        c.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let c = self.inner.read().await;
        Ok(c.users.iter().find(|u| u.id == id && !u.is_deleted).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let c = self.inner.read().await;
        Ok(c.users
            .iter()
            .find(|u| u.email == email && !u.is_deleted)
            .cloned())
    }

    async fn find_user_raw(&self, id: Uuid) -> StoreResult<Option<User>> {
        let c = self.inner.read().await;
        Ok(c.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let c = self.inner.read().await;
        Ok(c.users.iter().filter(|u| !u.is_deleted).cloned().collect())
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        schema::check_user(user)?;
        let mut c = self.inner.write().await;
        if c
            .users
            .iter()
            .any(|u| u.id != user.id && !u.is_deleted && u.email == user.email)
        {
            return Err(StoreError::Duplicate { key: USER_EMAIL_KEY });
        }
        let Some(slot) = c.users.iter_mut().find(|u| u.id == user.id && !u.is_deleted) else {
            return Ok(false);
        };
        *slot = User {
            created_at: slot.created_at,
            is_deleted: false,
            delete_date: None,
            ..user.clone()
        };
        Ok(true)
    }

    async fn soft_delete_user(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let mut c = self.inner.write().await;
        let Some(slot) = c.users.iter_mut().find(|u| u.id == id && !u.is_deleted) else {
            return Ok(false);
        };
        slot.is_deleted = true;
        slot.delete_date = Some(at);
        Ok(true)
    }

    async fn insert_opportunity(&self, opp: &Opportunity) -> StoreResult<()> {
        schema::check_opportunity(opp)?;
        let mut c = self.inner.write().await;
        reject_duplicate_id(&c.opportunities, opp.id, |o| o.id)?;
        if c
            .opportunities
            .iter()
            .any(|o| !o.is_deleted && o.same_key(&opp.title, opp.date))
        {
            return Err(StoreError::Duplicate { key: OPPORTUNITY_KEY });
        }
        c.opportunities.push(opp.clone());
        Ok(())
    }

    async fn find_opportunity(&self, id: Uuid) -> StoreResult<Option<Opportunity>> {
        let c = self.inner.read().await;
        Ok(c.opportunities
            .iter()
            .find(|o| o.id == id && !o.is_deleted)
            .cloned())
    }

    async fn find_opportunity_by_key(
        &self,
        title: &str,
        date: Date,
    ) -> StoreResult<Option<Opportunity>> {
        let c = self.inner.read().await;
        Ok(c.opportunities
            .iter()
            .find(|o| !o.is_deleted && o.same_key(title, date))
            .cloned())
    }

    async fn find_opportunity_raw(&self, id: Uuid) -> StoreResult<Option<Opportunity>> {
        let c = self.inner.read().await;
        Ok(c.opportunities.iter().find(|o| o.id == id).cloned())
    }

    async fn list_opportunities(&self) -> StoreResult<Vec<Opportunity>> {
        let c = self.inner.read().await;
        Ok(c.opportunities
            .iter()
            .filter(|o| !o.is_deleted)
            .cloned()
            .collect())
    }

    async fn update_opportunity(&self, opp: &Opportunity) -> StoreResult<bool> {
        schema::check_opportunity(opp)?;
        let mut c = self.inner.write().await;
        if c
            .opportunities
            .iter()
            .any(|o| o.id != opp.id && !o.is_deleted && o.same_key(&opp.title, opp.date))
        {
            return Err(StoreError::Duplicate { key: OPPORTUNITY_KEY });
        }
        let Some(slot) = c
            .opportunities
            .iter_mut()
            .find(|o| o.id == opp.id && !o.is_deleted)
        else {
            return Ok(false);
        };
        *slot = Opportunity {
            created_at: slot.created_at,
            is_deleted: false,
            delete_date: None,
            ..opp.clone()
        };
        Ok(true)
    }

    async fn soft_delete_opportunity(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let mut c = self.inner.write().await;
        let Some(slot) = c
            .opportunities
            .iter_mut()
            .find(|o| o.id == id && !o.is_deleted)
        else {
            return Ok(false);
        };
        slot.is_deleted = true;
        slot.delete_date = Some(at);
        Ok(true)
    }

    async fn insert_association(&self, assoc: &Association) -> StoreResult<()> {
        schema::check_association(assoc)?;
        let mut c = self.inner.write().await;
        reject_duplicate_id(&c.associations, assoc.id, |a| a.id)?;
        if c.associations.iter().any(|a| {
            !a.is_deleted && a.user_id == assoc.user_id && a.opportunity_id == assoc.opportunity_id
        }) {
            return Err(StoreError::Duplicate { key: SIGNUP_KEY });
        }
        c.associations.push(assoc.clone());
        Ok(())
    }

    async fn find_association(&self, id: Uuid) -> StoreResult<Option<Association>> {
        let c = self.inner.read().await;
        Ok(c.associations
            .iter()
            .find(|a| a.id == id && !a.is_deleted)
            .cloned())
    }

    async fn find_active_signup(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> StoreResult<Option<Association>> {
        let c = self.inner.read().await;
        Ok(c.associations
            .iter()
            .find(|a| !a.is_deleted && a.user_id == user_id && a.opportunity_id == opportunity_id)
            .cloned())
    }

    async fn find_association_raw(&self, id: Uuid) -> StoreResult<Option<Association>> {
        let c = self.inner.read().await;
        Ok(c.associations.iter().find(|a| a.id == id).cloned())
    }

    async fn list_associations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Association>> {
        let c = self.inner.read().await;
        Ok(c.associations
            .iter()
            .filter(|a| !a.is_deleted && a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn approve_association(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut c = self.inner.write().await;
        let Some(slot) = c
            .associations
            .iter_mut()
            .find(|a| a.id == id && !a.is_deleted)
        else {
            return Ok(false);
        };
        slot.approved_by = Some(approved_by);
        slot.approved_on = Some(at);
        Ok(true)
    }

    async fn soft_delete_association(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<bool> {
        let mut c = self.inner.write().await;
        let Some(slot) = c
            .associations
            .iter_mut()
            .find(|a| a.id == id && !a.is_deleted)
        else {
            return Ok(false);
        };
        slot.is_deleted = true;
        slot.delete_date = Some(at);
        Ok(true)
    }
}
