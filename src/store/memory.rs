use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;
use crate::error::{StoreError, StoreResult, UniqueField};
use crate::schemas::{Expense, Group, GroupId, Membership, User, UserId};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    expenses: Vec<Expense>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    #[cfg(test)]
    pub async fn expense_count(&self) -> usize {
        self.tables.read().await.expenses.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_indexes(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.tables.write().await.groups.push(group.clone());
        Ok(())
    }

    async fn find_group(&self, id: GroupId) -> StoreResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn groups_for_user(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let group_ids: Vec<GroupId> = tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.group_id)
            .collect();
        Ok(tables
            .groups
            .iter()
            .filter(|g| group_ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .memberships
            .iter()
            .any(|m| m.group_id == membership.group_id && m.user_id == membership.user_id);
        if !exists {
            tables.memberships.push(membership.clone());
        }
        Ok(())
    }

    async fn members_of(&self, group_id: GroupId) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        self.tables.write().await.expenses.push(expense.clone());
        Ok(())
    }

    async fn expenses_of(&self, group_id: GroupId) -> StoreResult<Vec<Expense>> {
        let tables = self.tables.read().await;
        Ok(tables
            .expenses
            .iter()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }
}
