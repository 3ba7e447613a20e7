//! Persistence port.
//!
//! Handlers only see [`Store`]; `MongoStore` backs a real deployment and
//! `MemoryStore` keeps everything in process.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::schemas::{Expense, Group, GroupId, Membership, User, UserId};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Create the unique and lookup indexes the other operations rely on.
    async fn ensure_indexes(&self) -> StoreResult<()>;

    // === Users ===

    /// Fails with `StoreError::Duplicate` when the email or username is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Users matching `ids`; unknown ids are skipped.
    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;

    // === Groups ===

    async fn insert_group(&self, group: &Group) -> StoreResult<()>;

    async fn find_group(&self, id: GroupId) -> StoreResult<Option<Group>>;

    /// Groups `user_id` belongs to, oldest first.
    async fn groups_for_user(&self, user_id: UserId) -> StoreResult<Vec<Group>>;

    // === Memberships ===

    /// Enrolling someone who is already a member is a no-op.
    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()>;

    /// Memberships of a group in enrollment order.
    async fn members_of(&self, group_id: GroupId) -> StoreResult<Vec<Membership>>;

    // === Expenses ===

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()>;

    /// Expenses of a group in creation order.
    async fn expenses_of(&self, group_id: GroupId) -> StoreResult<Vec<Expense>>;
}
