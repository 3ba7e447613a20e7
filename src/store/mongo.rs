use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{bson::doc, Client, Collection, Database, IndexModel};

use super::Store;
use crate::error::{StoreError, StoreResult, UniqueField};
use crate::schemas::{Expense, Group, GroupId, Membership, User, UserId};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            database: client.database(database),
        })
    }

    fn users(&self) -> Collection<User> {
        self.database.collection("users")
    }

    fn groups(&self) -> Collection<Group> {
        self.database.collection("groups")
    }

    fn memberships(&self) -> Collection<Membership> {
        self.database.collection("memberships")
    }

    fn expenses(&self) -> Collection<Expense> {
        self.database.collection("expenses")
    }
}

fn oldest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "_id": 1 }).build()
}

fn unique_index(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// The server names the violated index in the write error, e.g.
/// `E11000 duplicate key error collection: db.users index: username_1 dup key: ...`.
/// Only the index name is consulted, since the duplicated value may itself
/// contain the word "username".
fn duplicate_user_field(err: &mongodb::error::Error) -> UniqueField {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            unique_field_from_message(&write_error.message)
        }
        _ => UniqueField::Email,
    }
}

fn unique_field_from_message(message: &str) -> UniqueField {
    if message.contains("index: username_1") {
        UniqueField::Username
    } else {
        UniqueField::Email
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ensure_indexes(&self) -> StoreResult<()> {
        self.users()
            .create_index(unique_index(doc! { "email": 1 }), None)
            .await?;
        self.users()
            .create_index(unique_index(doc! { "username": 1 }), None)
            .await?;
        self.memberships()
            .create_index(unique_index(doc! { "group_id": 1, "user_id": 1 }), None)
            .await?;
        self.memberships()
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build(), None)
            .await?;
        self.expenses()
            .create_index(IndexModel::builder().keys(doc! { "group_id": 1 }).build(), None)
            .await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        match self.users().insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                Err(StoreError::Duplicate(duplicate_user_field(&err)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let cursor = self
            .users()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.groups().insert_one(group, None).await?;
        Ok(())
    }

    async fn find_group(&self, id: GroupId) -> StoreResult<Option<Group>> {
        Ok(self.groups().find_one(doc! { "_id": id }, None).await?)
    }

    async fn groups_for_user(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        let memberships: Vec<Membership> = self
            .memberships()
            .find(doc! { "user_id": user_id }, None)
            .await?
            .try_collect()
            .await?;
        let group_ids: Vec<GroupId> = memberships.into_iter().map(|m| m.group_id).collect();
        let cursor = self
            .groups()
            .find(doc! { "_id": { "$in": group_ids } }, oldest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        match self.memberships().insert_one(membership, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn members_of(&self, group_id: GroupId) -> StoreResult<Vec<Membership>> {
        let cursor = self
            .memberships()
            .find(doc! { "group_id": group_id }, oldest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        self.expenses().insert_one(expense, None).await?;
        Ok(())
    }

    async fn expenses_of(&self, group_id: GroupId) -> StoreResult<Vec<Expense>> {
        let cursor = self
            .expenses()
            .find(doc! { "group_id": group_id }, oldest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_field_comes_from_the_index_name() {
        let username = "E11000 duplicate key error collection: ExpenseSplitter.users \
                        index: username_1 dup key: { username: \"alice\" }";
        assert_eq!(unique_field_from_message(username), UniqueField::Username);

        let email = "E11000 duplicate key error collection: ExpenseSplitter.users \
                     index: email_1 dup key: { email: \"username@example.com\" }";
        assert_eq!(unique_field_from_message(email), UniqueField::Email);
    }
}
