use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = ObjectId;
pub type GroupId = ObjectId;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            username,
            email,
            password_hash,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: GroupId,
    pub name: String,
    pub created_by: UserId,
}

impl Group {
    pub fn new(name: String, created_by: UserId) -> Self {
        Self {
            id: ObjectId::new(),
            name,
            created_by,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Membership {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub group_id: GroupId,
    pub user_id: UserId,
}

impl Membership {
    pub fn new(group_id: GroupId, user_id: UserId) -> Self {
        Self {
            id: ObjectId::new(),
            group_id,
            user_id,
        }
    }
}

/// Largest amount a single expense may record. Keeps group totals and the
/// cent rounding in the balance calculation far from `f64` overflow.
pub const MAX_AMOUNT: f64 = 1e12;

/// A payment made in full by `paid_by` on behalf of the whole group.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub group_id: GroupId,
    pub paid_by: UserId,
    pub description: String,
    pub amount: f64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(group_id: GroupId, paid_by: UserId, description: String, amount: f64) -> Self {
        Self {
            id: ObjectId::new(),
            group_id,
            paid_by,
            description,
            amount,
            created_at: Utc::now(),
        }
    }
}
