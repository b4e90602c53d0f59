use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SimpleObject, sqlx::FromRow)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: i32,
    pub description: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[graphql(skip)]
    pub posted_by_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SimpleObject, sqlx::FromRow)]
#[graphql(complex)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
}

// A user row including the password hash, never handed to GraphQL
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            name: record.name,
            email: record.email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SimpleObject, sqlx::FromRow)]
#[graphql(complex)]
pub struct Vote {
    pub id: i32,
    #[graphql(skip)]
    pub link_id: i32,
    #[graphql(skip)]
    pub user_id: i32,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Enum, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    pub fn sql(self) -> &'static str {
        match self {
            Sort::Asc => "ASC",
            Sort::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLink {
    pub description: String,
    pub url: String,
    pub posted_by_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String, // Already hashed
}
