// Persistence layer: the `Store` trait resolvers delegate to, plus its implementations
pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{Link, NewLink, NewUser, Sort, User, UserRecord, Vote};

// Shared store handle, opened at startup and passed into every request.
pub type Db = Arc<dyn Store>;

// Columns a feed can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    Description,
    Url,
    CreatedAt,
}

impl LinkField {
    pub fn column(self) -> &'static str {
        match self {
            LinkField::Description => "description",
            LinkField::Url => "url",
            LinkField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOrder {
    pub field: LinkField,
    pub direction: Sort,
}

// A filtered, sorted page of links. Ties always fall back to id ascending.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub filter: Option<String>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub order_by: Vec<LinkOrder>,
}

impl FeedQuery {
    // Empty filters match everything, so they are dropped
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref().filter(|f| !f.is_empty())
    }
}

// Every delegated read and write the GraphQL layer performs.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_link(&self, id: i32) -> Result<Option<Link>>;
    async fn links_by_ids(&self, ids: &[i32]) -> Result<Vec<Link>>;
    async fn list_links(&self, query: &FeedQuery) -> Result<Vec<Link>>;
    async fn count_links(&self, filter: Option<&str>) -> Result<i64>;
    async fn create_link(&self, link: NewLink) -> Result<Link>;
    // Fails with `NotFound` when no link has this id.
    async fn update_link(&self, id: i32, description: String, url: String) -> Result<Link>;
    // Fails with `NotFound` when no link has this id.
    async fn delete_link(&self, id: i32) -> Result<Link>;
    async fn links_posted_by(&self, user_ids: &[i32]) -> Result<Vec<Link>>;

    async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>>;
    // Voters of each link, as `(link_id, voter)` pairs.
    async fn voters_of(&self, link_ids: &[i32]) -> Result<Vec<(i32, User)>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    // Fails with `NotFound` for an unknown link and `Conflict` for a repeated vote.
    async fn create_vote(&self, link_id: i32, user_id: i32) -> Result<Vote>;

    async fn close(&self);
}

// Opens PostgreSQL when a URL is configured, otherwise an in-memory store
pub async fn connect(config: &Config) -> Result<Db> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            info!("Connected to PostgreSQL");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; links are kept in memory and lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
