use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use tokio::sync::RwLock;

use super::{FeedQuery, LinkField, LinkOrder, Store};
use crate::error::{Error, Result};
use crate::models::{Link, NewLink, NewUser, Sort, User, UserRecord, Vote};

// In-process store used when no database is configured, and by the tests.
// Ids come from per-table counters and are never reused.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    links: Vec<Link>,
    users: Vec<UserRecord>,
    votes: Vec<Vote>,
    last_link_id: i32,
    last_user_id: i32,
    last_vote_id: i32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(link: &Link, filter: Option<&str>) -> bool {
    match filter {
        Some(f) => link.description.contains(f) || link.url.contains(f),
        None => true,
    }
}

fn compare(a: &Link, b: &Link, order_by: &[LinkOrder]) -> Ordering {
    for order in order_by {
        let ordering = match order.field {
            LinkField::Description => a.description.cmp(&b.description),
            LinkField::Url => a.url.cmp(&b.url),
            LinkField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let ordering = match order.direction {
            Sort::Asc => ordering,
            Sort::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.id.cmp(&b.id)
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_link(&self, id: i32) -> Result<Option<Link>> {
        let tables = self.tables.read().await;
        Ok(tables.links.iter().find(|l| l.id == id).cloned())
    }

    async fn links_by_ids(&self, ids: &[i32]) -> Result<Vec<Link>> {
        let tables = self.tables.read().await;
        Ok(tables.links.iter().filter(|l| ids.contains(&l.id)).cloned().collect())
    }

    async fn list_links(&self, query: &FeedQuery) -> Result<Vec<Link>> {
        let tables = self.tables.read().await;
        let mut links: Vec<Link> = tables
            .links
            .iter()
            .filter(|l| matches(l, query.filter()))
            .cloned()
            .collect();
        links.sort_by(|a, b| compare(a, b, &query.order_by));

        let skip = query.skip.unwrap_or(0).max(0) as usize;
        let take = query.take.map_or(usize::MAX, |t| t.max(0) as usize);
        Ok(links.into_iter().skip(skip).take(take).collect())
    }

    async fn count_links(&self, filter: Option<&str>) -> Result<i64> {
        let filter = filter.filter(|f| !f.is_empty());
        let tables = self.tables.read().await;
        Ok(tables.links.iter().filter(|l| matches(l, filter)).count() as i64)
    }

    async fn create_link(&self, link: NewLink) -> Result<Link> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == link.posted_by_id) {
            return Err(Error::not_found("User", link.posted_by_id));
        }
        tables.last_link_id += 1;
        let link = Link {
            id: tables.last_link_id,
            description: link.description,
            url: link.url,
            created_at: Utc::now(),
            posted_by_id: Some(link.posted_by_id),
        };
        tables.links.push(link.clone());
        Ok(link)
    }

    async fn update_link(&self, id: i32, description: String, url: String) -> Result<Link> {
        let mut tables = self.tables.write().await;
        let link = tables
            .links
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| Error::not_found("Link", id))?;
        link.description = description;
        link.url = url;
        Ok(link.clone())
    }

    async fn delete_link(&self, id: i32) -> Result<Link> {
        let mut tables = self.tables.write().await;
        let index = tables
            .links
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| Error::not_found("Link", id))?;
        let link = tables.links.remove(index);
        // Same cascade as the votes.link_id foreign key
        tables.votes.retain(|v| v.link_id != id);
        Ok(link)
    }

    async fn links_posted_by(&self, user_ids: &[i32]) -> Result<Vec<Link>> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| l.posted_by_id.is_some_and(|u| user_ids.contains(&u)))
            .cloned()
            .collect())
    }

    async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .map(User::from)
            .collect())
    }

    async fn voters_of(&self, link_ids: &[i32]) -> Result<Vec<(i32, User)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| link_ids.contains(&v.link_id))
            .filter_map(|v| {
                let user = tables.users.iter().find(|u| u.id == v.user_id)?;
                Some((v.link_id, User::from(user.clone())))
            })
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(Error::Conflict(format!(
                "A user with email {} already exists",
                user.email
            )));
        }
        tables.last_user_id += 1;
        let record = UserRecord {
            id: tables.last_user_id,
            name: user.name,
            email: user.email,
            password: user.password,
        };
        tables.users.push(record.clone());
        info!("Created user {}", record.id);
        Ok(record.into())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_vote(&self, link_id: i32, user_id: i32) -> Result<Vote> {
        let mut tables = self.tables.write().await;
        if !tables.links.iter().any(|l| l.id == link_id) {
            return Err(Error::not_found("Link", link_id));
        }
        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(Error::not_found("User", user_id));
        }
        if tables.votes.iter().any(|v| v.link_id == link_id && v.user_id == user_id) {
            return Err(Error::Conflict(format!(
                "User {user_id} already voted for link {link_id}"
            )));
        }
        tables.last_vote_id += 1;
        let vote = Vote {
            id: tables.last_vote_id,
            link_id,
            user_id,
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn close(&self) {}
}
