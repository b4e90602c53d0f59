// Batched relation loading: every key requested during one execution tick is
// resolved with a single store call per relation kind.
use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dataloader::{DataLoader, Loader};

use crate::database::Db;
use crate::error::Error;
use crate::models::{Link, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserKey(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkKey(pub i32);

// Users who voted for the link with this id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VotersKey(pub i32);

// Links posted by the user with this id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostedLinksKey(pub i32);

pub struct StoreLoader {
    db: Db,
}

pub type Loaders = DataLoader<StoreLoader>;

// One loader per request so batches never mix callers
pub fn request_loader(db: Db) -> Loaders {
    DataLoader::new(StoreLoader { db }, tokio::spawn)
}

impl Loader<UserKey> for StoreLoader {
    type Value = User;
    type Error = Arc<Error>;

    async fn load(&self, keys: &[UserKey]) -> Result<HashMap<UserKey, User>, Self::Error> {
        let ids: Vec<i32> = keys.iter().map(|k| k.0).collect();
        let users = self.db.users_by_ids(&ids).await.map_err(Arc::new)?;
        Ok(users.into_iter().map(|u| (UserKey(u.id), u)).collect())
    }
}

impl Loader<LinkKey> for StoreLoader {
    type Value = Link;
    type Error = Arc<Error>;

    async fn load(&self, keys: &[LinkKey]) -> Result<HashMap<LinkKey, Link>, Self::Error> {
        let ids: Vec<i32> = keys.iter().map(|k| k.0).collect();
        let links = self.db.links_by_ids(&ids).await.map_err(Arc::new)?;
        Ok(links.into_iter().map(|l| (LinkKey(l.id), l)).collect())
    }
}

impl Loader<VotersKey> for StoreLoader {
    type Value = Vec<User>;
    type Error = Arc<Error>;

    async fn load(&self, keys: &[VotersKey]) -> Result<HashMap<VotersKey, Vec<User>>, Self::Error> {
        let ids: Vec<i32> = keys.iter().map(|k| k.0).collect();
        let pairs = self.db.voters_of(&ids).await.map_err(Arc::new)?;
        let mut voters: HashMap<VotersKey, Vec<User>> = HashMap::new();
        for (link_id, user) in pairs {
            voters.entry(VotersKey(link_id)).or_default().push(user);
        }
        Ok(voters)
    }
}

impl Loader<PostedLinksKey> for StoreLoader {
    type Value = Vec<Link>;
    type Error = Arc<Error>;

    async fn load(
        &self,
        keys: &[PostedLinksKey],
    ) -> Result<HashMap<PostedLinksKey, Vec<Link>>, Self::Error> {
        let ids: Vec<i32> = keys.iter().map(|k| k.0).collect();
        let links = self.db.links_posted_by(&ids).await.map_err(Arc::new)?;
        let mut posted: HashMap<PostedLinksKey, Vec<Link>> = HashMap::new();
        for link in links {
            if let Some(user_id) = link.posted_by_id {
                posted.entry(PostedLinksKey(user_id)).or_default().push(link);
            }
        }
        Ok(posted)
    }
}
