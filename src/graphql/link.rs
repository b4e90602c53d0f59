use async_graphql::{
    ComplexObject, Context, ErrorExtensions, InputObject, MaybeUndefined, Object, Result, SimpleObject, ID,
};
use serde::Serialize;

use super::loaders::{Loaders, UserKey, VotersKey};
use crate::context::RequestContext;
use crate::database::{FeedQuery, LinkField, LinkOrder};
use crate::error::{parse_id, Error};
use crate::models::{Link, NewLink, Sort, User};

#[derive(InputObject, Serialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinkOrderByInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Sort>,
}

impl LinkOrderByInput {
    fn orders(&self) -> impl Iterator<Item = LinkOrder> {
        [
            (LinkField::Description, self.description),
            (LinkField::Url, self.url),
            (LinkField::CreatedAt, self.created_at),
        ]
        .into_iter()
        .filter_map(|(field, direction)| direction.map(|direction| LinkOrder { field, direction }))
    }
}

// A page of links plus the total matching the filter.
#[derive(SimpleObject, Debug)]
pub struct Feed {
    pub links: Vec<Link>,
    pub count: i32,
    pub id: Option<ID>,
}

// The feed arguments as the client supplied them, used for the cache key.
// Omitted arguments are left out of the key; explicit nulls are kept.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedArgs {
    #[serde(skip_serializing_if = "MaybeUndefined::is_undefined")]
    pub filter: MaybeUndefined<String>,
    #[serde(skip_serializing_if = "MaybeUndefined::is_undefined")]
    pub skip: MaybeUndefined<i32>,
    #[serde(skip_serializing_if = "MaybeUndefined::is_undefined")]
    pub take: MaybeUndefined<i32>,
    #[serde(skip_serializing_if = "MaybeUndefined::is_undefined")]
    pub order_by: MaybeUndefined<Vec<LinkOrderByInput>>,
}

impl FeedArgs {
    pub fn cache_key(&self) -> String {
        format!("main-feed:{}", serde_json::to_string(self).unwrap_or_default())
    }

    // A null argument behaves like an omitted one
    pub fn to_query(&self) -> crate::Result<FeedQuery> {
        let skip = self.skip.value().copied();
        let take = self.take.value().copied();
        if skip.is_some_and(|s| s < 0) {
            return Err(Error::InvalidArgument("skip must not be negative".into()));
        }
        if take.is_some_and(|t| t < 0) {
            return Err(Error::InvalidArgument("take must not be negative".into()));
        }
        Ok(FeedQuery {
            filter: self.filter.value().cloned(),
            skip: skip.map(i64::from),
            take: take.map(i64::from),
            order_by: self
                .order_by
                .value()
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .flat_map(LinkOrderByInput::orders)
                .collect(),
        })
    }
}

// The store counts in i64; a total past the Int range is reported, not clamped
fn feed_count(count: i64) -> crate::Result<i32> {
    i32::try_from(count).map_err(|_| Error::CountOverflow(count))
}

#[ComplexObject]
impl Link {
    async fn posted_by(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let Some(user_id) = self.posted_by_id else {
            return Ok(None);
        };
        ctx.data::<Loaders>()?
            .load_one(UserKey(user_id))
            .await
            .map_err(|e| e.extend())
    }

    async fn voters(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let voters = ctx
            .data::<Loaders>()?
            .load_one(VotersKey(self.id))
            .await
            .map_err(|e| e.extend())?;
        Ok(voters.unwrap_or_default())
    }
}

#[derive(Default)]
pub struct LinkQuery;

#[Object]
impl LinkQuery {
    // Filtered, sorted, paginated links with the total count for the filter
    async fn feed(
        &self,
        ctx: &Context<'_>,
        filter: MaybeUndefined<String>,
        skip: MaybeUndefined<i32>,
        take: MaybeUndefined<i32>,
        order_by: MaybeUndefined<Vec<LinkOrderByInput>>,
    ) -> Result<Feed> {
        let rc = ctx.data::<RequestContext>()?;
        let args = FeedArgs {
            filter,
            skip,
            take,
            order_by,
        };
        let query = args.to_query().map_err(|e| e.extend())?;

        // List and count are separate reads and may disagree under concurrent writes
        let links = rc.db.list_links(&query).await.map_err(|e| e.extend())?;
        let count = rc.db.count_links(query.filter()).await.map_err(|e| e.extend())?;

        Ok(Feed {
            links,
            count: feed_count(count).map_err(|e| e.extend())?,
            id: Some(ID::from(args.cache_key())),
        })
    }

    async fn link(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Link>> {
        let rc = ctx.data::<RequestContext>()?;
        let id = parse_id(&id).map_err(|e| e.extend())?;
        rc.db.find_link(id).await.map_err(|e| e.extend())
    }
}

// Checks login and ownership before a write touching an existing link
async fn authorize_owner(rc: &RequestContext, action: &'static str, id: &ID) -> crate::Result<i32> {
    let user_id = rc.viewer.require(action)?;
    let id = parse_id(id)?;
    let link = rc
        .db
        .find_link(id)
        .await?
        .ok_or_else(|| Error::not_found("Link", id))?;
    if link.posted_by_id != Some(user_id) {
        return Err(Error::Forbidden { action, id });
    }
    Ok(id)
}

#[derive(Default)]
pub struct LinkMutation;

#[Object]
impl LinkMutation {
    async fn post(&self, ctx: &Context<'_>, description: String, url: String) -> Result<Link> {
        let rc = ctx.data::<RequestContext>()?;
        let user_id = rc.viewer.require("post").map_err(|e| e.extend())?;
        let link = NewLink {
            description,
            url,
            posted_by_id: user_id,
        };
        rc.db.create_link(link).await.map_err(|e| e.extend())
    }

    async fn update(&self, ctx: &Context<'_>, id: ID, description: String, url: String) -> Result<Link> {
        let rc = ctx.data::<RequestContext>()?;
        let id = authorize_owner(rc, "update", &id).await.map_err(|e| e.extend())?;
        rc.db
            .update_link(id, description, url)
            .await
            .map_err(|e| e.extend())
    }

    async fn delete(&self, ctx: &Context<'_>, id: ID) -> Result<Link> {
        let rc = ctx.data::<RequestContext>()?;
        let id = authorize_owner(rc, "delete", &id).await.map_err(|e| e.extend())?;
        rc.db.delete_link(id).await.map_err(|e| e.extend())
    }
}
