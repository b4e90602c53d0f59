use async_graphql::{ComplexObject, Context, ErrorExtensions, Object, Result, ID};

use super::loaders::{LinkKey, Loaders, UserKey};
use crate::context::RequestContext;
use crate::error::{parse_id, Error};
use crate::models::{Link, User, Vote};

#[ComplexObject]
impl Vote {
    async fn link(&self, ctx: &Context<'_>) -> Result<Link> {
        ctx.data::<Loaders>()?
            .load_one(LinkKey(self.link_id))
            .await
            .map_err(|e| e.extend())?
            .ok_or_else(|| Error::not_found("Link", self.link_id).extend())
    }

    async fn user(&self, ctx: &Context<'_>) -> Result<User> {
        ctx.data::<Loaders>()?
            .load_one(UserKey(self.user_id))
            .await
            .map_err(|e| e.extend())?
            .ok_or_else(|| Error::not_found("User", self.user_id).extend())
    }
}

#[derive(Default)]
pub struct VoteMutation;

#[Object]
impl VoteMutation {
    async fn vote(&self, ctx: &Context<'_>, link_id: ID) -> Result<Vote> {
        let rc = ctx.data::<RequestContext>()?;
        let user_id = rc.viewer.require("vote").map_err(|e| e.extend())?;
        let link_id = parse_id(&link_id).map_err(|e| e.extend())?;
        rc.db.create_vote(link_id, user_id).await.map_err(|e| e.extend())
    }
}
