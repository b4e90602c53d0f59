use std::sync::Arc;

use async_graphql::{ComplexObject, Context, ErrorExtensions, Object, Result};
use log::info;

use super::loaders::{Loaders, PostedLinksKey};
use crate::auth::Auth;
use crate::context::RequestContext;
use crate::error::Error;
use crate::models::{AuthPayload, Link, NewUser, User};

#[ComplexObject]
impl User {
    async fn links(&self, ctx: &Context<'_>) -> Result<Vec<Link>> {
        let links = ctx
            .data::<Loaders>()?
            .load_one(PostedLinksKey(self.id))
            .await
            .map_err(|e| e.extend())?;
        Ok(links.unwrap_or_default())
    }
}

#[derive(Default)]
pub struct AuthMutation;

#[Object]
impl AuthMutation {
    async fn signup(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        name: String,
    ) -> Result<AuthPayload> {
        let rc = ctx.data::<RequestContext>()?;
        let auth = ctx.data::<Arc<Auth>>()?;
        let password = auth.hash_password(password).await.map_err(|e| e.extend())?;
        let user = rc
            .db
            .create_user(NewUser { name, email, password })
            .await
            .map_err(|e| e.extend())?;
        let token = auth.issue_token(user.id).map_err(|e| e.extend())?;
        info!("User {} signed up", user.id);
        Ok(AuthPayload { token, user })
    }

    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthPayload> {
        let rc = ctx.data::<RequestContext>()?;
        let auth = ctx.data::<Arc<Auth>>()?;
        let record = rc
            .db
            .find_user_by_email(&email)
            .await
            .map_err(|e| e.extend())?
            .ok_or_else(|| Error::InvalidCredentials.extend())?;
        let valid = auth
            .verify_password(password, record.password.clone())
            .await
            .map_err(|e| e.extend())?;
        if !valid {
            return Err(Error::InvalidCredentials.extend());
        }
        let token = auth.issue_token(record.id).map_err(|e| e.extend())?;
        Ok(AuthPayload { token, user: record.into() })
    }
}
