use std::sync::Arc;

use async_graphql::{EmptySubscription, MergedObject, Schema};

use super::link::{LinkMutation, LinkQuery};
use super::user::AuthMutation;
use super::vote::VoteMutation;
use crate::auth::Auth;

// Root object for GraphQL queries
#[derive(MergedObject, Default)]
pub struct QueryRoot(LinkQuery);

// Root object for GraphQL mutations
#[derive(MergedObject, Default)]
pub struct MutationRoot(LinkMutation, VoteMutation, AuthMutation);

pub type LinkSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

// The auth service is schema-wide; the store handle and viewer are attached per request
pub fn build_schema(auth: Arc<Auth>) -> LinkSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(auth)
        .finish()
}
