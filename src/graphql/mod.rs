// GraphQL module for the application state, schema and resolvers
pub mod link;
pub mod loaders;
pub mod routes;
pub mod schema;
pub mod user;
pub mod vote;

// Re-export key types for external use
pub use link::{Feed, LinkOrderByInput};
pub use routes::{graphiql, graphql};
pub use schema::{build_schema, LinkSchema, MutationRoot, QueryRoot};

use std::sync::Arc;

use log::warn;

use crate::auth::Auth;
use crate::config::Config;
use crate::context::RequestContext;
use crate::database::Db;
use crate::metrics::{GRAPHQL_ERRORS, GRAPHQL_REQUESTS, GRAPHQL_REQUEST_SECONDS};

// Application state shared by every HTTP worker
#[derive(Clone)]
pub struct AppState {
    pub db: Db, // Store handle, injected into each request's context
    pub auth: Arc<Auth>, // Token and password service
    pub schema: LinkSchema, // GraphQL schema instance
}

impl AppState {
    pub fn new(db: Db, config: &Config) -> Self {
        Self::with_auth(db, Auth::from_config(config))
    }

    pub fn with_auth(db: Db, auth: Auth) -> Self {
        let auth = Arc::new(auth);
        AppState {
            db,
            schema: build_schema(auth.clone()),
            auth,
        }
    }

    // Builds the request context from the Authorization header and runs the request
    pub async fn execute(
        &self,
        request: async_graphql::Request,
        authorization: Option<&str>,
    ) -> async_graphql::Response {
        let context = RequestContext::build(self.db.clone(), &self.auth, authorization);
        let request = request
            .data(context)
            .data(loaders::request_loader(self.db.clone()));

        let timer = GRAPHQL_REQUEST_SECONDS.start_timer();
        let response = self.schema.execute(request).await;
        timer.observe_duration();

        GRAPHQL_REQUESTS.inc();
        if response.is_err() {
            GRAPHQL_ERRORS.inc();
            for error in &response.errors {
                warn!("GraphQL error: {}", error.message);
            }
        }
        response
    }
}
