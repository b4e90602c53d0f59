pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod graphql;
pub mod metrics;
pub mod models;

pub use config::Config;
pub use context::{RequestContext, Viewer};
pub use error::{Error, Result};
pub use graphql::AppState;
pub use models::{Link, User, Vote};
