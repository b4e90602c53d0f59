use log::debug;

use crate::auth::Auth;
use crate::database::Db;
use crate::error::{Error, Result};
use crate::metrics::AUTH_FAILURES;

// Who is making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Authenticated(i32),
    Anonymous,
}

impl Viewer {
    // A missing or unusable header is not an error here; protected
    // operations reject `Anonymous` themselves.
    pub fn from_header(auth: &Auth, header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Viewer::Anonymous;
        };
        match auth.decode_header(header) {
            Ok(claims) => claims.user_id.map_or(Viewer::Anonymous, Viewer::Authenticated),
            Err(e) => {
                AUTH_FAILURES.inc();
                debug!("Treating request as anonymous: {}", e);
                Viewer::Anonymous
            }
        }
    }

    pub fn user_id(&self) -> Option<i32> {
        match self {
            Viewer::Authenticated(id) => Some(*id),
            Viewer::Anonymous => None,
        }
    }

    // Returns the caller's id, or `Unauthenticated` naming the attempted action.
    pub fn require(&self, action: &'static str) -> Result<i32> {
        self.user_id().ok_or(Error::Unauthenticated(action))
    }
}

// Per-request dependencies every resolver reads.
#[derive(Clone)]
pub struct RequestContext {
    pub db: Db,
    pub viewer: Viewer,
}

impl RequestContext {
    pub fn new(db: Db, viewer: Viewer) -> Self {
        RequestContext { db, viewer }
    }

    pub fn build(db: Db, auth: &Auth, header: Option<&str>) -> Self {
        Self::new(db, Viewer::from_header(auth, header))
    }
}
