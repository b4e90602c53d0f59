use async_graphql::ErrorExtensions;
use thiserror::Error;

// Errors raised by the store, the auth layer and the resolvers
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot {0} without logging in")]
    Unauthenticated(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not allowed to {action} link {id}")]
    Forbidden { action: &'static str, id: i32 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No token found")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Count {0} does not fit in a GraphQL Int")]
    CountOverflow(i64),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Error::NotFound { entity, id }
    }

    // Stable machine-readable code placed in `extensions.code`
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) | Error::InvalidCredentials => "UNAUTHENTICATED",
            Error::MissingToken | Error::InvalidToken(_) => "UNAUTHENTICATED",
            Error::Forbidden { .. } => "FORBIDDEN",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::InvalidArgument(_) => "BAD_USER_INPUT",
            Error::Database(_) | Error::Password(_) | Error::Task(_) | Error::CountOverflow(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }
}

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}

// Parses a GraphQL `ID` into the integer key the store uses.
pub fn parse_id(id: &async_graphql::ID) -> Result<i32> {
    id.parse::<i32>()
        .map_err(|_| Error::InvalidArgument(format!("`{}` is not a valid id", id.as_str())))
}
