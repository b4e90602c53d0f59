use std::env;
use std::str::FromStr;

// Configuration for the links GraphQL service
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String, // Address the HTTP server binds to
    pub port: u16, // Port for the HTTP server
    pub app_secret: String, // Shared secret for signing and verifying JWTs
    pub database_url: Option<String>, // PostgreSQL URL; in-memory store when absent
    pub max_connections: u32, // Upper bound for the PostgreSQL pool
    pub token_ttl_hours: i64, // Lifetime of issued tokens, 0 disables `exp`
    pub bcrypt_cost: u32, // Work factor for password hashes
}

type ConfigError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            app_secret: String::new(),
            database_url: None,
            max_connections: 10,
            token_ttl_hours: 720,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    // Loads configuration from environment variables, with defaults for optional fields
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let config = Config {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", &lookup, defaults.port)?,
            // An unset secret is accepted; main warns about it
            app_secret: lookup("APP_SECRET").unwrap_or_default(),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", &lookup, defaults.max_connections)?,
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", &lookup, defaults.token_ttl_hours)?,
            bcrypt_cost: parse_or("BCRYPT_COST", &lookup, defaults.bcrypt_cost)?,
        };

        if config.max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be at least 1".into());
        }
        if config.token_ttl_hours < 0 {
            return Err("TOKEN_TTL_HOURS must not be negative".into());
        }
        if !(4..=31).contains(&config.bcrypt_cost) {
            return Err("BCRYPT_COST must be between 4 and 31".into());
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {raw}").into()),
        None => Ok(default),
    }
}
