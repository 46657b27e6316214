
use crate::search::PageLimits;

const PLACEHOLDER_SECRET: &str = "CHANGE_ME_JWT_SECRET";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub jwt_secret: String,
    /// Access token lifetime. Set via JWT_EXPIRES_IN_SECS. Default: 3600.
    pub jwt_expires_in_secs: i64,
    pub search_default_limit: i64,
    pub search_max_limit: i64,
    /// JSON file listing `{clientId, secretHash, scopes}` entries; `secretHash` is an argon2 PHC string.
    /// Without it no client can log in.
    pub clients_file: Option<String>,
}

impl Config {
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.search_default_limit,
            max_limit: self.search_max_limit,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let jwt_secret =
        std::env::var("JWT_ACCESS_TOKEN_SECRET").unwrap_or_else(|_| PLACEHOLDER_SECRET.into());

    if jwt_secret == PLACEHOLDER_SECRET {
        let env_mode = std::env::var("LISTINGS_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "JWT_ACCESS_TOKEN_SECRET is still the insecure placeholder. \
                 Set a proper secret before running in production."
            );
        }
        eprintln!("⚠️  JWT_ACCESS_TOKEN_SECRET is not set, using insecure placeholder.");
    }

    let search_max_limit = env_or("SEARCH_MAX_LIMIT", 100i64).max(1);
    let search_default_limit = env_or("SEARCH_DEFAULT_LIMIT", 10i64).clamp(1, search_max_limit);

    Ok(Config {
        port: env_or("LISTINGS_PORT", 3000),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/listings".into()),
        database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        jwt_secret,
        jwt_expires_in_secs: env_or("JWT_EXPIRES_IN_SECS", 3600),
        search_default_limit,
        search_max_limit,
        clients_file: std::env::var("CLIENTS_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty()),
    })
}
