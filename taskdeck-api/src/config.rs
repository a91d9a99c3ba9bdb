/// Configuration management for the API server
///
/// Loads configuration from environment variables into a type-safe struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 4000)
/// - `ACCESS_TOKEN_SECRET`: Secret for signing access tokens (required)
/// - `REFRESH_TOKEN_SECRET`: Secret for signing refresh tokens (required,
///   must differ from the access secret)
/// - `ACCESS_TOKEN_TTL_MINUTES`: Access token lifetime (default: 15)
/// - `REFRESH_TOKEN_TTL_DAYS`: Refresh token lifetime (default: 7)
/// - `FRONTEND_ORIGIN`: Allowed browser origin for CORS
///   (default: http://localhost:3000)
/// - `APP_ENV`: "production" enables Secure cookies
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token signing configuration
    pub tokens: TokenConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed browser origin for cross-origin requests
    pub frontend_origin: String,

    /// Whether this is a production deployment (hardens cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token signing configuration
///
/// Access and refresh secrets must differ so a token of one type can never
/// validate as the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Secret for signing access tokens
    pub access_secret: String,

    /// Secret for signing refresh tokens
    pub refresh_secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing, values fail to
    /// parse, or the two token secrets are identical
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()?;

        let frontend_origin = env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let production = env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let access_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_SECRET environment variable is required"))?;

        let refresh_secret = env::var("REFRESH_TOKEN_SECRET").map_err(|_| {
            anyhow::anyhow!("REFRESH_TOKEN_SECRET environment variable is required")
        })?;

        if access_secret == refresh_secret {
            anyhow::bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }

        let access_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<i64>()?;

        let refresh_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i64>()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                frontend_origin,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            tokens: TokenConfig {
                access_secret,
                refresh_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 4000,
                frontend_origin: "http://localhost:3000".to_string(),
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            tokens: TokenConfig {
                access_secret: "test-access-secret".to_string(),
                refresh_secret: "test-refresh-secret".to_string(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 7,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:4000");
    }

    #[test]
    fn test_default_token_lifetimes() {
        let config = test_config();
        assert_eq!(config.tokens.access_ttl_minutes, 15);
        assert_eq!(config.tokens.refresh_ttl_days, 7);
    }
}
