//! Configuration management for the follow directory.
//!
//! This module provides the CLI and its configuration sources:
//! - Command-line arguments via clap
//! - Environment variables with the `FD_` prefix
//! - A `.env` file in the working directory, loaded before parsing
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` - Run the HTTP API
//! - `migrate` - Apply the database schema and exit
//! - `check` - Verify database and bucket connectivity
//!
//! # Environment Variables
//!
//! - `FD_HOST` - Server bind address (default: 0.0.0.0)
//! - `FD_PORT` - Server port (default: 3000)
//! - `FD_DATABASE_URL` - Postgres connection string (required)
//! - `FD_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `FD_DB_CONNECT_TIMEOUT` - Seconds to wait for a connection (default: 5)
//! - `FD_MIGRATE` - Apply the schema on startup (default: false)
//! - `FD_S3_BUCKET` - Bucket for profile images (required)
//! - `FD_S3_PREFIX` - Key prefix inside the bucket
//! - `FD_S3_ENDPOINT` - Custom endpoint for S3-compatible services
//! - `FD_S3_REGION` - Region (default: us-east-1)
//! - `FD_PUBLIC_BASE_URL` - Public base URL of stored images
//! - `FD_MAX_UPLOAD_BYTES` - Largest accepted image (default: 5 MiB)
//! - `FD_AUTH_ENABLED` - Require the admin token (default: true)
//! - `FD_ADMIN_TOKEN` - Admin bearer token
//! - `FD_CORS_ORIGINS` - Comma-separated allowed origins

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::directory::DEFAULT_MAX_UPLOAD_BYTES;
use crate::storage::default_public_base_url;
use crate::store::DEFAULT_MAX_CONNECTIONS;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default seconds to wait when acquiring a database connection.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Smallest accepted upload limit.
pub const MIN_UPLOAD_BYTES: usize = 1024;

/// Largest accepted upload limit.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shortest accepted admin token.
pub const MIN_ADMIN_TOKEN_LEN: usize = 16;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Follow Directory - admin API for users and their follow graph.
#[derive(Parser, Debug, Clone)]
#[command(name = "follow-directory")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeConfig),

    /// Apply the database schema and exit
    Migrate(MigrateConfig),

    /// Check database and object storage connectivity
    Check(CheckConfig),
}

/// Database connection settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string.
    #[arg(long, env = "FD_DATABASE_URL")]
    pub database_url: String,

    /// Maximum number of pooled connections.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "FD_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    /// Seconds to wait when acquiring a connection.
    #[arg(long, default_value_t = DEFAULT_DB_CONNECT_TIMEOUT_SECS, env = "FD_DB_CONNECT_TIMEOUT")]
    pub db_connect_timeout: u64,
}

impl DatabaseArgs {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout)
    }

    fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err(
                "Database URL is required. Set --database-url or FD_DATABASE_URL".to_string(),
            );
        }
        if self.db_max_connections == 0 {
            return Err("db_max_connections must be greater than 0".to_string());
        }
        if self.db_connect_timeout == 0 {
            return Err("db_connect_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Object storage settings.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Bucket receiving profile images.
    #[arg(long, env = "FD_S3_BUCKET")]
    pub s3_bucket: String,

    /// Key prefix for stored objects (e.g. "avatars"). A trailing slash is added.
    #[arg(long, default_value = "", env = "FD_S3_PREFIX")]
    pub s3_prefix: String,

    /// Custom endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "FD_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Region of the bucket.
    #[arg(long, default_value = DEFAULT_REGION, env = "FD_S3_REGION")]
    pub s3_region: String,

    /// Base URL under which stored objects are publicly readable.
    ///
    /// Derived from the endpoint and bucket when absent.
    #[arg(long, env = "FD_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,
}

impl StorageArgs {
    /// The key prefix, normalized to be empty or end with `/`.
    pub fn key_prefix(&self) -> String {
        let trimmed = self.s3_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        }
    }

    /// The configured public base URL, or the bucket's default one.
    pub fn resolved_public_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => default_public_base_url(
                self.s3_endpoint.as_deref(),
                &self.s3_bucket,
                &self.s3_region,
            ),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.s3_bucket.trim().is_empty() {
            return Err("S3 bucket name is required. Set --s3-bucket or FD_S3_BUCKET".to_string());
        }
        if let Some(url) = &self.public_base_url {
            url::Url::parse(url)
                .map_err(|e| format!("public_base_url is not a valid URL: {}", e))?;
        }
        Ok(())
    }
}

/// Configuration for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FD_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FD_PORT")]
    pub port: u16,

    // =========================================================================
    // Backends
    // =========================================================================
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Apply the database schema before serving.
    #[arg(long, default_value_t = false, env = "FD_MIGRATE")]
    pub migrate: bool,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Largest accepted profile image in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "FD_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Require the admin bearer token on every directory route.
    ///
    /// WARNING: Only disable authentication in development/testing.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "FD_AUTH_ENABLED")]
    pub auth_enabled: bool,

    /// Admin bearer token (at least 16 characters).
    #[arg(long, env = "FD_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FD_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.database.validate()?;
        self.storage.validate()?;

        if self.auth_enabled {
            match self.admin_token.as_deref() {
                None => {
                    return Err("Authentication is enabled but no admin token provided. \
                         Set --admin-token or FD_ADMIN_TOKEN, or disable auth with --auth-enabled false"
                        .to_string());
                }
                Some(token) if token.chars().count() < MIN_ADMIN_TOKEN_LEN => {
                    return Err(format!(
                        "admin token must be at least {} characters",
                        MIN_ADMIN_TOKEN_LEN
                    ));
                }
                Some(_) => {}
            }
        }

        if !(MIN_UPLOAD_BYTES..=MAX_UPLOAD_BYTES).contains(&self.max_upload_bytes) {
            return Err(format!(
                "max_upload_bytes must be between {} and {}",
                MIN_UPLOAD_BYTES, MAX_UPLOAD_BYTES
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The admin token, or an empty string when none is set (call validate() first).
    pub fn admin_token_or_empty(&self) -> &str {
        self.admin_token.as_deref().unwrap_or("")
    }
}

/// Configuration for `migrate`.
#[derive(Args, Debug, Clone)]
pub struct MigrateConfig {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl MigrateConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.database.validate()
    }
}

/// Configuration for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.database.validate()?;
        self.storage.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
