//! Server configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Header carrying the actor id when a gateway authenticates in front of us
pub const DEFAULT_IDENTITY_HEADER: &str = "x-kinship-user";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Verify JWTs; when disabled the actor comes from `trusted_identity_header`
    pub enable_auth: bool,

    /// JWT secret key for verifying tokens
    pub jwt_secret: String,

    /// JWT token expiration time in hours
    pub jwt_expiration_hours: u64,

    /// Header trusted for the actor id when auth is disabled
    pub trusted_identity_header: String,

    /// Library configuration file, merged over the default locations
    pub config_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            max_request_size: 1024 * 1024, // 1MB
            enable_auth: true,
            jwt_secret: "".to_string(), // Generated at runtime if not provided
            jwt_expiration_hours: 24,
            trusted_identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            config_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from CLI arguments and environment variables
    /// CLI arguments take precedence over environment variables
    pub fn from_cli_and_env(cli_args: &crate::cli::CliArgs) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = cli_args.port {
            config.port = port;
        } else if let Ok(port) = env::var("KINSHIP_PORT") {
            config.port = port.parse()?;
        }

        if let Some(max_size) = cli_args.max_request_size {
            config.max_request_size = max_size;
        } else if let Ok(max_size) = env::var("KINSHIP_MAX_REQUEST_SIZE") {
            config.max_request_size = max_size.parse()?;
        }

        if let Some(enable_auth) = cli_args.enable_auth {
            config.enable_auth = enable_auth;
        } else if let Ok(enable_auth) = env::var("KINSHIP_ENABLE_AUTH") {
            config.enable_auth = enable_auth.parse().unwrap_or(true);
        }

        if let Some(jwt_secret) = &cli_args.jwt_secret {
            config.jwt_secret = jwt_secret.clone();
        } else if let Ok(jwt_secret) = env::var("KINSHIP_JWT_SECRET") {
            config.jwt_secret = jwt_secret;
        }
        if config.jwt_secret.is_empty() {
            config.jwt_secret = Self::generate_jwt_secret();
        }

        if let Ok(exp_hours) = env::var("KINSHIP_JWT_EXPIRATION_HOURS") {
            config.jwt_expiration_hours = exp_hours.parse()?;
        }

        if let Some(header) = &cli_args.identity_header {
            config.trusted_identity_header = header.clone();
        } else if let Ok(header) = env::var("KINSHIP_IDENTITY_HEADER") {
            config.trusted_identity_header = header;
        }

        if let Some(config_path) = &cli_args.config_file {
            config.config_file = Some(config_path.clone());
        } else if let Ok(config_path) = env::var("KINSHIP_CONFIG_FILE") {
            config.config_file = Some(PathBuf::from(config_path));
        }

        Ok(config)
    }

    /// Generate a secure random JWT secret
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;
        use rand::distr::Alphanumeric;
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    }
}
