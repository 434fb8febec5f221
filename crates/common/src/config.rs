//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Spotify integration configuration.
    #[serde(default)]
    pub spotify: Option<SpotifyConfig>,
    /// Email delivery configuration.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Spotify Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI for the authorization-code flow.
    pub redirect_uri: String,
}

/// Email delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP host. When absent, emails are logged instead of sent.
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// From address for outgoing mail.
    pub from_address: String,
    /// From display name.
    #[serde(default = "default_instance_name")]
    pub from_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_instance_name() -> String {
    "RhythMe".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `RHYTHME_ENV`)
    /// 3. Environment variables with `RHYTHME_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("RHYTHME_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RHYTHME")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
