//! Configuration for the referral service.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Referral table storage
    #[serde(default)]
    pub store: StoreConfig,

    /// Outbound text messages
    pub notifier: NotifierConfig,

    /// Identity provider user directory
    pub directory: DirectoryConfig,

    /// Phone number validation service
    #[serde(default)]
    pub phone_validator: PhoneValidatorConfig,

    /// Message templates
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Change feed redelivery for locally issued referrals
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Referral table name
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Path to the table snapshot
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, the table is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Signal CLI REST API URL
    #[serde(default = "default_notifier_url")]
    pub api_url: String,

    /// Registered number messages are sent from
    pub sender_number: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Identity provider API URL
    #[serde(default = "default_directory_url")]
    pub api_url: String,

    /// Bearer token for the directory API
    pub api_token: SecretString,

    /// Pool searched for existing accounts
    pub user_pool_id: String,

    /// Attribute holding the referrer's principal id
    #[serde(default = "default_referrer_attribute")]
    pub referrer_attribute: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneValidatorConfig {
    /// Phone validation API URL
    #[serde(default = "default_validator_url")]
    pub api_url: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Invitation body; `{####}` is replaced by the referral code
    #[serde(default = "default_invitation_template")]
    pub invitation: String,

    /// Welcome body; `{####}` is replaced by the user's name
    #[serde(default = "default_welcome_template")]
    pub welcome: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Delivery attempts per change batch before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff", with = "humantime_serde")]
    pub initial_backoff: Duration,

    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Pending batches buffered before publishers wait
    #[serde(default = "default_feed_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default implementations
impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            path: default_store_path(),
            persist: true,
        }
    }
}

impl Default for PhoneValidatorConfig {
    fn default() -> Self {
        Self {
            api_url: default_validator_url(),
            timeout: default_timeout(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            invitation: default_invitation_template(),
            welcome: default_welcome_template(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            capacity: default_feed_capacity(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_table_name() -> String {
    "referrals".into()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/data/referrals.json")
}

fn default_true() -> bool {
    true
}

fn default_notifier_url() -> String {
    "http://signal-api:8080".into()
}

fn default_directory_url() -> String {
    "http://identity-api:8080".into()
}

fn default_validator_url() -> String {
    "http://phone-validator:8080".into()
}

fn default_referrer_attribute() -> String {
    "referrer_id".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_invitation_template() -> String {
    "You've been invited to join Sitters! Sign up with referral code {####}.".into()
}

fn default_welcome_template() -> String {
    "Welcome to Sitters, {####}!".into()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(200)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

fn default_feed_capacity() -> usize {
    256
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8082
}

fn default_global_rpm() -> u32 {
    600
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Phone numbers must stay strings; parsing would drop the '+'
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
