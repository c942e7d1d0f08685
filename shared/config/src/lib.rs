use serde::Deserialize;

/// Application configuration loaded from environment variables
///
/// There is exactly one configuration surface: environment (plus an optional
/// `.env` file in development). Behavior branches on capability, never on a
/// profile name: an unset SMTP host disables real delivery, and a disabled
/// rate-limit toggle bypasses the bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Database connection pool size (default: 20)
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Seconds to wait for a pool connection before failing the request (default: 5)
    #[serde(default = "default_database_acquire_timeout_seconds")]
    pub database_acquire_timeout_seconds: u64,

    /// JWT signing secret; validated against the secret policy at startup
    #[serde(default)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds (default: 86400 = 24 hours)
    #[serde(default = "default_access_token_expiration")]
    pub access_token_expiration: i64,

    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    #[serde(default = "default_refresh_token_expiration")]
    pub refresh_token_expiration: i64,

    /// Service-account token lifetime in seconds (default: 2592000 = 30 days)
    #[serde(default = "default_service_token_expiration")]
    pub service_token_expiration: i64,

    /// Initial administrator password; mandatory, checked at startup
    #[serde(default)]
    pub admin_bootstrap_password: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request deadline in seconds (default: 30)
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Enable the auth-endpoint token bucket (default: true)
    #[serde(default = "default_rate_limit_enabled")]
    pub rate_limit_enabled: bool,

    /// Auth-endpoint bucket capacity (default: 5)
    #[serde(default = "default_auth_rate_limit_max")]
    pub auth_rate_limit_max: u32,

    /// Auth-endpoint bucket window in seconds (default: 60, i.e. 5/min refill)
    #[serde(default = "default_auth_rate_limit_window_seconds")]
    pub auth_rate_limit_window_seconds: u64,

    /// Local wall-clock hour at which the daily expiration scan fires (default: 6)
    #[serde(default = "default_expiration_scan_hour")]
    pub expiration_scan_hour: u32,

    /// Revoked-token GC cadence in seconds (default: 3600)
    #[serde(default = "default_revoked_token_gc_interval_seconds")]
    pub revoked_token_gc_interval_seconds: u64,

    /// SMTP relay host; empty disables real delivery
    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,

    #[serde(default = "default_smtp_from_email")]
    pub smtp_from_email: String,

    #[serde(default = "default_smtp_from_name")]
    pub smtp_from_name: String,

    #[serde(default = "default_smtp_use_tls")]
    pub smtp_use_tls: bool,

    /// Administrator notification addresses, comma-separated, opaque to the core
    pub admin_recipients: Option<String>,

    /// Expense-approver notification addresses, comma-separated, opaque to the core
    pub approver_recipients: Option<String>,

    /// S3-compatible endpoint for receipt blobs
    #[serde(default = "default_s3_endpoint")]
    pub s3_endpoint: String,

    #[serde(default)]
    pub s3_access_key: String,

    #[serde(default)]
    pub s3_secret_key: String,

    #[serde(default = "default_s3_bucket")]
    pub s3_bucket: String,

    #[serde(default = "default_s3_region")]
    pub s3_region: String,
}

fn default_database_max_connections() -> u32 {
    20
}

fn default_database_acquire_timeout_seconds() -> u64 {
    5
}

fn default_access_token_expiration() -> i64 {
    86_400 // 24 hours
}

fn default_refresh_token_expiration() -> i64 {
    604_800 // 7 days
}

fn default_service_token_expiration() -> i64 {
    2_592_000 // 30 days
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_auth_rate_limit_max() -> u32 {
    5
}

fn default_auth_rate_limit_window_seconds() -> u64 {
    60
}

fn default_expiration_scan_hour() -> u32 {
    6
}

fn default_revoked_token_gc_interval_seconds() -> u64 {
    3600
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from_email() -> String {
    "noreply@worklog.local".to_string()
}

fn default_smtp_from_name() -> String {
    "Worklog".to_string()
}

fn default_smtp_use_tls() -> bool {
    true
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_s3_bucket() -> String {
    "worklog-receipts".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if exists; ignore absence
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder().add_source(config::Environment::default());

        builder.build()?.try_deserialize::<Config>()
    }

    /// Parse an opaque comma-separated recipient list from configuration
    pub fn split_recipients(list: &Option<String>) -> Vec<String> {
        list.as_ref()
            .map(|s| {
                s.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
