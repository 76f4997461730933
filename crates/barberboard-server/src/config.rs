use barberboard_sheets::RetryPolicy;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

/// Runtime configuration, filled from environment variables in `main` and
/// handed to `AppState` whole. Tests construct it directly.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    /// Master directory spreadsheet holding the branch registry.
    pub master_sheet_id: String,
    /// Destination folder for newly created branch spreadsheets. When unset
    /// they stay on the creating account's own Drive.
    pub drive_folder_id: Option<String>,
    /// Identity granted writer access on spreadsheets the delegated user
    /// creates, so service-account credentials keep working after a switch.
    pub grant_email: Option<String>,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    /// Exact origins, or `*` for any.
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub request_log: bool,
    pub shutdown_drain: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            master_sheet_id: String::new(),
            drive_folder_id: None,
            grant_email: None,
            cache_ttl: Duration::from_secs(300),
            http_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            cors_allowed_origins: vec!["*".to_string()],
            max_body_bytes: 256 * 1024,
            request_log: true,
            shutdown_drain: Duration::from_millis(3000),
        }
    }
}

pub fn validate_startup_config_contract(config: &ServiceConfig) -> Result<(), String> {
    if config.master_sheet_id.trim().is_empty() {
        return Err("GOOGLE_SHEET_ID is required: id of the master directory spreadsheet".to_string());
    }
    if config.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid bind address {}", config.bind_addr));
    }
    if config.cache_ttl.is_zero() || config.http_timeout.is_zero() {
        return Err("timeouts and ttls must be > 0".to_string());
    }
    if config.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    if config.retry.max_attempts == 0 {
        return Err("retry attempts must be > 0".to_string());
    }
    Ok(())
}
