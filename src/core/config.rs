use crate::auth::JwtConfig;

/// Server configuration
///
/// Every item can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | HTTP_PORT | 3000 | HTTP API port |
/// | DATABASE_PATH | commerce.db | SQLite database file |
/// | LOG_DIR | (unset) | daily rolling log files when set |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | EXPIRY_SWEEP_INTERVAL_SECS | 3600 | unpaid-order sweep cadence |
/// | TOKEN_CLEANUP_INTERVAL_SECS | 21600 | reset-token purge cadence |
///
/// JWT settings come from [`JwtConfig`] (JWT_SECRET and friends).
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub database_path: String,
    pub log_dir: Option<String>,
    pub environment: String,
    pub jwt: JwtConfig,
    pub expiry_sweep_interval_secs: u64,
    pub token_cleanup_interval_secs: u64,
}

impl Config {
    /// Load configuration from the environment, with defaults
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "commerce.db".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt: JwtConfig::default(),
            expiry_sweep_interval_secs: std::env::var("EXPIRY_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            token_cleanup_interval_secs: std::env::var("TOKEN_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(21600),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
