//! Server configuration, environment-driven.

/// Configuration for the ripple relay server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Port the listener tries first.
    pub port: u16,
    /// How many incremented ports to try after a bind conflict.
    pub bind_retries: u32,
    /// Message store host.
    pub db_host: String,
    /// Message store port.
    pub db_port: u16,
    /// Message store user.
    pub db_user: String,
    /// Message store password.
    pub db_pass: String,
    /// Message store database name.
    pub db_name: String,
    /// Storage connection pool size; acquires queue beyond this.
    pub db_pool_size: u32,
    /// Seconds between transport-level keepalive pings.
    pub keepalive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: env_parse("RIPPLE_PORT", 9190),
            bind_retries: env_parse("RIPPLE_BIND_RETRIES", 5),
            db_host: env_string("DB_HOST", "127.0.0.1"),
            db_port: env_parse("DB_PORT", 3306),
            db_user: env_string("DB_USER", "ripple"),
            db_pass: env_string("DB_PASS", ""),
            db_name: env_string("DB_NAME", "ripple"),
            db_pool_size: env_parse("DB_POOL_SIZE", 10),
            // interval(0) panics, so a zero override is bumped to 1
            keepalive_secs: env_parse("RIPPLE_KEEPALIVE_SECS", 30u64).max(1),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::default()
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
