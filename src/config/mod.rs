use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application, loaded once at startup and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub alerts: AlertGatewayConfig,
    pub monitor: MonitorConfig,
    /// Raw access-key table (`key:user[:expired]` entries, comma separated).
    /// Parsed by `access::AccessKeyRegistry`; empty means no keys provisioned.
    pub access_keys: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig {
            base_url: require_var("PERMIT_STORE_URL")?,
            api_key: require_var("PERMIT_STORE_API_KEY")?,
        };

        let alerts = AlertGatewayConfig {
            endpoint: require_var("ALERT_GATEWAY_URL")?,
            bearer_token: require_var("ALERT_GATEWAY_TOKEN")?,
        };

        let monitor = MonitorConfig {
            sweep_interval: seconds_var("MONITOR_SWEEP_INTERVAL_SECS", 12 * 60 * 60)?,
            retry_backoff: seconds_var("MONITOR_RETRY_BACKOFF_SECS", 60)?,
        };

        let access_keys = env::var("ACCESS_KEYS").unwrap_or_default();

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store,
            alerts,
            monitor,
            access_keys,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar { name }),
    }
}

fn seconds_var(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidSeconds { name }),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the external permit collection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Connection settings for the outbound messaging endpoint.
#[derive(Debug, Clone)]
pub struct AlertGatewayConfig {
    pub endpoint: String,
    pub bearer_token: String,
}

/// Cadence of the lifecycle monitor.
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Pause between complete sweeps.
    pub sweep_interval: Duration,
    /// Pause before retrying after a failed permit fetch.
    pub retry_backoff: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingVar { name: &'static str },
    InvalidSeconds { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingVar { name } => write!(f, "{name} must be set and non-empty"),
            ConfigError::InvalidSeconds { name } => {
                write!(f, "{name} must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PERMIT_STORE_URL",
            "PERMIT_STORE_API_KEY",
            "ALERT_GATEWAY_URL",
            "ALERT_GATEWAY_TOKEN",
            "MONITOR_SWEEP_INTERVAL_SECS",
            "MONITOR_RETRY_BACKOFF_SECS",
            "ACCESS_KEYS",
        ] {
            env::remove_var(name);
        }
    }

    fn set_required_vars() {
        env::set_var("PERMIT_STORE_URL", "https://permits.example.restdb.io");
        env::set_var("PERMIT_STORE_API_KEY", "test-api-key");
        env::set_var("ALERT_GATEWAY_URL", "https://messages.example.com/send");
        env::set_var("ALERT_GATEWAY_TOKEN", "test-bearer-token");
    }

    #[test]
    fn load_uses_defaults_when_optional_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_vars();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.monitor.sweep_interval, Duration::from_secs(43_200));
        assert_eq!(config.monitor.retry_backoff, Duration::from_secs(60));
        assert!(config.access_keys.is_empty());
    }

    #[test]
    fn load_fails_without_store_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let error = AppConfig::load().expect_err("store url is required");
        assert!(matches!(
            error,
            ConfigError::MissingVar {
                name: "PERMIT_STORE_URL"
            }
        ));
    }

    #[test]
    fn load_rejects_non_numeric_cadence() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_vars();
        env::set_var("MONITOR_SWEEP_INTERVAL_SECS", "twelve hours");
        let error = AppConfig::load().expect_err("cadence must be numeric");
        assert!(matches!(
            error,
            ConfigError::InvalidSeconds {
                name: "MONITOR_SWEEP_INTERVAL_SECS"
            }
        ));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_vars();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
