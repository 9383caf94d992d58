use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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

const DEFAULT_GEOCODE_URL: &str = "http://localhost:8000";
const DEFAULT_VALUATION_URL: &str = "http://localhost:8000";
const DEFAULT_EXCHANGE_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/EUR";

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub services: ServiceEndpoints,
    pub currency: CurrencyConfig,
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
        let ansi = environment == AppEnvironment::Development;

        let services = ServiceEndpoints {
            geocode_url: service_url("GEOCODE_API_URL", DEFAULT_GEOCODE_URL)?,
            valuation_url: service_url("VALUATION_API_URL", DEFAULT_VALUATION_URL)?,
            exchange_rate_url: service_url("EXCHANGE_RATE_API_URL", DEFAULT_EXCHANGE_RATE_URL)?,
        };

        let currency = CurrencyConfig {
            base: currency_code("BASE_CURRENCY", "EUR")?,
            target: currency_code("TARGET_CURRENCY", "USD")?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            services,
            currency,
        })
    }
}

fn service_url(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyServiceUrl { key });
    }
    Ok(trimmed.to_string())
}

fn currency_code(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    let code = value.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidCurrency { key, value });
    }
    Ok(code)
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
    /// Colored output, only wanted on a developer terminal.
    pub ansi: bool,
}

/// Base URLs of the remote collaborators.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub geocode_url: String,
    pub valuation_url: String,
    pub exchange_rate_url: String,
}

/// Currency pair used for conversion. The fetched rate is target units per one base unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyConfig {
    pub base: String,
    pub target: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCurrency { key: &'static str, value: String },
    EmptyServiceUrl { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCurrency { key, value } => {
                write!(f, "{key} must be a 3-letter currency code, got '{value}'")
            }
            ConfigError::EmptyServiceUrl { key } => write!(f, "{key} must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCurrency { .. }
            | ConfigError::EmptyServiceUrl { .. } => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "GEOCODE_API_URL",
            "VALUATION_API_URL",
            "EXCHANGE_RATE_API_URL",
            "BASE_CURRENCY",
            "TARGET_CURRENCY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.services.geocode_url, "http://localhost:8000");
        assert_eq!(config.currency.base, "EUR");
        assert_eq!(config.currency.target, "USD");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn service_urls_drop_trailing_slash() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("VALUATION_API_URL", "http://valuation.internal:9000/");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.services.valuation_url, "http://valuation.internal:9000");
        reset_env();
    }

    #[test]
    fn rejects_malformed_currency_codes() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TARGET_CURRENCY", "dollars");
        match AppConfig::load() {
            Err(ConfigError::InvalidCurrency { key, .. }) => assert_eq!(key, "TARGET_CURRENCY"),
            other => panic!("expected invalid currency, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn lowercase_currency_codes_are_normalized() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TARGET_CURRENCY", "gbp");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.currency.target, "GBP");
        reset_env();
    }
}
