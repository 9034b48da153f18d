use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_LOOKUP_BASE_URL: &str = "https://psgc.gitlab.io/api";
const DEFAULT_SESSION_QUOTA_BYTES: usize = 5 * 1024 * 1024;

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

/// Top-level configuration for the enrollment service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub lookup: LookupConfig,
    pub storage: StorageConfig,
    pub form: FormConfig,
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

        let base_url = env::var("APP_LOOKUP_BASE_URL")
            .map(|raw| raw.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_LOOKUP_BASE_URL.to_string());
        if base_url.is_empty() {
            return Err(ConfigError::EmptyLookupUrl);
        }
        let timeout_secs: u64 = numeric_var("APP_LOOKUP_TIMEOUT_SECS", 10)?;

        let quota_bytes: usize = numeric_var("APP_SESSION_QUOTA_BYTES", DEFAULT_SESSION_QUOTA_BYTES)?;

        let text_save_delay_ms: u64 = numeric_var("APP_TEXT_SAVE_DELAY_MS", 500)?;
        let notice_capacity: usize = numeric_var("APP_NOTICE_CAPACITY", 3)?;
        let confirm_wait_secs: u64 = numeric_var("APP_CONFIRM_WAIT_SECS", 3)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            lookup: LookupConfig {
                base_url,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            storage: StorageConfig { quota_bytes },
            form: FormConfig {
                text_save_delay: Duration::from_millis(text_save_delay_ms),
                notice_capacity: notice_capacity.max(1),
                confirm_wait: Duration::from_secs(confirm_wait_secs),
            },
        })
    }
}

fn numeric_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var: name, raw }),
        Err(_) => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location registry endpoint used by the cascading address selects.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Session-scoped store sizing. Browsers cap session storage around 5 MiB per origin.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub quota_bytes: usize,
}

/// Interaction timings for the form controller.
#[derive(Debug, Clone)]
pub struct FormConfig {
    pub text_save_delay: Duration,
    pub notice_capacity: usize,
    pub confirm_wait: Duration,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            text_save_delay: Duration::from_millis(500),
            notice_capacity: 3,
            confirm_wait: Duration::from_secs(3),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str, raw: String },
    EmptyLookupUrl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var, raw } => {
                write!(f, "{var} must be a non-negative integer (found '{raw}')")
            }
            ConfigError::EmptyLookupUrl => write!(f, "APP_LOOKUP_BASE_URL must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::EmptyLookupUrl => None,
        }
    }
}
