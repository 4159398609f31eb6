//! Configuration management
//!
//! Configuration is read once at startup from environment variables (an
//! optional `.env` file is loaded into the environment first by the binaries).
//! Missing optional values are filled with defaults; the database password is
//! required and its absence fails startup.

use std::fmt;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Database connection parameters
    pub database: DatabaseConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Execution mode, controls destructive migrations
    pub app_env: AppEnv,
    /// Log output configuration
    pub log: LogConfig,
}

/// Database connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    /// Managed-instance connection name; when set, connect over a unix socket
    pub instance_connection_name: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// Directory holding the managed-instance sockets
    pub socket_dir: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("instance_connection_name", &self.instance_connection_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("socket_dir", &self.socket_dir)
            .finish()
    }
}

/// Where the database is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseAddress {
    /// Direct TCP connection
    Tcp { host: String, port: u16 },
    /// Unix socket under `socket_dir/instance_connection_name`
    Socket { path: String },
}

impl DatabaseConfig {
    /// Resolve the address strategy.
    ///
    /// A non-empty managed-instance connection name always selects the socket
    /// path; otherwise host and port are used.
    pub fn address(&self) -> DatabaseAddress {
        if self.instance_connection_name.is_empty() {
            DatabaseAddress::Tcp {
                host: self.host.clone(),
                port: self.port,
            }
        } else {
            DatabaseAddress::Socket {
                path: format!("{}/{}", self.socket_dir, self.instance_connection_name),
            }
        }
    }

    /// Key/value connection string for the PostgreSQL driver
    pub fn data_source_name(&self) -> String {
        match self.address() {
            DatabaseAddress::Tcp { host, port } => format!(
                "user={} password={} database={} host={} port={} sslmode=disable",
                self.user, self.password, self.name, host, port
            ),
            DatabaseAddress::Socket { path } => format!(
                "user={} password={} database={} host={}",
                self.user, self.password, self.name, path
            ),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on (all interfaces)
    pub port: u16,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
}

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    /// Local development; migrations drop and recreate tables
    Development,
    /// Anything else; migrations are additive only
    #[default]
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Self::Development
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable output for local work
    Pretty,
}

const DEFAULT_DATABASE_USER: &str = "postgres";
const DEFAULT_DATABASE_HOST: &str = "localhost";
const DEFAULT_DATABASE_PORT: u16 = 5435;
const DEFAULT_DATABASE_NAME: &str = "s-blog-db";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:8080"];

/// Error type for configuration loading
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable '{0}' is not set")]
    MissingVar(&'static str),
    #[error("environment variable '{name}' has invalid value '{value}': {message}")]
    InvalidVar {
        name: &'static str,
        value: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let password = get("DATABASE_PASSWORD").ok_or(ConfigError::MissingVar("DATABASE_PASSWORD"))?;

        let database = DatabaseConfig {
            user: get("DATABASE_USER").unwrap_or_else(|| DEFAULT_DATABASE_USER.to_string()),
            password,
            instance_connection_name: get("INSTANCE_CONNECTION_NAME").unwrap_or_default(),
            host: get("DATABASE_HOST").unwrap_or_else(|| DEFAULT_DATABASE_HOST.to_string()),
            port: parse_port("DATABASE_PORT", get("DATABASE_PORT"), DEFAULT_DATABASE_PORT)?,
            name: get("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            socket_dir: get("DATABASE_SOCKET_DIR").unwrap_or_default(),
        };

        let cors_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let server = ServerConfig {
            port: parse_port("PORT", get("PORT"), DEFAULT_PORT)?,
            cors_origins,
        };

        let app_env = get("APP_ENV").map(|v| AppEnv::parse(&v)).unwrap_or_default();

        let format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(v) => match v.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "LOG_FORMAT",
                        value: v,
                        message: "expected 'json' or 'pretty'".to_string(),
                    })
                }
            },
        };

        Ok(Self {
            database,
            server,
            app_env,
            log: LogConfig { format },
        })
    }
}

fn parse_port(name: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<u16>().map_err(|e| ConfigError::InvalidVar {
            name,
            value: v,
            message: e.to_string(),
        }),
    }
}
