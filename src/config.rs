//! Server configuration loaded from the environment

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

// Environment variable names
pub const PORT: &str = "PORT";
pub const HOST: &str = "HOST";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
pub const GRAPHQL_ENDPOINT: &str = "GRAPHQL_ENDPOINT";
pub const CLIENT_URL: &str = "CLIENT_URL";
pub const AUTH_MODE: &str = "AUTH_MODE";
pub const ENABLE_GRAPHIQL: &str = "ENABLE_GRAPHIQL";

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_GRAPHQL_ENDPOINT: &str = "/graphql";
const DEFAULT_CLIENT_URL: &str = "http://localhost:8080";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How the authenticated principal is resolved from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `Authorization: Bearer <token>` looked up in the sessions table
    Session,
    /// Trust an `x-user-id` header set by an upstream gateway
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub graphql_endpoint: String,
    pub trusted_origins: Vec<String>,
    pub auth_mode: AuthMode,
    pub enable_graphiql: bool,
}

impl ServerConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match lookup(HOST) {
            Some(value) => value.parse().map_err(|e: std::net::AddrParseError| {
                invalid(HOST, &value, e.to_string())
            })?,
            None => DEFAULT_HOST.parse().map_err(|e: std::net::AddrParseError| {
                invalid(HOST, DEFAULT_HOST, e.to_string())
            })?,
        };

        let port = match lookup(PORT) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|e| invalid(PORT, &value, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let max_connections = match lookup(DATABASE_MAX_CONNECTIONS) {
            Some(value) => {
                let parsed = value
                    .parse::<u32>()
                    .map_err(|e| invalid(DATABASE_MAX_CONNECTIONS, &value, e.to_string()))?;
                if parsed == 0 {
                    return Err(invalid(
                        DATABASE_MAX_CONNECTIONS,
                        &value,
                        "must be at least 1".to_string(),
                    ));
                }
                parsed
            }
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let auth_mode = match lookup(AUTH_MODE).as_deref() {
            None | Some("session") => AuthMode::Session,
            Some("header") => AuthMode::Header,
            Some(other) => {
                return Err(invalid(
                    AUTH_MODE,
                    other,
                    "expected 'session' or 'header'".to_string(),
                ))
            }
        };

        let enable_graphiql = match lookup(ENABLE_GRAPHIQL).as_deref() {
            None => true,
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => {
                return Err(invalid(
                    ENABLE_GRAPHIQL,
                    other,
                    "expected a boolean".to_string(),
                ))
            }
        };

        let graphql_endpoint =
            lookup(GRAPHQL_ENDPOINT).unwrap_or_else(|| DEFAULT_GRAPHQL_ENDPOINT.to_string());
        if !graphql_endpoint.starts_with('/') {
            return Err(invalid(
                GRAPHQL_ENDPOINT,
                &graphql_endpoint,
                "must start with '/'".to_string(),
            ));
        }

        let trusted_origins = lookup(CLIENT_URL)
            .unwrap_or_else(|| DEFAULT_CLIENT_URL.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            database_url: lookup(DATABASE_URL).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections,
            graphql_endpoint,
            trusted_origins,
            auth_mode,
            enable_graphiql,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn invalid(name: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason,
    }
}
