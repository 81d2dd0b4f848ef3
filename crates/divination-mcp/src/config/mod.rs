//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit CLI flag, then environment variable,
//! then built-in default.

use std::fmt;
use std::str::FromStr;

pub const ENV_TRANSPORT: &str = "DIVINATION_MCP_TRANSPORT";
pub const ENV_HOST: &str = "DIVINATION_MCP_HOST";
pub const ENV_PORT: &str = "DIVINATION_MCP_PORT";
pub const ENV_JSON_RESPONSE: &str = "DIVINATION_MCP_JSON_RESPONSE";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown transport \"{0}\" (expected stdio, sse or streamable-http)")]
    InvalidTransport(String),

    #[error("Invalid port \"{0}\"")]
    InvalidPort(String),

    #[error("Invalid boolean \"{value}\" for {key}")]
    InvalidBool { key: String, value: String },
}

/// The wire binding a server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TransportKind {
    #[default]
    Stdio,
    Sse,
    #[value(name = "streamable-http")]
    StreamableHttp,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(TransportKind::Stdio),
            "sse" => Ok(TransportKind::Sse),
            "streamable-http" => Ok(TransportKind::StreamableHttp),
            other => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }
}

/// Paths and response mode for the HTTP transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// SSE binding: event stream endpoint.
    pub sse_path: String,
    /// SSE binding: where clients POST their messages.
    pub message_path: String,
    /// Streamable HTTP binding: the single endpoint.
    pub streamable_path: String,
    /// Streamable HTTP binding: answer requests with JSON instead of an event stream.
    pub json_response: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            sse_path: "/sse".to_string(),
            message_path: "/messages/".to_string(),
            streamable_path: "/mcp".to_string(),
            json_response: false,
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub transport: Option<TransportKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub json_response: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub http: HttpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            http: HttpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(cli: CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(cli: CliOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let transport = match cli.transport {
            Some(t) => t,
            None => env(ENV_TRANSPORT)
                .map(|v| v.trim().parse::<TransportKind>())
                .transpose()?
                .unwrap_or(defaults.transport),
        };

        let host = cli
            .host
            .or_else(|| env(ENV_HOST))
            .unwrap_or(defaults.host);

        let port = match cli.port {
            Some(p) => p,
            None => env(ENV_PORT)
                .map(|v| v.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(v)))
                .transpose()?
                .unwrap_or(defaults.port),
        };

        let json_response = cli.json_response
            || env(ENV_JSON_RESPONSE)
                .map(|v| parse_bool(ENV_JSON_RESPONSE, &v))
                .transpose()?
                .unwrap_or(defaults.http.json_response);

        Ok(Self {
            transport,
            host,
            port,
            http: HttpConfig {
                json_response,
                ..defaults.http
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve_with(CliOverrides::default(), env_of(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.http.message_path, "/messages/");
    }

    #[test]
    fn test_env_then_cli_precedence() {
        let env = env_of(&[(ENV_TRANSPORT, "sse"), (ENV_PORT, "9001"), (ENV_HOST, "0.0.0.0")]);
        let config = ServerConfig::resolve_with(CliOverrides::default(), &env).unwrap();
        assert_eq!(config.transport, TransportKind::Sse);
        assert_eq!(config.port, 9001);

        let cli = CliOverrides {
            transport: Some(TransportKind::StreamableHttp),
            port: Some(7000),
            ..Default::default()
        };
        let config = ServerConfig::resolve_with(cli, &env).unwrap();
        assert_eq!(config.transport, TransportKind::StreamableHttp);
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_rejects_unknown_transport() {
        let err = ServerConfig::resolve_with(
            CliOverrides::default(),
            env_of(&[(ENV_TRANSPORT, "websocket")]),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTransport("websocket".into()));
        assert!("HTTP".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_rejects_bad_port_and_bool() {
        assert!(matches!(
            ServerConfig::resolve_with(CliOverrides::default(), env_of(&[(ENV_PORT, "99999")])),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            ServerConfig::resolve_with(
                CliOverrides::default(),
                env_of(&[(ENV_JSON_RESPONSE, "maybe")])
            ),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_transport_names_round_trip() {
        for kind in [TransportKind::Stdio, TransportKind::Sse, TransportKind::StreamableHttp] {
            assert_eq!(kind.as_str().parse::<TransportKind>().unwrap(), kind);
        }
    }
}
