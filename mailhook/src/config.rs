//! Configuration module for environment variable parsing.
//!
//! All settings come from environment variables and are read once at startup.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Errors that prevent the service from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required for the SMTP backend")]
    MissingSmtpSetting(&'static str),
    #[error("SMTP_PORT must be a port number, got {0:?}")]
    InvalidSmtpPort(String),
}

/// Which delivery backend to use, with its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Local submission program (default).
    Sendmail { path: String },
    /// Remote SMTP relay.
    Smtp(SmtpConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Sendmail { .. } => "sendmail",
            BackendConfig::Smtp(_) => "smtp",
        }
    }
}

/// SMTP relay settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Empty disables authentication
    pub user: String,
    pub password: String,
    /// Accept invalid TLS certificates
    pub skip_verify: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password_set", &!self.password.is_empty())
            .field("skip_verify", &self.skip_verify)
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Public domain, shown on the home page
    pub domain: String,

    /// Normalized route prefix ("" or "/something", never a trailing slash)
    pub path_prefix: String,

    /// Shared HMAC key for webhook signature verification
    pub webhook_key: Option<String>,

    /// Delivery backend selection
    pub backend: BackendConfig,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Maximum accepted webhook body size in bytes
    pub max_body_bytes: usize,

    /// Upper bound for a single delivery attempt
    pub delivery_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("domain", &self.domain)
            .field("path_prefix", &self.path_prefix)
            .field("webhook_key_set", &self.webhook_key.is_some())
            .field("backend", &self.backend)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("delivery_timeout", &self.delivery_timeout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            domain: String::new(),
            path_prefix: String::new(),
            webhook_key: None,
            backend: BackendConfig::Sendmail {
                path: DEFAULT_SENDMAIL_PATH.to_string(),
            },
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 50 * 1024 * 1024,
            delivery_timeout: Duration::from_secs(60),
        }
    }
}

const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            port: parse_or("PORT", defaults.port),

            domain: env::var("DOMAIN").unwrap_or_default(),

            path_prefix: normalize_path_prefix(&env::var("PATH_URL").unwrap_or_default()),

            webhook_key: env::var("WEBHOOK_KEY").ok().filter(|k| !k.trim().is_empty()),

            backend: backend_from_env()?,

            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),

            max_body_bytes: parse_or("MAX_BODY_BYTES", defaults.max_body_bytes),

            delivery_timeout: Duration::from_secs(parse_or(
                "DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout.as_secs(),
            )),
        })
    }
}

fn backend_from_env() -> Result<BackendConfig, ConfigError> {
    let kind = env::var("BACKEND_TYPE")
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_default();

    match kind.as_str() {
        "smtp" => {
            let host = non_empty_var("SMTP_HOST").ok_or(ConfigError::MissingSmtpSetting("SMTP_HOST"))?;
            let raw_port = non_empty_var("SMTP_PORT").ok_or(ConfigError::MissingSmtpSetting("SMTP_PORT"))?;
            let port = raw_port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidSmtpPort(raw_port.clone()))?;

            Ok(BackendConfig::Smtp(SmtpConfig {
                host,
                port,
                user: env::var("SMTP_USER").unwrap_or_default(),
                password: env::var("SMTP_PASS").unwrap_or_default(),
                skip_verify: parse_bool(&env::var("SMTP_SKIP_VERIFY").unwrap_or_default()),
            }))
        }
        other => {
            if !other.is_empty() && other != "sendmail" {
                warn!(backend_type = %other, "Unknown backend type, using sendmail");
            }
            Ok(BackendConfig::Sendmail {
                path: non_empty_var("SENDMAIL_PATH")
                    .unwrap_or_else(|| DEFAULT_SENDMAIL_PATH.to_string()),
            })
        }
    }
}

/// Ensure the prefix starts with `/` and has no trailing slash; `""` and
/// `"/"` mean no prefix.
pub fn normalize_path_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, keeping `default` when it is unset or malformed.
fn parse_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// `true`/`1` (any case) are true, everything else is false.
fn parse_bool(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("true") || raw == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_prefix() {
        assert_eq!(normalize_path_prefix(""), "");
        assert_eq!(normalize_path_prefix("/"), "");
        assert_eq!(normalize_path_prefix("mail"), "/mail");
        assert_eq!(normalize_path_prefix("/mail/"), "/mail");
        assert_eq!(normalize_path_prefix("/a/b//"), "/a/b");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_parse_or_valid() {
        env::set_var("MAILHOOK_TEST_PORT", "9090");
        assert_eq!(parse_or("MAILHOOK_TEST_PORT", 8080u16), 9090);
        env::remove_var("MAILHOOK_TEST_PORT");
    }

    #[test]
    fn test_parse_or_invalid_uses_default() {
        env::set_var("MAILHOOK_TEST_BAD", "not-a-number");
        assert_eq!(parse_or("MAILHOOK_TEST_BAD", 30u64), 30);
        env::remove_var("MAILHOOK_TEST_BAD");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("MAILHOOK_NONEXISTENT_VAR", 42usize), 42);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config {
            webhook_key: Some("super-secret".to_string()),
            backend: BackendConfig::Smtp(SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 587,
                user: "relay".to_string(),
                password: "hunter2".to_string(),
                skip_verify: false,
            }),
            ..Config::default()
        };

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("smtp.example.com"));
    }

    #[test]
    fn test_backend_kind() {
        assert_eq!(Config::default().backend.kind(), "sendmail");
    }
}
