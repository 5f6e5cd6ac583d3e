use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};

use crate::services::intake::NotificationMode;

/// Used when `ORDER_WEBHOOK_URL` is not configured.
pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/orders";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub webhook: WebhookConfig,
    pub media: MediaConfig,
    pub notification_mode: NotificationMode,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long shutdown waits for detached order notifications.
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` runs the service on the in-memory repository.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBHOOK_URL.into(),
            timeout: Duration::from_millis(8_000),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
}

/// Loads the configuration from the process environment.
pub fn load() -> Result<AppConfig> {
    load_from(|key| std::env::var(key).ok())
}

/// Loads the configuration through an arbitrary variable lookup.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let server = ServerConfig {
        host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
        port: parse_or(&var, "SERVER_PORT", 8080)?,
        shutdown_grace: Duration::from_millis(parse_or(&var, "SHUTDOWN_GRACE_MS", 10_000)?),
    };

    let database = DatabaseConfig {
        url: var("DATABASE_URL"),
        max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let webhook = WebhookConfig {
        url: var("ORDER_WEBHOOK_URL").unwrap_or_else(|| DEFAULT_WEBHOOK_URL.into()),
        timeout: Duration::from_millis(parse_or(&var, "ORDER_WEBHOOK_TIMEOUT_MS", 8_000)?),
        max_attempts: parse_or(&var, "ORDER_WEBHOOK_MAX_ATTEMPTS", 3)?,
        initial_backoff: Duration::from_millis(parse_or(&var, "ORDER_WEBHOOK_BACKOFF_MS", 500)?),
    };
    if webhook.max_attempts == 0 {
        anyhow::bail!("ORDER_WEBHOOK_MAX_ATTEMPTS must be at least 1");
    }

    let media = MediaConfig {
        root_dir: var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./media")),
        public_base_url: var("MEDIA_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/media", server.port)),
        max_upload_bytes: parse_or(&var, "MEDIA_MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
    };

    let notification_mode = parse_or(&var, "NOTIFICATION_MODE", NotificationMode::Detached)?;

    Ok(AppConfig {
        server,
        database,
        webhook,
        media,
        notification_mode,
    })
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {key} '{raw}': {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_grace, Duration::from_secs(10));
        assert_eq!(config.database.url, None);
        assert_eq!(config.webhook, WebhookConfig::default());
        assert_eq!(config.notification_mode, NotificationMode::Detached);
        assert_eq!(config.media.public_base_url, "http://localhost:8080/media");
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load_with(&[
            ("SERVER_PORT", "9090"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("ORDER_WEBHOOK_URL", "https://hooks.example.com/orders"),
            ("ORDER_WEBHOOK_TIMEOUT_MS", "2500"),
            ("ORDER_WEBHOOK_MAX_ATTEMPTS", "1"),
            ("NOTIFICATION_MODE", "inline"),
            ("SHUTDOWN_GRACE_MS", "250"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.webhook.url, "https://hooks.example.com/orders");
        assert_eq!(config.webhook.timeout, Duration::from_millis(2500));
        assert_eq!(config.webhook.max_attempts, 1);
        assert_eq!(config.notification_mode, NotificationMode::Inline);
        assert_eq!(config.server.shutdown_grace, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_fail_with_the_variable_name() {
        let err = load_with(&[("SERVER_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));

        let err = load_with(&[("NOTIFICATION_MODE", "sometimes")]).unwrap_err();
        assert!(err.to_string().contains("NOTIFICATION_MODE"));

        assert!(load_with(&[("ORDER_WEBHOOK_MAX_ATTEMPTS", "0")]).is_err());
    }
}
