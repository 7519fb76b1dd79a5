use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub amqp: AmqpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Service identity advertised to the broker and in logs
    #[serde(default = "default_service_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HttpConfig {
    /// Listen port; 0 lets the OS assign an ephemeral port
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AmqpConfig {
    #[serde(default = "default_amqp_url")]
    pub url: String,
    /// Named destination this service subscribes to
    #[serde(default = "default_destination")]
    pub destination: String,
}

fn default_service_name() -> String {
    "backend".to_string()
}

fn default_amqp_url() -> String {
    "amqp://127.0.0.1:5672/%2f".to_string()
}

fn default_destination() -> String {
    "backend".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            url: default_amqp_url(),
            destination: default_destination(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// built-in defaults so the service starts with zero configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.service.name, "backend");
        assert_eq!(config.http.port, 0);
        assert_eq!(config.amqp.url, "amqp://127.0.0.1:5672/%2f");
        assert_eq!(config.amqp.destination, "backend");
    }

    #[test]
    fn test_full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [service]
            name = "orders"

            [http]
            port = 8080

            [amqp]
            url = "amqp://broker.internal:5672/%2f"
            destination = "orders.incoming"
            "#,
        )
        .unwrap();
        assert_eq!(config.service.name, "orders");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.amqp.url, "amqp://broker.internal:5672/%2f");
        assert_eq!(config.amqp.destination, "orders.incoming");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[amqp]\ndestination = \"audit\"\n").unwrap();
        assert_eq!(config.amqp.destination, "audit");
        assert_eq!(config.amqp.url, "amqp://127.0.0.1:5672/%2f");
        assert_eq!(config.service.name, "backend");
        assert_eq!(config.http.port, 0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/backend-config.toml")).unwrap();
        assert_eq!(config.service.name, "backend");
        assert_eq!(config.amqp.destination, "backend");
    }
}
