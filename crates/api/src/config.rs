//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Which of the two services is being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Order,
    Inventory,
}

impl Service {
    fn default_port(self) -> u16 {
        match self {
            Service::Order => 8082,
            Service::Inventory => 8081,
        }
    }

    fn default_request_timeout_ms(self) -> u64 {
        match self {
            Service::Order => 5000,
            Service::Inventory => 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: 8082 for orders, 8081 for inventory)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means in-memory stores
/// - `DB_MAX_CONNECTIONS`: pool size (default: 25)
/// - `REQUEST_TIMEOUT_MS`: per-call budget (default: 5000 for orders, 2000 for inventory)
/// - `COMPENSATION_TIMEOUT_MS`: budget for a compensating release (default: 5000)
/// - `INVENTORY_SERVICE_URL`: where the order service finds inventory
///   (default: `"http://localhost:8081"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub service: Service,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
    pub compensation_timeout: Duration,
    pub inventory_service_url: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env(service: Service) -> Self {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(service: Service, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let defaults = Self::defaults(service);

        Self {
            service,
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed("PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.db_max_connections),
            request_timeout: parsed("REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            compensation_timeout: parsed("COMPENSATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.compensation_timeout),
            inventory_service_url: lookup("INVENTORY_SERVICE_URL")
                .unwrap_or(defaults.inventory_service_url),
        }
    }

    /// Default configuration for a service.
    pub fn defaults(service: Service) -> Self {
        Self {
            service,
            host: "0.0.0.0".to_string(),
            port: service.default_port(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            db_max_connections: 25,
            request_timeout: Duration::from_millis(service.default_request_timeout_ms()),
            compensation_timeout: Duration::from_millis(5000),
            inventory_service_url: "http://localhost:8081".to_string(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let order = Config::from_lookup(Service::Order, lookup(&[]));
        assert_eq!(order.host, "0.0.0.0");
        assert_eq!(order.port, 8082);
        assert_eq!(order.log_level, "info");
        assert_eq!(order.log_format, LogFormat::Text);
        assert_eq!(order.database_url, None);
        assert_eq!(order.db_max_connections, 25);
        assert_eq!(order.request_timeout, Duration::from_secs(5));
        assert_eq!(order.compensation_timeout, Duration::from_secs(5));
        assert_eq!(order.inventory_service_url, "http://localhost:8081");

        let inventory = Config::from_lookup(Service::Inventory, lookup(&[]));
        assert_eq!(inventory.port, 8081);
        assert_eq!(inventory.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(
            Service::Order,
            lookup(&[
                ("PORT", "9000"),
                ("LOG_FORMAT", "JSON"),
                ("DATABASE_URL", "postgres://localhost/orders"),
                ("REQUEST_TIMEOUT_MS", "250"),
                ("INVENTORY_SERVICE_URL", "http://inventory:8081"),
            ]),
        );
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.inventory_service_url, "http://inventory:8081");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(
            Service::Inventory,
            lookup(&[("PORT", "99999"), ("DB_MAX_CONNECTIONS", "many"), ("DATABASE_URL", "")]),
        );
        assert_eq!(config.port, 8081);
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::defaults(Service::Order)
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
