use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tracing::warn;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            catalog: CatalogConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8000;
    const HOST_VAR: &'static str = "ORDER_PACKER_API_HOST";
    const PORT_VAR: &'static str = "ORDER_PACKER_API_PORT";

    fn from_env() -> Self {
        let (bind_ip, display_host) = match env_string(Self::HOST_VAR) {
            Some(raw) => parse_host(&raw),
            None => (
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                Self::DEFAULT_HOST.to_string(),
            ),
        };

        let port = env_string(Self::PORT_VAR)
            .map(|raw| parse_port(&raw))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

fn parse_host(raw: &str) -> (IpAddr, String) {
    match raw.parse::<IpAddr>() {
        Ok(ip) => (ip, raw.to_string()),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                ApiConfig::HOST_VAR,
                raw,
                err,
                ApiConfig::DEFAULT_HOST
            );
            (
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                ApiConfig::DEFAULT_HOST.to_string(),
            )
        }
    }
}

fn parse_port(raw: &str) -> u16 {
    match raw.parse::<u16>() {
        Ok(value) if value != 0 => value,
        Ok(_) => {
            warn!(
                "{} must not be 0. Using {}.",
                ApiConfig::PORT_VAR,
                ApiConfig::DEFAULT_PORT
            );
            ApiConfig::DEFAULT_PORT
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                ApiConfig::PORT_VAR,
                raw,
                err,
                ApiConfig::DEFAULT_PORT
            );
            ApiConfig::DEFAULT_PORT
        }
    }
}

/// Where the product and box-type catalog comes from.
#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    path: Option<PathBuf>,
}

impl CatalogConfig {
    const PATH_VAR: &'static str = "ORDER_PACKER_CATALOG_PATH";

    fn from_env() -> Self {
        env_string(Self::PATH_VAR)
            .map(Self::with_path)
            .unwrap_or_default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Catalog JSON file; `None` means the built-in defaults.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Log output settings. The level filter itself comes from `RUST_LOG`.
///
/// Read separately from `AppConfig` so logging is up before other settings are parsed.
#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    json: bool,
}

impl LogConfig {
    const JSON_VAR: &'static str = "ORDER_PACKER_LOG_JSON";

    pub fn from_env() -> Self {
        Self::from_raw(env_string(Self::JSON_VAR).as_deref())
    }

    fn from_raw(raw: Option<&str>) -> Self {
        let json = raw
            .and_then(|raw| parse_bool(raw, Self::JSON_VAR))
            .unwrap_or(false);
        Self { json }
    }

    /// Emit structured JSON lines instead of human readable text.
    pub fn json(&self) -> bool {
        self.json
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_json_accepts_common_switch_spellings() {
        for raw in ["1", "true", "Yes", " on ", "Y"] {
            assert!(LogConfig::from_raw(Some(raw)).json(), "{raw:?} should enable JSON");
        }
        for raw in ["0", "FALSE", "no", "off", "n"] {
            assert!(!LogConfig::from_raw(Some(raw)).json(), "{raw:?} should disable JSON");
        }
    }

    #[test]
    fn log_json_defaults_to_text_output() {
        assert!(!LogConfig::from_raw(None).json());
        assert!(!LogConfig::from_raw(Some("json")).json());
        assert!(!LogConfig::from_raw(Some("2")).json());
    }

    #[test]
    fn parse_bool_rejects_unknown_words() {
        assert_eq!(parse_bool("enabled", LogConfig::JSON_VAR), None);
        assert_eq!(parse_bool("", LogConfig::JSON_VAR), None);
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("9000"), 9000);
        assert_eq!(parse_port("0"), ApiConfig::DEFAULT_PORT);
        assert_eq!(parse_port("70000"), ApiConfig::DEFAULT_PORT);
        assert_eq!(parse_port("http"), ApiConfig::DEFAULT_PORT);
    }

    #[test]
    fn test_parse_host() {
        let (ip, display) = parse_host("127.0.0.1");
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(display, "127.0.0.1");

        let (ip, display) = parse_host("::1");
        assert_eq!(ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(display, "::1");

        let (ip, display) = parse_host("localhost");
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(display, ApiConfig::DEFAULT_HOST);
    }

    #[test]
    fn test_default_host_binds_all_interfaces() {
        let (bind_ip, display_host) = parse_host("0.0.0.0");
        let config = ApiConfig {
            bind_ip,
            display_host,
            port: 8000,
        };
        assert!(config.binds_to_all_interfaces());
        assert!(config.uses_default_host());
        assert_eq!(config.socket_addr().port(), 8000);
    }

    #[test]
    fn test_catalog_config_path() {
        assert!(CatalogConfig::default().path().is_none());
        let config = CatalogConfig::with_path("/etc/order-packer/catalog.json");
        assert_eq!(
            config.path(),
            Some(Path::new("/etc/order-packer/catalog.json"))
        );
    }
}
