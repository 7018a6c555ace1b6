//! TOML file configuration structures.
//!
//! These structs directly map to the `xpay-config.toml` file format.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
}

/// Server configuration section.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Shared secret for signing `POST /api/v1/purchase` bodies.
    #[serde(default)]
    pub api_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            api_secret: String::new(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen", &self.listen)
            .field("api_secret", &REDACTED)
            .finish()
    }
}

const REDACTED: &str = "<redacted>";

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Gateway section. Keys not listed here are handed to the gateway as-is.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    pub app_id: String,
    pub mch_id: String,
    /// API key used for signing.
    pub key: String,
    /// `MD5` (default) or `HMAC-SHA256`.
    #[serde(default)]
    pub sign_type: Option<String>,
    pub notify_url: String,
    /// Path to `apiclient_cert.p12`.
    #[serde(default)]
    pub pfx_path: Option<PathBuf>,
    /// API root, for sandbox or test servers.
    #[serde(default)]
    pub base_url: Option<url::Url>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("key", &REDACTED)
            .field("sign_type", &self.sign_type)
            .field("notify_url", &self.notify_url)
            .field("pfx_path", &self.pfx_path)
            .field("base_url", &self.base_url)
            .field("extra", &self.extra)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"
api_secret = "merchant-backend-secret"

[gateway]
app_id = "wx7065330377b79c60"
mch_id = "1272242000"
key = "paymentwechattest000000000"
notify_url = "https://example.com/api/v1/notify"
pfx_path = "./apiclient_cert.p12"
device_info = "WEB"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.server.api_secret, "merchant-backend-secret");
        assert_eq!(config.gateway.mch_id, "1272242000");
        assert_eq!(config.gateway.sign_type, None);
        assert_eq!(
            config.gateway.pfx_path.as_deref(),
            Some(std::path::Path::new("./apiclient_cert.p12"))
        );
        assert_eq!(config.gateway.extra.len(), 1);
        assert_eq!(config.gateway.extra["device_info"], "WEB");
    }

    #[test]
    fn test_server_section_is_optional() {
        let toml_str = r#"
[gateway]
app_id = "wx7065330377b79c60"
mch_id = "1272242000"
key = "paymentwechattest000000000"
notify_url = "https://example.com/api/v1/notify"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert!(config.server.api_secret.is_empty());
        assert!(config.gateway.extra.is_empty());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let toml_str = r#"
[server]
api_secret = "merchant-backend-secret"

[gateway]
app_id = "wx7065330377b79c60"
mch_id = "1272242000"
key = "paymentwechattest000000000"
notify_url = "https://example.com/api/v1/notify"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let printed = format!("{config:?}");

        assert!(printed.contains("1272242000"));
        assert!(!printed.contains("merchant-backend-secret"));
        assert!(!printed.contains("paymentwechattest"));
    }
}
