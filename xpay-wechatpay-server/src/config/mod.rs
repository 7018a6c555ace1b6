//! Configuration module for xpay-wechatpay-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! turns it into a ready-to-use gateway and HTTP client.

pub mod file;

use crate::config::file::FileConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xpay_wechatpay::client::{ClientError, WechatPayClient};
use xpay_wechatpay::config::{Parameters, keys};
use xpay_wechatpay::gateway::{Gateway, InAppWebGateway};
use xpay_wechatpay::signature::SignType;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("failed to read client certificate {path}: {source}")]
    CertificateError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build http client: {0}")]
    ClientError(#[from] ClientError),
}

/// Runtime server settings.
#[derive(Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub api_secret: String,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub gateway: InAppWebGateway,
    pub client: WechatPayClient,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Read the client certificate, if any
    /// 5. Build the gateway and its HTTP client
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;
        self.build_loaded_config(file_config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.server.api_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.api_secret must not be empty".to_owned(),
            ));
        }

        let gateway = &config.gateway;
        for (name, value) in [
            (keys::APP_ID, &gateway.app_id),
            (keys::MCH_ID, &gateway.mch_id),
            (keys::KEY, &gateway.key),
            (keys::NOTIFY_URL, &gateway.notify_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "gateway.{name} must not be empty"
                )));
            }
        }
        if let Some(sign_type) = &gateway.sign_type {
            sign_type
                .parse::<SignType>()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(())
    }

    fn build_loaded_config(&self, file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        let FileConfig { server, gateway: g } = file_config;

        let mut parameters: Parameters = g.extra.into_iter().collect();
        parameters.insert(keys::APP_ID, g.app_id);
        parameters.insert(keys::MCH_ID, g.mch_id);
        parameters.insert(keys::KEY, g.key);
        parameters.insert(keys::NOTIFY_URL, g.notify_url);
        if let Some(sign_type) = g.sign_type {
            parameters.insert(keys::SIGN_TYPE, sign_type);
        }

        let mut gateway = InAppWebGateway::new();
        gateway.initialize(parameters);

        if let Some(path) = g.pfx_path {
            let pfx = std::fs::read(&path)
                .map_err(|source| ConfigError::CertificateError { path, source })?;
            gateway.set_pfx(pfx);
        }

        let mut client = WechatPayClient::from_config(gateway.config())?;
        if let Some(base_url) = g.base_url {
            client = client.with_base_url(base_url);
        }

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: server.listen,
                api_secret: server.api_secret,
            },
            gateway,
            client,
        })
    }
}
