//! Gateway configuration.
//!
//! A gateway keeps its settings in a [`GatewayConfig`], a named parameter
//! map filled with defaults-then-overrides semantics. The well-known keys
//! used by the WeChat Pay gateways live in [`keys`].

mod parameters;

pub use parameters::{ParameterValue, Parameters};
pub(crate) use parameters::REDACTED;

use crate::signature::SignType;

/// Well-known parameter names.
pub mod keys {
    /// Merchant id assigned by WeChat Pay.
    pub const MCH_ID: &str = "mch_id";
    /// Official account / open platform app id.
    pub const APP_ID: &str = "app_id";
    /// API key used for signing.
    pub const KEY: &str = "key";
    /// PKCS#12 client certificate content.
    pub const PFX: &str = "pfx";
    /// `MD5` or `HMAC-SHA256`.
    pub const SIGN_TYPE: &str = "sign_type";
    /// Where WeChat Pay delivers payment notifications.
    pub const NOTIFY_URL: &str = "notify_url";
}

/// Parameter storage shared by every gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayConfig {
    parameters: Parameters,
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the stored parameters, apply `defaults`, then apply `overrides`.
    ///
    /// Keys present in both end up with the override value. Nothing is
    /// validated and unknown keys are kept as-is.
    pub fn initialize(&mut self, defaults: Parameters, overrides: Parameters) -> &mut Self {
        self.parameters.clear();
        self.parameters.merge(defaults);
        self.parameters.merge(overrides);
        self
    }

    /// Overwrite a single parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.parameters.insert(key, value);
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.parameters.get_str(key)
    }

    pub fn mch_id(&self) -> Option<&str> {
        self.get_str(keys::MCH_ID)
    }

    pub fn app_id(&self) -> Option<&str> {
        self.get_str(keys::APP_ID)
    }

    pub fn key(&self) -> Option<&str> {
        self.get_str(keys::KEY)
    }

    /// Raw certificate bytes. Accepts text values too, in case the
    /// certificate was supplied as a string.
    pub fn pfx(&self) -> Option<&[u8]> {
        self.parameters.get(keys::PFX).map(ParameterValue::as_bytes)
    }

    pub fn notify_url(&self) -> Option<&str> {
        self.get_str(keys::NOTIFY_URL)
    }

    /// Configured sign type; unparseable or missing values fall back to MD5.
    pub fn sign_type(&self) -> SignType {
        self.get_str(keys::SIGN_TYPE)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_with_empty_defaults() {
        let mut config = GatewayConfig::new();
        config.initialize(
            Parameters::new(),
            Parameters::new()
                .with("app_id", "wx123")
                .with("mch_id", "1272242000"),
        );

        assert_eq!(config.parameters().len(), 2);
        assert_eq!(config.app_id(), Some("wx123"));
        assert_eq!(config.mch_id(), Some("1272242000"));
    }

    #[test]
    fn test_initialize_resets_previous_values() {
        let mut config = GatewayConfig::new();
        config.set("stale", "value");
        config
            .initialize(Parameters::new().with("sign_type", "MD5"), Parameters::new())
            .set("key", "secret");

        assert!(!config.parameters().contains_key("stale"));
        assert_eq!(config.key(), Some("secret"));
        assert_eq!(config.sign_type(), SignType::Md5);
    }

    #[test]
    fn test_override_wins_on_collision() {
        let mut config = GatewayConfig::new();
        config.initialize(
            Parameters::new().with("sign_type", "MD5").with("extra", "kept"),
            Parameters::new().with("sign_type", "HMAC-SHA256"),
        );

        assert_eq!(config.sign_type(), SignType::HmacSha256);
        assert_eq!(config.get_str("extra"), Some("kept"));
    }
}
