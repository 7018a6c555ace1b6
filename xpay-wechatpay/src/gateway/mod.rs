//! Payment gateways.
//!
//! Most payment gateways fall into one of two groups:
//!
//! * **Off-site** gateways redirect the payer to a page hosted by the
//!   provider, where payment details are entered.
//! * **On-site** gateways collect payment details on the merchant's own
//!   surface.
//!
//! WeChat Pay in-app web payments are off-site: the merchant page only asks
//! the WeChat client to open its own payment sheet.

mod in_app_web;

pub use in_app_web::InAppWebGateway;

use rust_decimal::Decimal;

use crate::config::{GatewayConfig, Parameters};
use crate::objects::xml::XmlError;
use crate::signature::SignatureError;

/// Behaviour shared by every gateway: named parameter storage with
/// defaults-then-overrides initialisation.
pub trait Gateway {
    /// Short, human-readable gateway name.
    fn name(&self) -> &'static str;

    /// Parameters applied by [`initialize`](Self::initialize) before the
    /// caller's values.
    fn default_parameters(&self) -> Parameters {
        Parameters::new()
    }

    fn config(&self) -> &GatewayConfig;

    fn config_mut(&mut self) -> &mut GatewayConfig;

    /// Replace the whole configuration with the defaults overlaid by
    /// `parameters`. Returns `self` so calls can be chained.
    fn initialize(&mut self, parameters: Parameters) -> &mut Self
    where
        Self: Sized,
    {
        let defaults = self.default_parameters();
        self.config_mut().initialize(defaults, parameters);
        self
    }
}

/// Errors produced while preparing requests or interpreting answers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing gateway parameter: {0}")]
    MissingParameter(&'static str),

    #[error("openid is required for JSAPI payments")]
    MissingOpenId,

    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("failed to format time: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("xml error: {0}")]
    Xml(#[from] XmlError),

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// `return_code` was not `SUCCESS`: the message itself was rejected.
    #[error("communication failure: {0}")]
    Communication(String),

    /// `result_code` was not `SUCCESS`.
    #[error("business failure {code}: {description}")]
    Business { code: String, description: String },

    /// The message was addressed to another app or merchant.
    #[error("{0} does not match the gateway configuration")]
    AccountMismatch(&'static str),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}
