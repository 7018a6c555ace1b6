//! Gateway for in-app web (JSAPI) payments.

use bytes::Bytes;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::{format_description, offset};

use super::{Gateway, GatewayError};
use crate::config::{GatewayConfig, ParameterValue, Parameters, keys};
use crate::objects::{
    CompletePurchaseResponse, JsapiParameters, Order, PurchaseRequest, PurchaseResponse, TradeType,
    xml,
};
use crate::signature::{self, SIGN_TYPE_FIELD, SignType};

/// `yyyyMMddHHmmss`, the provider's timestamp format.
const PROVIDER_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

/// Gateway for payments started from a web page opened inside the WeChat
/// in-app browser.
///
/// ```ignore
/// use xpay_wechatpay::gateway::{Gateway, InAppWebGateway};
///
/// let mut gateway = InAppWebGateway::new();
/// gateway
///     .set_app_id("wx7065330377b79c60")
///     .set_mch_id("1272242000")
///     .set_key("paymentwechattest000000000");
///
/// let request = gateway.purchase(&order)?;
/// let response = request.send(&client).await?;
/// let js = gateway.jsapi_parameters(&response)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InAppWebGateway {
    config: GatewayConfig,
}

impl InAppWebGateway {
    /// Create an empty gateway. The sign type falls back to MD5 until one
    /// is set.
    pub fn new() -> Self {
        let mut gateway = Self::default();
        gateway.initialize(Parameters::new());
        gateway
    }

    pub fn set_mch_id(&mut self, mch_id: impl Into<String>) -> &mut Self {
        self.config.set(keys::MCH_ID, ParameterValue::Text(mch_id.into()));
        self
    }

    pub fn set_app_id(&mut self, app_id: impl Into<String>) -> &mut Self {
        self.config.set(keys::APP_ID, ParameterValue::Text(app_id.into()));
        self
    }

    pub fn set_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.config.set(keys::KEY, ParameterValue::Text(key.into()));
        self
    }

    /// Store the content of the merchant's `apiclient_cert.p12` file.
    pub fn set_pfx(&mut self, pfx: impl Into<Bytes>) -> &mut Self {
        self.config.set(keys::PFX, ParameterValue::Binary(pfx.into()));
        self
    }

    pub fn set_sign_type(&mut self, sign_type: SignType) -> &mut Self {
        self.config.set(keys::SIGN_TYPE, sign_type.as_str());
        self
    }

    pub fn set_notify_url(&mut self, notify_url: impl Into<String>) -> &mut Self {
        self.config.set(keys::NOTIFY_URL, ParameterValue::Text(notify_url.into()));
        self
    }

    /// Build a signed unified order request for `order`.
    ///
    /// Nothing is sent; see [`PurchaseRequest::send`] (feature `client`).
    pub fn purchase(&self, order: &Order) -> Result<PurchaseRequest, GatewayError> {
        let app_id = require(self.config.app_id(), keys::APP_ID)?;
        let mch_id = require(self.config.mch_id(), keys::MCH_ID)?;
        let key = require(self.config.key(), keys::KEY)?;
        let notify_url = require(
            order
                .notify_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .or(self.config.notify_url()),
            keys::NOTIFY_URL,
        )?;
        let openid = order
            .openid
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(GatewayError::MissingOpenId)?;
        let total_fee = crate::objects::yuan_to_fen(order.amount)
            .ok_or(GatewayError::InvalidAmount(order.amount))?;
        let sign_type = self.config.sign_type();

        let mut fields = BTreeMap::new();
        let mut put = |name: &str, value: &str| {
            fields.insert(name.to_owned(), value.to_owned());
        };
        put("appid", app_id);
        put("mch_id", mch_id);
        put("nonce_str", &signature::generate_nonce());
        put("body", &order.body);
        put("out_trade_no", &order.out_trade_no);
        put("total_fee", &total_fee.to_string());
        put("spbill_create_ip", &order.spbill_create_ip);
        put("notify_url", notify_url);
        put("trade_type", TradeType::Jsapi.as_str());
        put("openid", openid);
        if let Some(attach) = &order.attach {
            put("attach", attach);
        }
        if let Some(detail) = &order.detail {
            put("detail", detail);
        }
        if let Some(time_expire) = order.time_expire {
            put("time_expire", &format_provider_time(time_expire)?);
        }
        if sign_type != SignType::Md5 {
            put(SIGN_TYPE_FIELD, sign_type.as_str());
        }

        tracing::debug!(out_trade_no = %order.out_trade_no, total_fee, "unified order prepared");
        Ok(PurchaseRequest::new(fields, key, sign_type))
    }

    /// Authenticate a payment notification and report its outcome.
    ///
    /// `notification` is the raw XML body POSTed by the provider.
    pub fn complete_purchase(
        &self,
        notification: &str,
    ) -> Result<CompletePurchaseResponse, GatewayError> {
        let key = require(self.config.key(), keys::KEY)?;
        let fields = xml::decode(notification)?;
        crate::objects::check_return_code(&fields)?;

        let sign_type = match fields.get(SIGN_TYPE_FIELD) {
            Some(s) => s.parse()?,
            None => self.config.sign_type(),
        };
        signature::verify(&fields, key, sign_type)?;

        self.check_account(&fields, "appid", keys::APP_ID)?;
        self.check_account(&fields, "mch_id", keys::MCH_ID)?;

        let response = CompletePurchaseResponse::from_fields(fields)?;
        tracing::debug!(
            out_trade_no = %response.out_trade_no,
            transaction_id = ?response.transaction_id,
            paid = response.is_successful(),
            "payment notification verified"
        );
        Ok(response)
    }

    /// Parameters the in-app web page passes to the WeChat client to open
    /// the payment sheet for `response`.
    pub fn jsapi_parameters(
        &self,
        response: &PurchaseResponse,
    ) -> Result<JsapiParameters, GatewayError> {
        let app_id = require(self.config.app_id(), keys::APP_ID)?;
        let key = require(self.config.key(), keys::KEY)?;
        Ok(response.jsapi_parameters(app_id, key, self.config.sign_type()))
    }

    /// The notification field `field` must equal the configured `key`.
    fn check_account(
        &self,
        fields: &BTreeMap<String, String>,
        field: &'static str,
        key: &'static str,
    ) -> Result<(), GatewayError> {
        let expected = require(self.config.get_str(key), key)?;
        match fields.get(field) {
            Some(actual) if actual == expected => Ok(()),
            _ => Err(GatewayError::AccountMismatch(field)),
        }
    }
}

impl Gateway for InAppWebGateway {
    fn name(&self) -> &'static str {
        "WeChat Pay In-App Web"
    }

    fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut GatewayConfig {
        &mut self.config
    }
}

fn require<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, GatewayError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingParameter(name))
}

fn format_provider_time(at: OffsetDateTime) -> Result<String, GatewayError> {
    Ok(at.to_offset(offset!(+8)).format(PROVIDER_TIME)?)
}
