//! Unified order ("purchase") objects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use super::{SUCCESS, check_return_code, required_field, xml};
use crate::gateway::GatewayError;
use crate::signature::{self, SIGN_FIELD, SignType};

/// How the payer is going to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    /// Web page opened inside the WeChat in-app browser.
    Jsapi,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Jsapi => "JSAPI",
        }
    }
}

/// Order description handed to [`InAppWebGateway::purchase`](crate::gateway::InAppWebGateway::purchase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Merchant-side order number, unique per merchant.
    pub out_trade_no: String,
    /// Short description shown to the payer.
    pub body: String,
    /// Amount in yuan (CNY), at most two fractional digits.
    pub amount: Decimal,
    /// Payer's openid under the configured app id. Required for JSAPI.
    #[serde(default)]
    pub openid: Option<String>,
    /// IP address of the payer's device.
    pub spbill_create_ip: String,
    /// Opaque data echoed back in the notification.
    #[serde(default)]
    pub attach: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    /// Deadline after which the order can no longer be paid.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time_expire: Option<OffsetDateTime>,
    /// Overrides the gateway's `notify_url` for this order.
    #[serde(default)]
    pub notify_url: Option<String>,
}

/// A signed unified order request, ready to be sent.
#[derive(Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    fields: BTreeMap<String, String>,
    /// Needed again to verify the answer.
    key: String,
    sign_type: SignType,
}

impl std::fmt::Debug for PurchaseRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseRequest")
            .field("fields", &self.fields)
            .field("key", &crate::config::REDACTED)
            .field("sign_type", &self.sign_type)
            .finish()
    }
}

impl PurchaseRequest {
    /// Sign `fields` with `key` and wrap them.
    pub fn new(mut fields: BTreeMap<String, String>, key: &str, sign_type: SignType) -> Self {
        let sign = signature::sign(&fields, key, sign_type);
        fields.insert(SIGN_FIELD.to_owned(), sign);
        Self {
            fields,
            key: key.to_owned(),
            sign_type,
        }
    }

    /// All request fields, `sign` included.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn out_trade_no(&self) -> Option<&str> {
        self.fields.get("out_trade_no").map(String::as_str)
    }

    pub fn sign_type(&self) -> SignType {
        self.sign_type
    }

    /// XML request body.
    pub fn to_xml(&self) -> String {
        xml::encode(&self.fields)
    }

    /// Interpret the raw XML answer of the unified order endpoint.
    pub fn parse_response(&self, body: &str) -> Result<PurchaseResponse, GatewayError> {
        let fields = xml::decode(body)?;
        PurchaseResponse::from_fields(fields, &self.key, self.sign_type)
    }
}

/// Successful unified order answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseResponse {
    pub prepay_id: String,
    pub trade_type: String,
    /// QR code content, NATIVE only.
    pub code_url: Option<String>,
    /// Redirect URL, MWEB only.
    pub mweb_url: Option<String>,
    /// Every field of the answer, as received.
    pub fields: BTreeMap<String, String>,
}

impl PurchaseResponse {
    /// Validate a decoded answer.
    ///
    /// Checks `return_code`, then the signature, then `result_code`.
    pub fn from_fields(
        fields: BTreeMap<String, String>,
        key: &str,
        sign_type: SignType,
    ) -> Result<Self, GatewayError> {
        check_return_code(&fields)?;
        signature::verify(&fields, key, sign_type)?;

        if fields.get("result_code").map(String::as_str) != Some(SUCCESS) {
            return Err(GatewayError::Business {
                code: fields.get("err_code").cloned().unwrap_or_default(),
                description: fields.get("err_code_des").cloned().unwrap_or_default(),
            });
        }

        let prepay_id = required_field(&fields, "prepay_id")?.to_owned();
        let trade_type = required_field(&fields, "trade_type")?.to_owned();
        let code_url = fields.get("code_url").cloned();
        let mweb_url = fields.get("mweb_url").cloned();

        Ok(Self {
            prepay_id,
            trade_type,
            code_url,
            mweb_url,
            fields,
        })
    }

    /// Parameters for `WeixinJSBridge.invoke('getBrandWCPayRequest', ...)`.
    pub fn jsapi_parameters(&self, app_id: &str, key: &str, sign_type: SignType) -> JsapiParameters {
        JsapiParameters::build(
            app_id,
            &self.prepay_id,
            key,
            sign_type,
            OffsetDateTime::now_utc().unix_timestamp(),
            signature::generate_nonce(),
        )
    }
}

/// Parameters the in-app web page needs to start the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsapiParameters {
    pub app_id: String,
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: String,
    pub pay_sign: String,
}

impl JsapiParameters {
    pub(crate) fn build(
        app_id: &str,
        prepay_id: &str,
        key: &str,
        sign_type: SignType,
        timestamp: i64,
        nonce_str: String,
    ) -> Self {
        let mut params = Self {
            app_id: app_id.to_owned(),
            time_stamp: timestamp.to_string(),
            nonce_str,
            package: format!("prepay_id={prepay_id}"),
            sign_type: sign_type.as_str().to_owned(),
            pay_sign: String::new(),
        };
        params.pay_sign = signature::sign(&params.signed_fields(), key, sign_type);
        params
    }

    fn signed_fields(&self) -> BTreeMap<String, String> {
        [
            ("appId", &self.app_id),
            ("timeStamp", &self.time_stamp),
            ("nonceStr", &self.nonce_str),
            ("package", &self.package),
            ("signType", &self.sign_type),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.clone()))
        .collect()
    }
}
