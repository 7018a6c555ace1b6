//! Payment notification objects.
//!
//! WeChat Pay reports the outcome of every order by POSTing an XML envelope
//! to the order's `notify_url`, for example:
//!
//! ```xml
//! <xml>
//!   <appid><![CDATA[wx7065330377b79c60]]></appid>
//!   <mch_id><![CDATA[1272242000]]></mch_id>
//!   <out_trade_no><![CDATA[805754f0f78b11e5b4a30fb5e5f1f0d0]]></out_trade_no>
//!   <result_code><![CDATA[SUCCESS]]></result_code>
//!   <return_code><![CDATA[SUCCESS]]></return_code>
//!   <sign><![CDATA[BE417560245271F9DB8EA0BFAE2D9FE0]]></sign>
//!   <total_fee>1</total_fee>
//!   <transaction_id><![CDATA[4001482001201604014454778410]]></transaction_id>
//!   ...
//! </xml>
//! ```
//!
//! The merchant must answer with [`acknowledge`], otherwise the provider
//! keeps retrying.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{FAIL, SUCCESS, fen_to_yuan, required_field, xml};
use crate::gateway::GatewayError;

/// Business outcome carried by `result_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Failed { code: String, description: String },
}

/// Authenticated payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletePurchaseResponse {
    pub status: PaymentStatus,
    pub out_trade_no: String,
    pub transaction_id: Option<String>,
    /// Order total in fen.
    pub total_fee: u64,
    pub fee_type: Option<String>,
    pub openid: Option<String>,
    pub trade_type: Option<String>,
    pub bank_type: Option<String>,
    /// Payment time, `yyyyMMddHHmmss` in China Standard Time.
    pub time_end: Option<String>,
    pub attach: Option<String>,
    /// Every field of the notification, as received.
    pub fields: BTreeMap<String, String>,
}

impl CompletePurchaseResponse {
    /// Build from a notification whose signature was already verified.
    pub(crate) fn from_fields(fields: BTreeMap<String, String>) -> Result<Self, GatewayError> {
        let status = match fields.get("result_code").map(String::as_str) {
            Some(SUCCESS) => PaymentStatus::Paid,
            _ => PaymentStatus::Failed {
                code: fields.get("err_code").cloned().unwrap_or_default(),
                description: fields.get("err_code_des").cloned().unwrap_or_default(),
            },
        };

        let out_trade_no = required_field(&fields, "out_trade_no")?.to_owned();
        let raw_fee = required_field(&fields, "total_fee")?;
        let total_fee = raw_fee.parse::<u64>().map_err(|_| GatewayError::InvalidField {
            field: "total_fee",
            value: raw_fee.to_owned(),
        })?;

        let optional = |name: &str| fields.get(name).filter(|v| !v.is_empty()).cloned();

        Ok(Self {
            status,
            out_trade_no,
            transaction_id: optional("transaction_id"),
            total_fee,
            fee_type: optional("fee_type"),
            openid: optional("openid"),
            trade_type: optional("trade_type"),
            bank_type: optional("bank_type"),
            time_end: optional("time_end"),
            attach: optional("attach"),
            fields,
        })
    }

    /// Whether the payer actually paid.
    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// Order total in yuan.
    pub fn amount(&self) -> Decimal {
        fen_to_yuan(self.total_fee)
    }
}

/// XML reply telling the provider whether the notification was accepted.
pub fn acknowledge(success: bool, message: &str) -> String {
    let mut fields = BTreeMap::new();
    fields.insert(
        "return_code".to_owned(),
        if success { SUCCESS } else { FAIL }.to_owned(),
    );
    fields.insert("return_msg".to_owned(), message.to_owned());
    xml::encode(&fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(result_code: &str, total_fee: &str) -> BTreeMap<String, String> {
        [
            ("appid", "wx7065330377b79c60"),
            ("bank_type", "ICBC_DEBIT"),
            ("mch_id", "1272242000"),
            ("out_trade_no", "805754f0f78b11e5b4a30fb5e5f1f0d0"),
            ("result_code", result_code),
            ("return_code", "SUCCESS"),
            ("total_fee", total_fee),
            ("transaction_id", "4001482001201604014454778410"),
            ("attach", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    #[test]
    fn test_paid_notification() {
        let response = CompletePurchaseResponse::from_fields(notification(SUCCESS, "1250")).unwrap();

        assert!(response.is_successful());
        assert_eq!(response.total_fee, 1250);
        assert_eq!(response.amount(), Decimal::new(125, 1));
        assert_eq!(response.bank_type.as_deref(), Some("ICBC_DEBIT"));
        assert_eq!(response.attach, None);
    }

    #[test]
    fn test_failed_notification() {
        let mut fields = notification(FAIL, "1");
        fields.insert("err_code".to_owned(), "NOTENOUGH".to_owned());
        let response = CompletePurchaseResponse::from_fields(fields).unwrap();

        assert!(!response.is_successful());
        assert_eq!(
            response.status,
            PaymentStatus::Failed {
                code: "NOTENOUGH".to_owned(),
                description: String::new(),
            }
        );
    }

    #[test]
    fn test_invalid_total_fee() {
        assert!(matches!(
            CompletePurchaseResponse::from_fields(notification(SUCCESS, "1.5")),
            Err(GatewayError::InvalidField { field: "total_fee", .. })
        ));
    }

    #[test]
    fn test_acknowledge() {
        assert_eq!(
            acknowledge(true, "OK"),
            "<xml><return_code><![CDATA[SUCCESS]]></return_code>\
             <return_msg><![CDATA[OK]]></return_msg></xml>"
        );
        assert!(acknowledge(false, "invalid signature").contains("<![CDATA[FAIL]]>"));
    }
}
