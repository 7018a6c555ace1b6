//! Request, response and notification objects.

pub mod notify;
pub mod purchase;
pub mod xml;

pub use notify::{CompletePurchaseResponse, PaymentStatus, acknowledge};
pub use purchase::{JsapiParameters, Order, PurchaseRequest, PurchaseResponse, TradeType};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;

use crate::gateway::GatewayError;

/// Value of `return_code` / `result_code` on success.
pub const SUCCESS: &str = "SUCCESS";

/// Value of `return_code` / `result_code` on failure.
pub const FAIL: &str = "FAIL";

/// Convert an amount in yuan into fen, the unit the provider expects.
///
/// Returns `None` for non-positive amounts and amounts with more than two
/// fractional digits.
pub fn yuan_to_fen(amount: Decimal) -> Option<u64> {
    if amount <= Decimal::ZERO {
        return None;
    }
    let fen = amount.checked_mul(Decimal::ONE_HUNDRED)?;
    if !fen.fract().is_zero() {
        return None;
    }
    fen.to_u64()
}

/// Convert fen back into yuan.
pub fn fen_to_yuan(fen: u64) -> Decimal {
    Decimal::from(fen) / Decimal::ONE_HUNDRED
}

/// Fail with [`GatewayError::Communication`] unless `return_code` is `SUCCESS`.
///
/// `return_code` only reports whether the message itself was accepted; the
/// business outcome is carried by `result_code`.
pub(crate) fn check_return_code(fields: &BTreeMap<String, String>) -> Result<(), GatewayError> {
    match fields.get("return_code").map(String::as_str) {
        Some(SUCCESS) => Ok(()),
        _ => Err(GatewayError::Communication(
            fields.get("return_msg").cloned().unwrap_or_default(),
        )),
    }
}

/// Look up a field that must be present and non-empty.
pub(crate) fn required_field<'a>(
    fields: &'a BTreeMap<String, String>,
    name: &'static str,
) -> Result<&'a str, GatewayError> {
    fields
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingField(name))
}
