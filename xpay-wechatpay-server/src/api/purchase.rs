//! `POST /purchase` - create a unified order.
//!
//! Accepts an [`Order`] as signed JSON (see [`SignedJson`]), submits it to
//! WeChat Pay and returns the parameters the checkout page hands to
//! `WeixinJSBridge`.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use xpay_wechatpay::client::ClientError;
use xpay_wechatpay::gateway::GatewayError;
use xpay_wechatpay::objects::{JsapiParameters, Order};

use super::extractors::SignedJson;
use crate::state::AppState;

/// Response body of `POST /purchase`.
#[derive(Debug, Serialize)]
pub(super) struct PurchaseResult {
    out_trade_no: String,
    prepay_id: String,
    jsapi: JsapiParameters,
}

pub(super) async fn purchase(
    State(state): State<AppState>,
    SignedJson(order): SignedJson<Order>,
) -> Result<Json<PurchaseResult>, PurchaseApiError> {
    let request = state.gateway.purchase(&order)?;
    let response = request.send(&state.client).await?;
    let jsapi = state.gateway.jsapi_parameters(&response)?;

    Ok(Json(PurchaseResult {
        out_trade_no: order.out_trade_no,
        prepay_id: response.prepay_id,
        jsapi,
    }))
}

/// Errors that can occur in the purchase handler.
#[derive(Debug)]
pub(super) enum PurchaseApiError {
    /// The order could not be turned into a request.
    Gateway(GatewayError),
    /// Talking to the provider failed.
    Client(ClientError),
}

impl From<GatewayError> for PurchaseApiError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

impl From<ClientError> for PurchaseApiError {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

impl IntoResponse for PurchaseApiError {
    fn into_response(self) -> Response {
        match self {
            PurchaseApiError::Gateway(
                e @ (GatewayError::MissingOpenId | GatewayError::InvalidAmount(_)),
            ) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            PurchaseApiError::Gateway(e) => {
                tracing::error!(error = %e, "Purchase could not be prepared");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            PurchaseApiError::Client(ClientError::Gateway(e @ GatewayError::Business { .. })) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
            }
            PurchaseApiError::Client(e) => {
                tracing::warn!(error = %e, "Unified order failed");
                (StatusCode::BAD_GATEWAY, "payment provider error").into_response()
            }
        }
    }
}
