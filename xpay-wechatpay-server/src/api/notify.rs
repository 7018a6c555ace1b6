//! `POST /notify` - payment notifications from WeChat Pay.
//!
//! The provider retries a notification until it receives a `SUCCESS`
//! acknowledgement, so the same order may be reported more than once.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use xpay_wechatpay::objects::{PaymentStatus, acknowledge};

use crate::state::AppState;

/// Verify the notification and answer with the XML acknowledgement.
pub(super) async fn notify(State(state): State<AppState>, body: String) -> Response {
    match state.gateway.complete_purchase(&body) {
        Ok(completion) => {
            match &completion.status {
                PaymentStatus::Paid => tracing::info!(
                    out_trade_no = %completion.out_trade_no,
                    transaction_id = ?completion.transaction_id,
                    amount = %completion.amount(),
                    "Payment completed"
                ),
                PaymentStatus::Failed { code, description } => tracing::warn!(
                    out_trade_no = %completion.out_trade_no,
                    code = %code,
                    description = %description,
                    "Payment failed"
                ),
            }
            xml_reply(StatusCode::OK, acknowledge(true, "OK"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected payment notification");
            xml_reply(StatusCode::BAD_REQUEST, acknowledge(false, &e.to_string()))
        }
    }
}

fn xml_reply(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        body,
    )
        .into_response()
}
