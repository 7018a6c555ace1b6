//! Request authentication for the merchant-facing API.
//!
//! The merchant backend signs each JSON body with the shared `api_secret`:
//!
//! ```text
//! Xpay-Signature: {unix_timestamp}.{hex(HMAC-SHA256("{timestamp}.{json_body}", api_secret))}
//! ```

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::state::AppState;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "Xpay-Signature";

/// Maximum allowed distance between the signature timestamp and now, in
/// seconds.
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

const MAX_BODY_SIZE: usize = 64 * 1024;

/// A JSON body whose `Xpay-Signature` header was verified against the
/// configured API secret.
pub struct SignedJson<T>(pub T);

#[derive(Debug, thiserror::Error)]
pub enum SignedJsonError {
    #[error("missing Xpay-Signature header")]
    MissingHeader,
    #[error("invalid Xpay-Signature header format")]
    InvalidHeader,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("signature expired")]
    Expired,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
}

impl IntoResponse for SignedJsonError {
    fn into_response(self) -> Response {
        let status = match self {
            SignedJsonError::MissingHeader
            | SignedJsonError::VerificationFailed
            | SignedJsonError::Expired => StatusCode::UNAUTHORIZED,
            SignedJsonError::InvalidHeader
            | SignedJsonError::BodyReadError
            | SignedJsonError::JsonError(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

impl<T: DeserializeOwned + Send> FromRequest<AppState> for SignedJson<T> {
    type Rejection = SignedJsonError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (timestamp, signature) = parse_signature_header(
            req.headers()
                .get(SIGNATURE_HEADER)
                .ok_or(SignedJsonError::MissingHeader)?
                .to_str()
                .map_err(|_| SignedJsonError::InvalidHeader)?,
        )?;

        let body = axum::body::to_bytes(req.into_body(), MAX_BODY_SIZE)
            .await
            .map_err(|_| SignedJsonError::BodyReadError)?;

        ring::hmac::verify(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, state.api_secret.as_bytes()),
            &signed_data(timestamp, &body),
            &signature,
        )
        .map_err(|_| SignedJsonError::VerificationFailed)?;
        check_timestamp(timestamp)?;

        let value = serde_json::from_slice(&body).map_err(SignedJsonError::JsonError)?;
        Ok(SignedJson(value))
    }
}

/// `{timestamp}.{hex}` into its parts.
fn parse_signature_header(value: &str) -> Result<(i64, Vec<u8>), SignedJsonError> {
    let (timestamp, signature) = value
        .split_once('.')
        .ok_or(SignedJsonError::InvalidHeader)?;
    let timestamp = timestamp
        .parse()
        .map_err(|_| SignedJsonError::InvalidHeader)?;
    let signature = hex::decode(signature).map_err(|_| SignedJsonError::InvalidHeader)?;
    Ok((timestamp, signature))
}

pub(crate) fn signed_data(timestamp: i64, body: &[u8]) -> Vec<u8> {
    let mut data = format!("{timestamp}.").into_bytes();
    data.extend_from_slice(body);
    data
}

fn check_timestamp(timestamp: i64) -> Result<(), SignedJsonError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if (now - timestamp).abs() > MAX_SIGNATURE_AGE {
        return Err(SignedJsonError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signature_header() {
        let (timestamp, signature) = parse_signature_header("1700000000.00ff").unwrap();
        assert_eq!(timestamp, 1_700_000_000);
        assert_eq!(signature, vec![0x00, 0xff]);

        for bad in ["", "1700000000", "abc.00ff", "1700000000.zz"] {
            assert!(matches!(
                parse_signature_header(bad),
                Err(SignedJsonError::InvalidHeader)
            ));
        }
    }

    #[test]
    fn test_check_timestamp() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        assert!(check_timestamp(now).is_ok());
        assert!(matches!(
            check_timestamp(now - MAX_SIGNATURE_AGE - 10),
            Err(SignedJsonError::Expired)
        ));
        assert!(matches!(
            check_timestamp(now + MAX_SIGNATURE_AGE + 10),
            Err(SignedJsonError::Expired)
        ));
    }
}
