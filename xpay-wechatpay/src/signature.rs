//! Signature algorithm and verification for WeChat Pay API v2.
//!
//! Every request and response exchanged with the v2 API carries a `sign`
//! field computed over the other fields:
//!
//! ```text
//! string_a = "k1=v1&k2=v2&..."        keys ascending, empty values and `sign` skipped
//! sign     = UPPER_HEX(MD5(string_a + "&key=" + api_key))
//!          | UPPER_HEX(HMAC-SHA256(string_a + "&key=" + api_key, api_key))
//! ```

use md5::{Digest, Md5};
use rand::Rng;
use std::collections::BTreeMap;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Name of the signature field.
pub const SIGN_FIELD: &str = "sign";

/// Name of the field announcing the sign type.
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// Length of generated `nonce_str` values.
pub const NONCE_LENGTH: usize = 32;

/// Digest used to produce the `sign` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SignType {
    #[default]
    Md5,
    HmacSha256,
}

impl SignType {
    /// Wire name of the sign type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignType::Md5 => "MD5",
            SignType::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl std::fmt::Display for SignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignType {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MD5" => Ok(SignType::Md5),
            "HMAC-SHA256" => Ok(SignType::HmacSha256),
            other => Err(SignatureError::UnsupportedSignType(other.to_owned())),
        }
    }
}

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("missing sign field")]
    MissingSignature,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("unsupported sign type: {0}")]
    UnsupportedSignType(String),
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Build the string that gets digested, including the trailing key.
fn string_to_sign(params: &BTreeMap<String, String>, key: &str) -> String {
    let mut data = params
        .iter()
        .filter(|(k, v)| k.as_str() != SIGN_FIELD && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    data.push_str("&key=");
    data.push_str(key);
    data
}

fn hmac_key(key: &str) -> ring::hmac::Key {
    ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key.as_bytes())
}

/// Compute the `sign` value for `params` with the given API key.
pub fn sign(params: &BTreeMap<String, String>, key: &str, sign_type: SignType) -> String {
    let data = string_to_sign(params, key);
    match sign_type {
        SignType::Md5 => hex::encode_upper(Md5::digest(data.as_bytes())),
        SignType::HmacSha256 => {
            hex::encode_upper(ring::hmac::sign(&hmac_key(key), data.as_bytes()).as_ref())
        }
    }
}

/// Verify the `sign` field of `params`.
///
/// The received value is hex-decoded, so its case does not matter, and
/// compared in constant time.
pub fn verify(
    params: &BTreeMap<String, String>,
    key: &str,
    sign_type: SignType,
) -> Result<(), SignatureError> {
    let received = params
        .get(SIGN_FIELD)
        .ok_or(SignatureError::MissingSignature)?;
    let received = hex::decode(received).map_err(|_| SignatureError::SignatureMismatch)?;
    let data = string_to_sign(params, key);
    match sign_type {
        SignType::Md5 => {
            let expected = Md5::digest(data.as_bytes());
            if bool::from(expected.as_slice().ct_eq(received.as_slice())) {
                Ok(())
            } else {
                Err(SignatureError::SignatureMismatch)
            }
        }
        SignType::HmacSha256 => {
            ring::hmac::verify(&hmac_key(key), data.as_bytes(), &received)?;
            Ok(())
        }
    }
}

/// Generate a random alphanumeric `nonce_str`.
pub fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}
