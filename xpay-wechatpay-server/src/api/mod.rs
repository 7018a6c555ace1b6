//! HTTP API.
//!
//! # Endpoints
//!
//! - `POST /purchase` – create a unified order and return the JSAPI
//!   parameters for the checkout page (called by the merchant backend,
//!   body signed with the API secret)
//! - `POST /notify`   – payment notifications (called by WeChat Pay)

mod extractors;
mod notify;
mod purchase;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/purchase", post(purchase::purchase))
        .route("/notify", post(notify::notify))
}

#[cfg(test)]
mod tests {
    use super::extractors::{MAX_SIGNATURE_AGE, SIGNATURE_HEADER, signed_data};
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::{Router, routing};
    use std::collections::BTreeMap;
    use tower::ServiceExt;
    use url::Url;
    use xpay_wechatpay::client::{UNIFIED_ORDER_PATH, WechatPayClient};
    use xpay_wechatpay::gateway::InAppWebGateway;
    use xpay_wechatpay::objects::xml;
    use xpay_wechatpay::signature::{self, SignType};

    const KEY: &str = "paymentwechattest000000000000000";
    const API_SECRET: &str = "merchant-backend-secret";
    const PREPAY_ID: &str = "wx201411101639507cbf6ffd8b0779950874";

    fn state(provider: Url) -> AppState {
        let mut gateway = InAppWebGateway::new();
        gateway
            .set_app_id("wx7065330377b79c60")
            .set_mch_id("1272242000")
            .set_key(KEY)
            .set_notify_url("https://example.com/api/v1/notify");
        AppState::new(gateway, WechatPayClient::new(provider), API_SECRET)
    }

    /// A provider address nothing listens on.
    fn unreachable() -> Url {
        Url::parse("http://127.0.0.1:1").unwrap()
    }

    fn to_fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn signed_xml(mut fields: BTreeMap<String, String>, key: &str) -> String {
        let sign = signature::sign(&fields, key, SignType::Md5);
        fields.insert("sign".to_owned(), sign);
        xml::encode(&fields)
    }

    fn notification(key: &str) -> String {
        signed_xml(
            to_fields(&[
                ("appid", "wx7065330377b79c60"),
                ("mch_id", "1272242000"),
                ("nonce_str", "MqswD8mgVds6pfb0aWkaSBQ1DHuHD8b0"),
                ("out_trade_no", "805754f0f78b11e5b4a30fb5e5f1f0d0"),
                ("result_code", "SUCCESS"),
                ("return_code", "SUCCESS"),
                ("total_fee", "1"),
                ("transaction_id", "4001482001201604014454778410"),
            ]),
            key,
        )
    }

    async fn spawn_provider() -> Url {
        async fn unified_order(body: String) -> String {
            let request = xml::decode(&body).unwrap();
            signature::verify(&request, KEY, SignType::Md5).unwrap();
            signed_xml(
                to_fields(&[
                    ("return_code", "SUCCESS"),
                    ("result_code", "SUCCESS"),
                    ("appid", request["appid"].as_str()),
                    ("mch_id", request["mch_id"].as_str()),
                    ("nonce_str", "IITRi8Iabbblz1Jc"),
                    ("trade_type", request["trade_type"].as_str()),
                    ("prepay_id", PREPAY_ID),
                ]),
                KEY,
            )
        }

        let router = Router::new().route(
            &format!("/{UNIFIED_ORDER_PATH}"),
            routing::post(unified_order),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn order(openid: Option<&str>) -> String {
        let mut order = serde_json::json!({
            "out_trade_no": "805754f0f78b11e5b4a30fb5e5f1f0d0",
            "body": "coffee",
            "amount": "0.01",
            "spbill_create_ip": "127.0.0.1"
        });
        if let Some(openid) = openid {
            order["openid"] = openid.into();
        }
        order.to_string()
    }

    fn signature_header(secret: &str, timestamp: i64, body: &str) -> String {
        let tag = ring::hmac::sign(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret.as_bytes()),
            &signed_data(timestamp, body.as_bytes()),
        );
        format!("{timestamp}.{}", hex::encode(tag.as_ref()))
    }

    fn now() -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, String) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn notify_request(body: String) -> Request<Body> {
        Request::post("/api/v1/notify")
            .header(header::CONTENT_TYPE, "text/xml")
            .body(Body::from(body))
            .unwrap()
    }

    fn purchase_request(body: String, signature: Option<String>) -> Request<Body> {
        let mut builder =
            Request::post("/api/v1/purchase").header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_notify_acknowledges_valid_notification() {
        let (status, body) = send(state(unreachable()), notify_request(notification(KEY))).await;

        assert_eq!(status, StatusCode::OK);
        let reply = xml::decode(&body).unwrap();
        assert_eq!(reply["return_code"], "SUCCESS");
    }

    #[tokio::test]
    async fn test_notify_rejects_forged_notification() {
        let (status, body) =
            send(state(unreachable()), notify_request(notification("forged"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let reply = xml::decode(&body).unwrap();
        assert_eq!(reply["return_code"], "FAIL");
    }

    #[tokio::test]
    async fn test_purchase_returns_jsapi_parameters() {
        let provider = spawn_provider().await;
        let body = order(Some("otKjSjnDI8berNLVGHvRyRf6aJp0"));
        let signature = signature_header(API_SECRET, now(), &body);

        let (status, body) = send(state(provider), purchase_request(body, Some(signature))).await;

        assert_eq!(status, StatusCode::OK, "{body}");
        let result: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(result["prepay_id"], PREPAY_ID);
        assert_eq!(result["jsapi"]["appId"], "wx7065330377b79c60");
        assert_eq!(result["jsapi"]["package"], format!("prepay_id={PREPAY_ID}"));
        assert_eq!(result["jsapi"]["signType"], "MD5");
    }

    #[tokio::test]
    async fn test_purchase_rejects_order_without_openid() {
        let body = order(None);
        let signature = signature_header(API_SECRET, now(), &body);
        let (status, _) =
            send(state(unreachable()), purchase_request(body, Some(signature))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_purchase_requires_valid_signature() {
        let body = order(Some("otKjSjnDI8berNLVGHvRyRf6aJp0"));

        let (status, _) = send(state(unreachable()), purchase_request(body.clone(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let wrong_secret = signature_header("guessed", now(), &body);
        let (status, _) = send(
            state(unreachable()),
            purchase_request(body.clone(), Some(wrong_secret)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let tampered = signature_header(API_SECRET, now(), &body);
        let (status, _) = send(
            state(unreachable()),
            purchase_request(body.replace("0.01", "0.02"), Some(tampered)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let stale = signature_header(API_SECRET, now() - MAX_SIGNATURE_AGE - 60, &body);
        let (status, _) = send(state(unreachable()), purchase_request(body, Some(stale))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, _) = send(state(unreachable()), request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
