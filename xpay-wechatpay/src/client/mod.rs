//! HTTP client for the WeChat Pay v2 API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need signing and the message types do not pull in `reqwest`.

use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::GatewayConfig;
use crate::gateway::GatewayError;
use crate::objects::{PurchaseRequest, PurchaseResponse};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mch.weixin.qq.com";

/// Unified order endpoint, relative to the API root.
pub const UNIFIED_ORDER_PATH: &str = "pay/unifiedorder";

/// Errors produced by [`WechatPayClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered, but the answer was rejected.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed HTTP client for the provider API.
#[derive(Debug, Clone)]
pub struct WechatPayClient {
    http: Client,
    base_url: Url,
}

impl WechatPayClient {
    /// Create a client talking to `base_url` with a default `reqwest::Client`.
    ///
    /// Endpoints are resolved below the path of `base_url`, so a sandbox
    /// root such as `https://api.mch.weixin.qq.com/sandboxnew` works.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url: as_directory(base_url),
        }
    }

    /// Create a client for the production API, presenting the gateway's
    /// client certificate when one is configured.
    ///
    /// The PKCS#12 password is the merchant id, as issued by the provider.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(DEFAULT_BASE_URL)?;
        let mut builder = Client::builder().timeout(std::time::Duration::from_secs(30));
        if let Some(pfx) = config.pfx() {
            let password = config.mch_id().unwrap_or_default();
            let identity = reqwest::Identity::from_pkcs12_der(pfx, password)?;
            builder = builder.identity(identity);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Point the client at another API root (sandbox, test server).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = as_directory(base_url);
        self
    }

    /// `POST /pay/unifiedorder` – submit a purchase.
    pub async fn unified_order(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseResponse, ClientError> {
        let url = self.base_url.join(UNIFIED_ORDER_PATH)?;

        tracing::debug!(out_trade_no = ?request.out_trade_no(), %url, "sending unified order");
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(request.to_xml())
            .send()
            .await?;

        let body = read_body(resp).await?;
        let response = request.parse_response(&body).inspect_err(|e| {
            tracing::warn!(out_trade_no = ?request.out_trade_no(), error = %e, "unified order rejected");
        })?;
        tracing::info!(
            out_trade_no = ?request.out_trade_no(),
            prepay_id = %response.prepay_id,
            "unified order accepted"
        );
        Ok(response)
    }
}

impl PurchaseRequest {
    /// Submit this request through `client`.
    pub async fn send(&self, client: &WechatPayClient) -> Result<PurchaseResponse, ClientError> {
        client.unified_order(self).await
    }
}

/// Make sure `url` ends with `/` so `join` keeps its last path segment.
fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn read_body(resp: reqwest::Response) -> Result<String, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    Ok(resp.text().await?)
}
