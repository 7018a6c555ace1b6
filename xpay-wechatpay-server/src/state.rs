//! Application state shared across all request handlers.

use std::sync::Arc;
use xpay_wechatpay::client::WechatPayClient;
use xpay_wechatpay::gateway::InAppWebGateway;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Configured gateway. Read-only once the server is running.
    pub gateway: Arc<InAppWebGateway>,
    /// HTTP client for the provider API.
    pub client: Arc<WechatPayClient>,
    /// Shared secret the merchant backend signs API requests with.
    pub api_secret: Arc<str>,
}

impl AppState {
    /// Create a new AppState from a configured gateway and client.
    pub fn new(gateway: InAppWebGateway, client: WechatPayClient, api_secret: &str) -> Self {
        Self {
            gateway: Arc::new(gateway),
            client: Arc::new(client),
            api_secret: Arc::from(api_secret),
        }
    }
}
