//! xpay WeChat Pay server
//!
//! Companion HTTP service for JSAPI checkouts inside the WeChat browser:
//! creates unified orders for the merchant backend and answers payment
//! notifications from WeChat Pay.

mod api;
mod config;
mod server;
mod state;

use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xpay_wechatpay::gateway::Gateway;

/// WeChat Pay in-app web checkout service
#[derive(Parser, Debug)]
#[command(name = "xpay-wechatpay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "XPAY_CONFIG", default_value = "./xpay-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting xpay-wechatpay-server v{}", env!("CARGO_PKG_VERSION"));

    let loaded_config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!(
        gateway = loaded_config.gateway.name(),
        mch_id = loaded_config.gateway.config().mch_id().unwrap_or_default(),
        sign_type = %loaded_config.gateway.config().sign_type(),
        "Configuration loaded from {:?}",
        args.config
    );

    let state = AppState::new(
        loaded_config.gateway,
        loaded_config.client,
        &loaded_config.server.api_secret,
    );
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xpay_wechatpay=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
