use nse_proxy::models::clock::SystemClock;
use nse_proxy::server::handler::router;
use nse_proxy::{Config, MarketService, NseApi};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting NSE proxy server");

    let config = Config::from_env()?;
    debug!(
        "Upstream origin {}, allowed origins {:?}",
        config.upstream.origin, config.allowed_origins
    );

    let api = NseApi::new(&config.upstream, Arc::new(SystemClock))?;
    let service = Arc::new(MarketService::new(api));
    let app = router(service, &config.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server is running on port {}", listener.local_addr()?.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down");
    Ok(())
}
