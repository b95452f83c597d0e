use proxy::{config::ProxyConfig, create_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::from_env()?;
    let app = create_router(AppState::new(&config.backend_base_url));

    tracing::info!(
        "proxying http://{}/api/proxy to {}",
        config.bind_addr,
        config.backend_base_url
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {err}");
            }
        })
        .await?;

    Ok(())
}
