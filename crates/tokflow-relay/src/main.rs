mod api;
mod config;
mod error;
mod upstream;

use api::AppState;
use config::RelayConfig;
use upstream::UpstreamClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tokflow_relay=debug".into()),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting tokflow relay");

    let config = RelayConfig::load()?;
    let state = AppState {
        upstream: UpstreamClient::new(&config.upstream_url, &config.model),
    };
    let app = api::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("tokflow relay listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
