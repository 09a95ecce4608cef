use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secretd::{routes, Config, ServiceState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = ServiceState::from_config(&config);
    tracing::info!("✅ Service state initialized");

    let app = routes::router(state.clone())?;

    let sweep_every = Duration::from_secs(config.session_sweep_secs.max(1));
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_every).await;
            sessions.expire_stale().await;
        }
    });
    tracing::info!(
        "✅ Session sweep started (every {}s, max age {}s)",
        sweep_every.as_secs(),
        config.session_max_age_secs
    );

    let addr = config.bind_addr;
    if !addr.ip().is_loopback() {
        tracing::warn!("⚠️ Binding to non-loopback address {}", addr);
    }
    tracing::info!("🚀 Secret service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
