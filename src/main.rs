use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use viewing_history_api::{
    api::{create_router, AppState},
    config::Config,
    store::ElasticsearchStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = ElasticsearchStore::new(
        &config.elastic_url,
        &config.elastic_index,
        Duration::from_secs(config.elastic_timeout_secs),
    )
    .context("failed to build search backend client")?;

    let app = create_router(AppState::new(Arc::new(store)));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
