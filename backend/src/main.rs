use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walk_recommender::{
    AppState,
    config::ServiceConfig,
    create_router,
    error::ServiceError,
    provider::{OsrmProvider, ReqwestTransport},
    recommend::Recommender,
};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walk_recommender=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::parse();
    let provider = OsrmProvider::new(ReqwestTransport::new()?, config.provider_settings());
    tracing::info!(
        "routing via {} (profile {}, {}ms timeout)",
        config.osrm_base_url,
        config.osrm_profile,
        config.provider_timeout_ms
    );

    let state = AppState {
        recommender: Arc::new(Recommender::new(Arc::new(provider))),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("starting backend on http://{}", config.bind_addr);
    tracing::info!("POST /recommend or GET /routes/recommend?time=30&lat=..&lng=..");
    axum::serve(listener, app).await?;
    Ok(())
}
