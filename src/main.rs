use std::net::{IpAddr, SocketAddr};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use greencart_api::{
    app::build_router,
    config::AppConfig,
    db::{create_pool, run_migrations},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,greencart_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let addr = SocketAddr::from((config.host.parse::<IpAddr>()?, config.port));

    let state = AppState::new(pool, config)?;
    run_migrations(&state.orm).await?;

    if state.payments.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set, checkout runs in simulated mode");
    }

    let app = build_router(state);
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
