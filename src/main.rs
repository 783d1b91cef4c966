mod config;
mod cors;
mod error;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod state;
mod supabase;

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;
use crate::supabase::SupabaseClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aitool_pool_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let bind_addr = config.bind_addr;
    let supabase = SupabaseClient::new(reqwest::Client::new(), &config.supabase)?;

    tracing::info!("Forwarding to backend at {}", config.supabase.url);
    if config.supabase.service_role_key.is_none() {
        tracing::warn!("No service role key configured; download counting will fail");
    }
    if config.rate_limit.disabled {
        tracing::warn!("Rate limiting disabled");
    } else {
        tracing::info!(
            "Rate limit: {} requests per {} ms",
            config.rate_limit.limit,
            config.rate_limit.window.as_millis()
        );
    }
    if config.allowed_origins.is_empty() {
        tracing::info!("CORS: any origin");
    } else {
        tracing::info!("CORS allow-list: {}", config.allowed_origins.join(", "));
    }

    let state = AppState::new(config, supabase);

    // expired windows sweep
    tokio::spawn(rate_limit::sweep_expired(state.rate_limiter.clone()));

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Gateway listening on http://{}", bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
