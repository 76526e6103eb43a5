mod catalog;
mod client;
mod config;
mod db;
mod entities;
mod error;
mod filter;
mod forms;
mod models;
mod routes;
mod templates;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{catalog::Catalog, client::ClientKeyResolver, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub client_keys: Arc<dyn ClientKeyResolver>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,cinedex=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url, config.db_max_connections).await?;
    let catalog = Catalog::new(db);

    if !config.trust_forwarded_for {
        tracing::info!("ignoring X-Forwarded-For; ratings keyed by peer address");
    }
    let client_keys = client::resolver(config.trust_forwarded_for);

    let state = Arc::new(AppState { catalog, client_keys });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
