use anyhow::Result;
use axum::{routing::get, Router};
use capacity_viz::MapPipeline;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod routes;

use config::GatewayConfig;
use routes::AppState;

fn app(config: &GatewayConfig) -> Router {
    let mut pipeline = MapPipeline::new(&config.static_root);
    if config.legend_dir.is_dir() {
        tracing::info!("   Legend templates from {}", config.legend_dir.display());
        pipeline = pipeline.with_legend_dir(&config.legend_dir);
    } else {
        tracing::info!("   No legend templates at {}, using built-in legends", config.legend_dir.display());
    }

    let state = AppState::new(pipeline);

    routes::map_routes(state)
        .route("/", get(|| async { axum::response::Redirect::temporary("/options") }))
        .nest_service("/static", ServeDir::new(&config.static_root))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "capacity_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    if !config.static_root.is_dir() {
        tracing::warn!("   Static root {} does not exist yet", config.static_root.display());
    }

    let app = app(&config);
    let addr = config.bind_addr();

    tracing::info!("Capacity Gateway starting on {}", addr);
    tracing::info!("   Static root: {}", config.static_root.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
