mod bootstrap;
mod chat;
mod health;
mod hotels;

use anyhow::Result;
use axum::Router;
use staywise_core::config::{AppConfig, LoadOptions};
use tokio::net::TcpListener;

use crate::bootstrap::AppState;

fn init_logging(config: &AppConfig) {
    use staywise_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(hotels::router(state.clone()))
        .merge(chat::router(state))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        "staywise-server listening"
    );
    axum::serve(listener, router(app.state)).with_graceful_shutdown(wait_for_shutdown()).await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "staywise-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(event_name = "system.server.signal_failed", error = %error);
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use staywise_core::config::AppConfig;
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap_with_config;
    use crate::router;

    #[tokio::test]
    async fn merged_router_serves_health_and_unknown_paths() {
        let state = bootstrap_with_config(AppConfig::default()).expect("bootstrap").state;
        let app = router(state);

        let health = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);

        let missing = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
