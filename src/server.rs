use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use tracing::info;

use crate::{
    config::AppConfig,
    error::ConfigError,
    middleware::{real_ip, request_logging, RequestLogger},
    routes,
    sink::LogSink,
    AppState,
};

/// Builds the router with access logging wrapped around every route.
///
/// Layers, outermost first: panic catcher, request id, real-IP (optional),
/// access log, timeout.
pub fn create_app(config: &AppConfig, sink: Arc<dyn LogSink>) -> Result<Router, ConfigError> {
    let request_id_header = config.logging.request_id_header()?;
    let logger = RequestLogger::new(config.logging.category.clone(), sink)
        .with_request_id_header(request_id_header.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
    };

    let mut app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/v1/health", get(routes::health::health_detailed))
        .route("/api/v1/echo", post(routes::echo::echo))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(logger, request_logging))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.timeout_seconds,
                ))),
        );

    if config.logging.trust_forwarded_headers {
        app = app.layer(from_fn(real_ip));
    }

    Ok(app.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::new())
            .layer(SetRequestIdLayer::new(
                request_id_header.clone(),
                MakeRequestUuid,
            ))
            .layer(PropagateRequestIdLayer::new(request_id_header)),
    ))
}

/// Binds `server.host:server.port` and serves until Ctrl-C.
pub async fn serve(config: AppConfig, sink: Arc<dyn LogSink>) -> Result<()> {
    let app = create_app(&config, sink)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        category = %config.logging.category,
        "Access-logged server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
