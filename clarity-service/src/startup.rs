//! Application startup and lifecycle management.

use crate::config::ClarityConfig;
use crate::handlers::{diagnosis, health, DIAGNOSIS_PATH};
use crate::services::ClarityGenerator;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors::{cors_middleware, OriginPolicy},
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use service_core::observability::{extract_request_id, extract_traceparent};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ClarityConfig,
    pub generator: ClarityGenerator,
    pub cors: Arc<OriginPolicy>,
}

impl AppState {
    pub fn new(config: ClarityConfig, generator: ClarityGenerator) -> Self {
        let cors = Arc::new(OriginPolicy::new(config.cors.allowed_origins.clone()));
        Self {
            config,
            generator,
            cors,
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Not found"))
}

pub fn build_router(state: AppState) -> Router {
    let cors = state.cors.clone();

    Router::new()
        .route(
            DIAGNOSIS_PATH,
            post(diagnosis::create_diagnosis).options(diagnosis::preflight),
        )
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics_endpoint))
        .route_layer(from_fn(metrics_middleware))
        .fallback(not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id =
                    extract_request_id(request.headers()).unwrap_or_else(|| "-".to_string());
                let traceparent =
                    extract_traceparent(request.headers()).unwrap_or_else(|| "-".to_string());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    traceparent = %traceparent,
                    method = %request.method(),
                    uri = %request.uri().path(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn_with_state(cors, cors_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the generator described by `config`.
    pub async fn build(config: ClarityConfig) -> Result<Self, AppError> {
        let generator = ClarityGenerator::from_settings(&config.gemini);
        Self::build_with_generator(config, generator).await
    }

    /// Build the application around an explicit generator (port 0 binds a random port).
    pub async fn build_with_generator(
        config: ClarityConfig,
        generator: ClarityGenerator,
    ) -> Result<Self, AppError> {
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            live = generator.is_live(),
            origins = ?config.cors.allowed_origins,
            "Clarity service listening"
        );

        let router = build_router(AppState::new(config, generator));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
