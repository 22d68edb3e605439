use std::{process::abort, time::Duration};

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
};
use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;
use tokio::signal;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{Span, error, info, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use tracker::{AppState, build_router, config::Settings, error::AppError, store};

#[tokio::main]
pub async fn main() -> Result<(), AppError> {
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded .env file"),
        Err(_) => warn!("Failed to load .env file"),
    };

    let Some(settings) = Settings::from_env() else {
        error!("DATABASE_URL not in environment");
        abort();
    };

    let tracer = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .build()
        .map_err(|e| {
            error!(message = "Failed to build span exporter", error=%e);
            AppError::Status(StatusCode::SERVICE_UNAVAILABLE)
        })?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(tracer)
        .build();

    global::set_tracer_provider(provider.clone());

    // Set up tracing with both console output and OpenTelemetry
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_filter(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .with(
            OpenTelemetryLayer::new(provider.tracer("tracker-service"))
                .with_filter(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .init();

    info!(
        message = "Starting",
        title = settings.app_title,
        description = settings.app_description
    );

    let pool = store::connect(&settings.database_url).await.map_err(|e| {
        error!(message = "Failed to connect to database", error=%e);
        AppError::Status(StatusCode::SERVICE_UNAVAILABLE)
    })?;

    let app = build_router(AppState { pool }).layer(
        TraceLayer::new_for_http()
            .make_span_with(|_request: &Request<Body>| {
                let request_id = Uuid::new_v4().to_string();
                tracing::info_span!("http-request", %request_id)
            })
            .on_request(|request: &Request<Body>, _span: &Span| {
                info!(
                    message = "request",
                    request = request.method().as_str(),
                    uri = request.uri().path().to_string(),
                    user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                )
            })
            .on_response(
                |response: &Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        message = "response_status",
                        status = response.status().as_u16(),
                        latency = latency.as_nanos()
                    )
                },
            )
            .on_failure(
                |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!(message = "error", error = error.to_string())
                },
            ),
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port))
        .await
        .map_err(|e| {
            error!(message = "Failed to create TCP listener", error=%e);
            AppError::Status(StatusCode::SERVICE_UNAVAILABLE)
        })?;

    info!(message = "Starting server", port = settings.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(message = "Failed to start server", error=%e);
            AppError::Status(StatusCode::SERVICE_UNAVAILABLE)
        })?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, shutting down")
        },
        _ = terminate => {
            info!("SIGTERM received, shutting down")
        },
    }
}
