//! # Voice Weather Backend - Main Application Entry Point
//!
//! This is the main entry point for the voice-weather-backend server. It turns
//! spoken or typed German weather questions into a structured analysis and
//! serves the result over a WebSocket, next to a small HTTP surface for
//! monitoring.
//!
//! ## Request Flow:
//! 1. A client opens `/ws` and is registered as a session
//! 2. Binary frames carry one WAV utterance, which the recognizer transcribes
//! 3. Text frames (or the transcript) go through the weather intent extractor
//! 4. The formatted analysis is sent back on the same connection
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, `config.toml`, environment)
//! - **state**: Shared state, metrics and the session registry
//! - **audio**: WAV parsing and utterance staging
//! - **transcription**: Recognizer contract and the acoustic model adapter
//! - **intent**: Lexical weather intent extraction and result formatting
//! - **session**: Per-connection frame processing and the wire protocol
//! - **websocket**: The `/ws` actor, fragment reassembly and heartbeat
//! - **health**, **handlers**, **middleware**: HTTP surface and request metrics
//! - **error**: HTTP and per-frame error types
//!
//! ## Speech Recognition:
//! The acoustic model is loaded once at startup. When it is missing (or the
//! binary was built without the `vosk` feature) the server still starts; audio
//! frames are then answered with an error while text frames keep working.

// Module declarations
mod audio;         // WAV parsing and utterance staging (audio/ directory)
mod config;        // Configuration management (config.rs)
mod error;         // HTTP and per-frame error types (error.rs)
mod handlers;      // HTTP request handlers (handlers/ directory)
mod health;        // Health check and metrics endpoints (health.rs)
mod intent;        // Weather intent extraction and formatting (intent/ directory)
mod middleware;    // Request metrics middleware (middleware/ directory)
mod session;       // Session registry, wire protocol, frame dispatch (session/ directory)
mod state;         // Application state management (state.rs)
mod transcription; // Recognizer contract and model adapters (transcription/ directory)
mod websocket;     // WebSocket actor for /ws (websocket.rs)

use actix_cors::Cors;                          // Cross-Origin Resource Sharing support
use actix_web::{web, App, HttpServer};         // Web framework
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering}; // Thread-safe shutdown flag
use tracing::{error, info, warn};              // Structured logging
use tracing_actix_web::TracingLogger;          // Per-request spans
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set once SIGINT or SIGTERM has been received.
///
/// The server polls this flag and then stops accepting connections, waits for
/// in-flight requests and closes every remaining session.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The application entry point.
///
/// ## Startup Sequence:
/// 1. Load `.env`, set up tracing
/// 2. Load and validate configuration
/// 3. Load the acoustic model (speech recognition is disabled if that fails)
/// 4. Serve until a shutdown signal arrives, then close all sessions
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    // Rejects e.g. a decode timeout that outlasts the client timeout
    config.validate()?;

    info!("Starting voice-weather-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    // Never fails: without a model the unavailable recognizer is returned
    let recognizer = transcription::load_recognizer(&config.speech);
    let app_state = AppState::new(config.clone(), recognizer);
    let registry = app_state.registry.clone();
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .disable_signals()
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    let closed = registry.shutdown();
    info!("Server stopped gracefully ({} sessions closed)", closed);
    Ok(())
}

/// All routes of the service.
///
/// - `GET /`: liveness and component availability
/// - `GET /ws`: WebSocket session
/// - `GET /health`, `GET /api/v1/health`: detailed health
/// - `GET /api/v1/metrics`, `GET /api/v1/config`
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health::root_status))
        .route("/ws", web::get().to(websocket::weather_websocket))
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics))
                .route("/config", web::get().to(handlers::get_config)),
        );
}

/// Initialize tracing.
///
/// `RUST_LOG` controls the filter; defaults to
/// `voice_weather_backend=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_weather_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Listen for SIGTERM/SIGINT and raise the global shutdown flag.
fn setup_signal_handlers() {
    actix_web::rt::spawn(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                        _ = sigint.recv() => info!("Received SIGINT"),
                    }
                }
                _ => {
                    warn!("Failed to install signal handlers, falling back to Ctrl+C");
                    if tokio::signal::ctrl_c().await.is_err() {
                        return;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Failed to listen for Ctrl+C");
                return;
            }
            info!("Received Ctrl+C");
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Resolves once the shutdown flag has been set.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn test_routes_are_wired() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .wrap(middleware::MetricsMiddleware)
                .configure(configure_routes),
        )
        .await;

        for uri in ["/", "/health", "/api/v1/health", "/api/v1/metrics", "/api/v1/config"] {
            let response =
                test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
        }

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/nope").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
