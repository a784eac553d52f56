// CPA Backend - citizen complaint intake service

use axum::Router;
use std::fs::OpenOptions;
use std::io::LineWriter;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Custom time formatter: [HH:mm:ss] [cpa]
#[derive(Clone)]
struct BackendTimer;

impl FormatTime for BackendTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(w, "[{}] [cpa]", now.format("%H:%M:%S"))
    }
}

mod config;
mod error;
mod llm;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use config::{Config, StoreBackend};
use llm::{ComplaintAnalyzer, GeminiClient};
use routes::{complaints_routes, health_routes};
use services::{ComplaintService, ComplaintStore, FirestoreService, FirestoreSettings, InMemoryStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub complaints: Arc<ComplaintService>,
}

/// Router with CORS and request tracing
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health_routes())
        .merge(complaints_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Stdout logging plus a file copy when the log file can be opened.
/// The returned guard must live as long as the process.
fn init_tracing(log_file: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cpa_backend=info,tower_http=info".into());

    let stdout_layer = fmt::layer()
        .with_timer(BackendTimer)
        .with_target(false)
        .with_level(false)
        .with_ansi(true);

    // Wrap in LineWriter so each line is flushed immediately
    let file = OpenOptions::new().create(true).append(true).open(log_file);
    let (file_layer, guard, open_error) = match file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(LineWriter::new(file));
            let layer = fmt::layer()
                .with_timer(BackendTimer)
                .with_target(false)
                .with_level(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(e) = open_error {
        tracing::warn!("Failed to open log file {}: {} - logging to stdout only", log_file, e);
    }

    guard
}

async fn build_store(config: &Config) -> Arc<dyn ComplaintStore> {
    match config.store_backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
        StoreBackend::Firestore => {
            let settings = FirestoreSettings {
                project_id: config.firebase_project_id.clone(),
                database_id: config.firestore_database.clone(),
                collection: config.complaints_collection.clone(),
                emulator_host: config.firestore_emulator_host.clone(),
                credentials_path: config.google_application_credentials.clone(),
            };
            match FirestoreService::new(settings).await {
                Ok(fs) => Arc::new(fs),
                Err(e) => {
                    tracing::error!("Failed to initialize Firestore: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_file);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let generator = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.ai_timeout,
    ));
    let analyzer = Arc::new(ComplaintAnalyzer::new(generator));
    let store = build_store(&config).await;

    let state = AppState {
        complaints: Arc::new(ComplaintService::new(store, analyzer)),
    };

    let app = build_app(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting CPA Backend on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
