//! formkit server entry point.

use std::{
    any::Any,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    response::{IntoResponse, Response},
};
use formkit_api::{AppState, router as api_router};
use formkit_common::{AppError, Config, LogFormat, expose_internal_details};
use tokio::{signal, sync::Notify};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Grace period for draining connections after a fatal error.
const FATAL_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Set when a request handler panicked; the process then exits non-zero.
#[derive(Clone, Default)]
struct FatalSignal {
    tripped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl FatalSignal {
    fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    std::panic::set_hook(Box::new(|panic_info| {
        error!(panic = %panic_info, "Panic");
    }));
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    if config.server.cors_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any));
    }

    let origins = config
        .server
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid CORS origin")?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

fn panic_response(fatal: &FatalSignal, err: &(dyn Any + Send)) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!(panic = %detail, "Request handler panicked, shutting down");
    fatal.trip();
    AppError::Internal(detail.to_string()).into_response()
}

/// Waits for SIGINT, SIGTERM or a fatal error.
async fn shutdown_signal(fatal: FatalSignal) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
        () = fatal.notify.notified() => {
            warn!("Fatal error, initiating graceful shutdown...");
            tokio::spawn(async {
                tokio::time::sleep(FATAL_DRAIN_TIMEOUT).await;
                error!("Connections did not drain in time, exiting");
                std::process::exit(1);
            });
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config);
    expose_internal_details(!config.environment.is_production());

    info!(environment = ?config.environment, "Starting formkit server...");

    let db = Arc::new(formkit_db::init(&config).await?);
    info!("Running database migrations...");
    formkit_db::migrate(&db).await?;
    info!("Migrations completed");

    let state = AppState::new(Arc::clone(&db), &config);
    let fatal = FatalSignal::default();

    let on_panic = fatal.clone();
    let app = Router::new()
        .nest("/api", api_router())
        .layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
            panic_response(&on_panic, err.as_ref())
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(fatal.clone()))
        .await?;

    formkit_db::close(db).await?;

    if fatal.is_tripped() {
        anyhow::bail!("shut down after a request handler panicked");
    }

    info!("Server shutdown complete");
    Ok(())
}
