//! Salon Admin - multi-tenant salon booking administration API
//!
//! Staff manage employees, services, clients and time-slot bookings;
//! superadmins manage organizations and cross-tenant users; every mutating
//! action lands in an append-only history log.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use salon_admin::{api, config::LogFormat, db, middleware, services::AuditLogger, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Salon Admin {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must stay alive for the duration of the program so file logs
    // are flushed
    let _log_guard = init_logging(&config);

    info!("Salon Admin starting up");

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    info!("Starting history writer");
    let audit = AuditLogger::spawn(db.clone());

    let state = AppState {
        config: config.clone(),
        db,
        audit,
    };

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server error")?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, config: &AppConfig) -> Router {
    // Configure tracing for HTTP requests
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Initialize rate limiting: strict on auth, standard elsewhere
    let api_rate_limit =
        middleware::RateLimitState::new(middleware::api_rate_limit_config());
    let auth_rate_limit =
        middleware::RateLimitState::new(middleware::auth_rate_limit_config());
    middleware::spawn_rate_limit_cleanup(api_rate_limit.clone());

    // Public routes stay unauthenticated (login must be reachable); the auth
    // middleware wraps only the protected set.
    let mut router = Router::new()
        .nest(
            "/api/v1",
            api::public_routes().layer(axum::middleware::from_fn_with_state(
                auth_rate_limit,
                middleware::rate_limit_middleware,
            )),
        )
        .nest(
            "/api/v1",
            api::protected_routes()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::auth::auth_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    api_rate_limit,
                    middleware::rate_limit_middleware,
                )),
        )
        .with_state(state);

    // Credentialed CORS for the SPA origin; cookies rule out wildcards
    if let Some(origin) = config
        .server
        .frontend_url
        .as_deref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
    {
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true);
        router = router.layer(cors);
    }

    router.layer(CompressionLayer::new()).layer(trace_layer)
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use salon_admin::config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &salon_admin::config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Initialize console-only logging
fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
    }
}

/// Initialize file-only logging
fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Initialize both console and file logging
fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Ensure the data directory exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

/// Print help message
fn print_help() {
    println!(
        r#"Salon Admin {}

USAGE:
    salon-admin [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    SALON_CONFIG        Path to configuration file (default: config.yaml)
    DATABASE_URL        SQLite database URL override
    JWT_SECRET          Session signing secret override
    PORT                Listen port override
    FRONTEND_URL        Allowed CORS origin for the SPA

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by SALON_CONFIG environment variable
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/salon-admin/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
