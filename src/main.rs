use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relayer_guard::config::{LogFormat, RECOMMENDED_MIN_API_KEY_LEN};
use relayer_guard::{AppResult, AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Config is loaded first so LOG_FORMAT from .env is honoured
    let config = Config::from_env();
    let log_format = config
        .as_ref()
        .map_or_else(|_| LogFormat::from_env(), |c| c.log_format);
    init_logging(log_format);

    info!("Starting Relayer Guard v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Initialize the global tracing subscriber.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: AppResult<Config>) -> Result<(), exitcode::ExitCode> {
    let config = config.map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        allowed_ips = ?config.allowed_ips,
        audit_auth_attempts = config.audit_auth_attempts,
        audit_buffer_size = config.audit_buffer_size,
        log_level = %config.log_level,
        "Configuration loaded"
    );

    if config.api_key_is_weak() {
        warn!(
            min_len = RECOMMENDED_MIN_API_KEY_LEN,
            "API_KEY is shorter than recommended"
        );
    }
    if config.allowed_ips.is_empty() {
        warn!("ALLOWED_IPS is empty: every authenticated request will be rejected with 403");
    }

    // Metrics exporter (optional)
    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    } else {
        info!("Prometheus metrics disabled (METRICS_PORT=0)");
    }

    // Build application state and router
    let state = AppState::new(config.clone());
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health        - Health check (public)");
    info!("  GET  /whoami        - Caller identity");
    info!("  GET  /audit/events  - Recent security audit events");

    // Peer addresses are needed for IP allow-listing without X-Forwarded-For
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}
