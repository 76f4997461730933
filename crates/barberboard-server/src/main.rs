#![forbid(unsafe_code)]

use barberboard_server::{build_router, validate_startup_config_contract, AppState, ServiceConfig};
use barberboard_sheets::{
    service_account_email_from_env, GoogleSheetsBackend, RetryPolicy, SheetsBackend, TokenProvider,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("BARBER_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let cors = env_list("BARBER_CORS_ALLOWED_ORIGINS");
    let mut config = ServiceConfig {
        bind_addr: env::var("BARBER_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        master_sheet_id: env::var("GOOGLE_SHEET_ID").unwrap_or_default(),
        drive_folder_id: env::var("GOOGLE_DRIVE_FOLDER_ID")
            .ok()
            .filter(|v| !v.trim().is_empty()),
        grant_email: None,
        cache_ttl: env_duration_ms("BARBER_CACHE_TTL_MS", 300_000),
        http_timeout: env_duration_ms("BARBER_HTTP_TIMEOUT_MS", 30_000),
        retry: RetryPolicy {
            max_attempts: env_usize("BARBER_RETRY_ATTEMPTS", 4),
            base_backoff_ms: env_u64("BARBER_RETRY_BASE_MS", 120),
        },
        cors_allowed_origins: if cors.is_empty() {
            vec!["*".to_string()]
        } else {
            cors
        },
        max_body_bytes: env_usize("BARBER_MAX_BODY_BYTES", 256 * 1024),
        request_log: env_bool("BARBER_REQUEST_LOG", true),
        shutdown_drain: env_duration_ms("BARBER_SHUTDOWN_DRAIN_MS", 3000),
    };

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|e| format!("http client: {e}"))?;
    let tokens =
        Arc::new(TokenProvider::from_env(http.clone()).map_err(|e| format!("credentials: {e}"))?);
    if tokens.source_tag() == "delegated" {
        // Spreadsheets created by the delegated user stay writable for the
        // service account after a later credential switch.
        config.grant_email = service_account_email_from_env();
    }
    validate_startup_config_contract(&config)?;

    let backend: Arc<dyn SheetsBackend> = Arc::new(GoogleSheetsBackend::new(
        tokens.clone(),
        http,
        config.retry.clone(),
    ));
    info!(
        credentials = tokens.source_tag(),
        backend = backend.backend_tag(),
        directory = %config.master_sheet_id,
        "starting barberboard-server"
    );

    let bind_addr = config.bind_addr.clone();
    let drain = config.shutdown_drain;
    let state = AppState::new(config, backend);
    let app = build_router(state);

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket
        .set_keepalive(true)
        .map_err(|e| format!("set_keepalive failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("barberboard-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received, draining");
            tokio::time::sleep(drain).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
