//! Purpose: Provide the HTTP/JSON server for the summary query surface.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based loopback server hosting `SummaryService` behind one query endpoint.
//! Invariants: JSON envelopes match `api::protocol`; error kinds map to stable HTTP statuses.
//! Invariants: Loopback-only unless explicitly allowed.
//! Invariants: Store work runs on the blocking pool; handlers hold no state between requests.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use summary_desk::api::protocol::{DataEnvelope, ErrorBody, ErrorEnvelope};
use summary_desk::api::{Error, ErrorKind, Operation, SummaryService, open_store};

pub const DEFAULT_BIND: &str = "127.0.0.1:4000";
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

const BANNER: &str = "summary-desk server: POST /v0/query\n";

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub store_uri: String,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
    pub cors_origins: Vec<String>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;
    let cors = cors_layer(&config.cors_origins)?;
    let store = open_store(&config.store_uri)?;
    let service = SummaryService::new(store);

    let mut app = Router::new()
        .route("/", get(banner))
        .route("/healthz", get(healthz))
        .route("/v0/query", post(query))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service);
    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_hint(format!("Is another process listening on {}?", config.bind))
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, store = %config.store_uri, "serving summaries");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(server_failed)?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(server_failed)?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn server_failed(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("server failed")
        .with_source(err)
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    cors_layer(&config.cors_origins)?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if origins.is_empty() {
        return Ok(None);
    }
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid --cors-origin: {origin}"))
                    .with_hint("Use an origin like http://localhost:3000.")
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn banner() -> &'static str {
    BANNER
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn query(State(service): State<SummaryService>, body: Bytes) -> Response {
    let operation: Operation = match serde_json::from_slice(&body) {
        Ok(operation) => operation,
        Err(err) => {
            return error_response(
                Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid query body: {err}"))
                    .with_hint("Send {\"operation\": <name>, \"arguments\": {...}}."),
            );
        }
    };
    let name = operation.name();
    if operation.is_write() {
        tracing::info!(operation = name, "write query");
    } else {
        tracing::debug!(operation = name, "read query");
    }

    let result = tokio::task::spawn_blocking(move || service.execute(operation))
        .await
        .unwrap_or_else(|err| {
            Err(Error::new(ErrorKind::Internal)
                .with_message("query task failed")
                .with_source(err))
        });
    match result {
        Ok(data) => Json(DataEnvelope { data }).into_response(),
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::Internal | ErrorKind::Corrupt | ErrorKind::Io
            ) {
                tracing::warn!(operation = name, error = %err, "query failed");
            }
            error_response(err)
        }
    }
}

fn error_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: Error) -> Response {
    let body = ErrorEnvelope {
        error: ErrorBody::from_error(&err),
    };
    (error_status(err.kind()), Json(body)).into_response()
}
