//! HTTP server bootstrap for GrackerKYC.
//!
//! This module wires together:
//! - configuration
//! - the audit store (in-memory or SQLite)
//! - the verification service
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{ApiError, ErrorCode};
use crate::infra::{
    shutdown_signal, AuditStore, InMemoryAuditStore, ShutdownCoordinator, ShutdownSignal,
    SqliteAuditStore, VerificationService,
};
use crate::metrics::MetricsRegistry;
use crate::telemetry::{init_telemetry, TelemetryConfig};

/// Where audit records (and optionally the ledger) are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local; nothing survives a restart
    Memory,
    /// SQLite database at the given URL
    Sqlite(String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `memory` or a `sqlite:` URL.
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Apply embedded migrations at startup.
    pub migrate_on_startup: bool,
    /// Keep the ledger block log in the database and restore it at startup.
    pub persist_ledger: bool,
    /// `*` or a comma-separated origin list; unset disables CORS.
    pub cors_allow_origins: Option<String>,
    /// Time allowed for in-flight requests after a shutdown signal.
    pub shutdown_drain: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://gracker_kyc.db".to_string());

        let port: u16 = lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(8000);
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {host}:{port}: {e}"))?;

        let max_connections: u32 = lookup("MAX_DB_CONNECTIONS")
            .and_then(|p| p.parse().ok())
            .unwrap_or(5);

        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(default)
        };

        let shutdown_drain = Duration::from_secs(
            lookup("SHUTDOWN_DRAIN_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            migrate_on_startup: flag("DB_MIGRATE_ON_STARTUP", true),
            persist_ledger: flag("PERSIST_LEDGER", true),
            cors_allow_origins: lookup("CORS_ALLOW_ORIGINS"),
            shutdown_drain,
        })
    }

    pub fn store_backend(&self) -> anyhow::Result<StoreBackend> {
        let url = self.database_url.trim();
        if url.eq_ignore_ascii_case("memory") {
            Ok(StoreBackend::Memory)
        } else if url.starts_with("sqlite:") {
            Ok(StoreBackend::Sqlite(url.to_string()))
        } else {
            anyhow::bail!("Unsupported DATABASE_URL {url:?}; expected \"memory\" or sqlite:")
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: VerificationService,
}

/// Open the configured store and the verification service.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store: Arc<dyn AuditStore> = match config.store_backend()? {
        StoreBackend::Memory => {
            info!("using in-memory audit store; ledger is not persisted");
            Arc::new(InMemoryAuditStore::new())
        }
        StoreBackend::Sqlite(url) => {
            let store =
                SqliteAuditStore::connect(&url, config.max_connections, config.persist_ledger)
                    .await?;
            info!(persist_ledger = store.persists_ledger(), "using SQLite audit store");
            if config.migrate_on_startup {
                store.initialize().await?;
                info!("database migrations applied");
            }
            Arc::new(store)
        }
    };

    let metrics = Arc::new(MetricsRegistry::new());
    let service = VerificationService::open(store, metrics).await?;
    info!(ledger_length = service.ledger_len().await, "verification service ready");

    Ok(AppState { service })
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env())?;

    info!("Starting GrackerKYC v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let state = build_state(&config).await?;
    let app = build_router(config.cors_allow_origins.as_deref())?.with_state(state.clone());

    let coordinator = Arc::new(ShutdownCoordinator::new());
    {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            shutdown_signal().await;
            coordinator.shutdown();
        });
    }

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    serve_until_shutdown(listener, app, coordinator.signal(), config.shutdown_drain).await?;

    state.service.close(config.shutdown_drain).await;
    info!("GrackerKYC stopped");
    Ok(())
}

/// Serve until `shutdown` fires, then allow `drain` for open connections.
pub async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: ShutdownSignal,
    drain: Duration,
) -> anyhow::Result<()> {
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.wait())
                .await
        }
    });

    tokio::select! {
        result = &mut server => {
            result??;
            return Ok(());
        }
        _ = shutdown.wait() => {}
    }

    match tokio::time::timeout(drain, &mut server).await {
        Ok(result) => result??,
        Err(_) => {
            warn!(?drain, "connections still open after drain timeout; aborting");
            server.abort();
        }
    }
    Ok(())
}

/// Build the application router (state is supplied by the caller).
pub fn build_router(cors_allow_origins: Option<&str>) -> anyhow::Result<Router<AppState>> {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_export))
        .route("/metrics/json", get(metrics_json))
        .nest("/api", crate::api::router())
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer(cors_allow_origins)? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let origins = match origins.map(str::trim) {
        Some(o) if !o.is_empty() => o,
        _ => return Ok(None),
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}

/// Service banner.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "GrackerKYC verification server",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gracker-kyc",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check endpoint.
async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.service.is_ready().await {
        Ok(Json(serde_json::json!({
            "status": "ready",
            "ledger_length": state.service.ledger_len().await,
        })))
    } else {
        Err(ApiError::new(
            ErrorCode::ServiceUnavailable,
            "Audit store unreachable or ledger failed verification",
        ))
    }
}

/// Prometheus text exposition.
async fn metrics_export(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.service.metrics().to_prometheus().await,
    )
}

/// Metrics snapshot as JSON.
async fn metrics_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.service.metrics().to_json().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8000);
        assert!(config.migrate_on_startup);
        assert!(config.persist_ledger);
        assert!(config.cors_allow_origins.is_none());
        assert_eq!(config.shutdown_drain, Duration::from_secs(30));
        assert!(matches!(
            config.store_backend().unwrap(),
            StoreBackend::Sqlite(_)
        ));
    }

    #[test]
    fn test_config_overrides() {
        let config = config(&[
            ("DATABASE_URL", "memory"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9100"),
            ("PERSIST_LEDGER", "false"),
            ("SHUTDOWN_DRAIN_SECS", "2"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9100".parse().unwrap());
        assert!(!config.persist_ledger);
        assert_eq!(config.shutdown_drain, Duration::from_secs(2));
        assert_eq!(config.store_backend().unwrap(), StoreBackend::Memory);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(config(&[("HOST", "not a host")]).is_err());
        let config = config(&[("DATABASE_URL", "postgres://localhost/db")]).unwrap();
        assert!(config.store_backend().is_err());
    }

    #[test]
    fn test_cors_layer() {
        assert!(cors_layer(None).unwrap().is_none());
        assert!(cors_layer(Some("  ")).unwrap().is_none());
        assert!(cors_layer(Some("*")).unwrap().is_some());
        assert!(cors_layer(Some("https://a.example, https://b.example"))
            .unwrap()
            .is_some());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}
