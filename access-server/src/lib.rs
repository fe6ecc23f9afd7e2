//! access-server: phone OTP sign-in and route access checks
//!
//! Wires the OTP challenge service and the authorization gate behind one
//! axum router backed by SQLite.
//!
//! # Endpoints
//!
//! - `POST /api/otp/send`: issue a code for `{phone, type}`
//! - `POST /api/otp/verify`: verify `{phone, code}`
//! - `GET /api/access/check?requiredRole=&requireOnboarding=`: route decision
//! - `GET /api/access/landing`: redirect to the user's landing page
//! - `GET /api/health`: liveness and database check
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:8080"
//!
//! [database]
//! url = "sqlite://access.db?mode=rwc"
//!
//! [otp]
//! code_ttl_secs = 300
//! max_attempts = 5
//!
//! [gate]
//! jwt_secret = "shared-with-identity-provider"
//! ```

pub mod config;
pub mod error;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use gate_rs::api::GateApiState;
use gate_rs::{SessionResolver, SqliteProfileSource};
use otp_rs::api::OtpApiState;
use otp_rs::{DeliverySink, LogSink, OtpService, SqliteChallengeStore};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use config::Config;
pub use error::{Result, ServerError};

/// The assembled server
pub struct AccessServer {
    config: Config,
    db: SqlitePool,
    otp: Arc<OtpService>,
    gate: Arc<GateApiState>,
}

impl AccessServer {
    /// Connect to the configured database and build the services
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = SqlitePoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        Self::with_pool(config, db, Arc::new(LogSink)).await
    }

    /// Build the services on an existing pool, creating tables as needed
    pub async fn with_pool(
        config: Config,
        db: SqlitePool,
        sink: Arc<dyn DeliverySink>,
    ) -> Result<Self> {
        let challenges = SqliteChallengeStore::new(db.clone());
        challenges.init_db().await?;

        let profiles = SqliteProfileSource::new(db.clone());
        profiles.init_db().await?;

        let otp = Arc::new(OtpService::new(
            config.otp.clone(),
            Arc::new(challenges),
            sink,
        ));

        let gate = Arc::new(GateApiState {
            sessions: SessionResolver::new(config.gate.jwt()),
            profiles: Arc::new(profiles),
        });

        Ok(Self {
            config,
            db,
            otp,
            gate,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn otp(&self) -> &Arc<OtpService> {
        &self.otp
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let api = otp_rs::api::router(Arc::new(OtpApiState {
            service: self.otp.clone(),
        }))
        .merge(gate_rs::api::router(self.gate.clone()))
        .merge(
            Router::new()
                .route("/health", get(health))
                .with_state(self.db.clone()),
        );

        Router::new()
            .nest("/api", api)
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&self.config.server.cors_origins))
    }

    /// Serve until Ctrl-C, running the expiry sweep alongside
    pub async fn run(self) -> Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(&self.config.server.listen_addr).await?;
        let sweep = self.otp.clone().start_sweep_task();

        info!("Starting access server on {}", self.config.server.listen_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        sweep.abort();
        self.db.close().await;
        info!("Access server stopped");

        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// GET /api/health - Health check
pub async fn health(State(db): State<SqlitePool>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1").execute(&db).await.is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if db_healthy { "ok" } else { "unhealthy" },
            "service": "access-server",
            "version": env!("CARGO_PKG_VERSION"),
            "checks": {
                "database": if db_healthy { "ok" } else { "failed" }
            }
        })),
    )
}
