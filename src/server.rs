//! # Server Configuration
//!
//! Router, shared state and process lifecycle of the account sync service.
//! The scheduler and dispatch worker run as background tasks next to the
//! HTTP listener and stop on the same shutdown signal.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::Services;
use crate::config::AppConfig;
use crate::handlers;
use crate::jobs::JobService;
use crate::telemetry::{self, TRACE_ID_HEADER, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub jobs: Arc<JobService>,
}

impl From<&Services> for AppState {
    fn from(services: &Services) -> Self {
        Self {
            config: services.config.clone(),
            db: services.db.clone(),
            jobs: services.jobs.clone(),
        }
    }
}

/// Runs every request inside a trace context taken from `x-request-id`.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let context = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(TraceContext::from_id)
        .unwrap_or_else(TraceContext::generate);

    telemetry::with_trace_context(context, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::health::healthz))
        .route("/schedule/tick", post(handlers::trigger::schedule_tick))
        .route(
            "/trusted-accounts/{trusted_account_id}/sync",
            post(handlers::trigger::sync_trusted_account),
        )
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/stats", get(handlers::jobs::job_stats))
        .route(
            "/jobs/{job_id}",
            get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
        )
        .route("/jobs/{job_id}/cancel", post(handlers::jobs::cancel_job))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> Result<()> {
    let addr = config.bind_addr().context("invalid server address")?;
    let services = Services::from_config(config, db)?;
    let shutdown = CancellationToken::new();

    let mut background = Vec::new();
    if services.config.scheduler.enabled {
        background.push(tokio::spawn(services.scheduler().run(shutdown.clone())));
    }
    if services.config.executor.enabled {
        background.push(tokio::spawn(services.dispatch_worker().run(shutdown.clone())));
    }

    let app = create_app(AppState::from(&services));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, profile = %services.config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    for task in background {
        if let Err(err) = task.await {
            warn!(error = %err, "background task ended abnormally");
        }
    }
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health::healthz,
        crate::handlers::trigger::schedule_tick,
        crate::handlers::trigger::sync_trusted_account,
        crate::handlers::jobs::list_jobs,
        crate::handlers::jobs::job_stats,
        crate::handlers::jobs::get_job,
        crate::handlers::jobs::cancel_job,
        crate::handlers::jobs::delete_job,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::health::HealthResponse,
            crate::handlers::trigger::ScheduleTickRequest,
            crate::handlers::trigger::SyncTrustedAccountRequest,
            crate::handlers::jobs::JobInfo,
            crate::handlers::jobs::JobsResponse,
            crate::jobs::JobStats,
            crate::jobs::JobStatus,
            crate::jobs::SweepReport,
        )
    ),
    tags(
        (name = "root", description = "Service information"),
        (name = "health", description = "Health checks"),
        (name = "schedule", description = "Schedule sweep trigger"),
        (name = "jobs", description = "Account sync jobs"),
    ),
    info(
        title = "Account Sync API",
        description = "Schedules and inspects trusted-account sync jobs",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
