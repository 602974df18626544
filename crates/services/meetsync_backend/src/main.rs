// File: services/meetsync_backend/src/main.rs
use axum::{extract::State, routing::get, Json, Router};
use meetsync_common::{Context, MeetSyncError};
use meetsync_config::load_config;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

mod app_state;

use app_state::AppState;

/// Liveness plus a database round trip. A configured database that does not
/// answer turns the check into a 503.
async fn health(State(state): State<AppState>) -> Result<Json<Value>, MeetSyncError> {
    #[cfg(feature = "database")]
    let database = match &state.db {
        Some(db) if !db.is_healthy().await => {
            return Err(MeetSyncError::DatabaseError(
                "database did not answer the health query".to_string(),
            ));
        }
        Some(_) => Some(true),
        None => None,
    };
    #[cfg(not(feature = "database"))]
    let database: Option<bool> = None;

    Ok(Json(json!({
        "status": "ok",
        "database": database,
        "use_gcal": state.config.use_gcal,
    })))
}

#[tokio::main]
async fn main() -> Result<(), MeetSyncError> {
    meetsync_common::logging::init();
    let config = Arc::new(
        load_config()
            .map_err(|e| MeetSyncError::ConfigError(format!("failed to load config: {e}")))?,
    );
    let state = AppState::build(config.clone()).await?;

    let every = Duration::from_secs(config.sync.reconcile_interval_secs.max(1));
    let _reconciliation = state
        .meetings
        .synchronizer
        .clone()
        .spawn_reconciliation_loop(every);
    info!(every_secs = every.as_secs(), "Reconciliation loop started");

    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the meetsync API!" }))
        .route("/health", get(health))
        .with_state(state.clone())
        .merge(meetsync_scheduler::routes::routes(state.meetings.clone()));

    #[allow(unused_mut)] // mutated when the openapi feature is on
    let mut app = Router::new().nest("/api", api_router);

    #[cfg(feature = "openapi")]
    {
        use meetsync_scheduler::doc::MeetingApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "meetsync API",
                version = "0.1.0",
                description = "Meeting availability and booking API",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            servers((url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(MeetingApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");
        app = app.merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc));
    }

    let app = app.layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
