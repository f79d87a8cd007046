use crate::auth::require_token;
use crate::types::ExecuteResponse;
use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use shellexec_core::ScriptConfiguration;
use shellexec_os::ExecutionEngine;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const EXECUTE_PATH: &str = "/plugins/shellexecutor/Execute";
pub const CONFIGURATION_PATH: &str = "/plugins/shellexecutor/Configuration";

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub(crate) engine: Arc<ExecutionEngine>,
    pub(crate) api_token: Option<Arc<str>>,
}

/// The gateway HTTP server.
///
/// Exposes the engine to operators via:
/// - `POST /plugins/shellexecutor/Execute` — run the script now
/// - `GET|POST /plugins/shellexecutor/Configuration` — read / replace the script
/// - `GET /health` — health check
///
/// Everything except `/health` requires `Authorization: Bearer <api_token>`.
pub struct GatewayServer {
    engine: Arc<ExecutionEngine>,
    api_token: Option<String>,
    /// Bind address.
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(
        engine: Arc<ExecutionEngine>,
        api_token: Option<String>,
        host: &str,
        port: u16,
    ) -> Self {
        Self {
            engine,
            api_token,
            host: host.to_string(),
            port,
        }
    }

    /// Build the router without binding a socket.
    pub fn router(&self) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
            api_token: self.api_token.as_deref().map(Arc::from),
        };

        let elevated = Router::new()
            .route(EXECUTE_PATH, post(execute_script))
            .route(
                CONFIGURATION_PATH,
                get(get_configuration).post(update_configuration),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

        Router::new()
            .route("/health", get(health))
            .merge(elevated)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.api_token.is_none() {
            tracing::warn!("No API token configured; elevated routes will reject every request");
        }
        let app = self.router();
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Gateway listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    /// Start the server. This spawns a background task and returns the join handle.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let addr = format!("{}:{}", self.host, self.port);
            if let Err(e) = self.serve(std::future::pending()).await {
                tracing::error!("Gateway server error on {}: {}", addr, e);
            }
        })
    }
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

/// POST /plugins/shellexecutor/Execute — run the script and report.
///
/// The run happens on its own task so a client hanging up does not abort a
/// script midway.
async fn execute_script(State(state): State<AppState>) -> Json<ExecuteResponse> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "Executing script via API");

    let engine = state.engine.clone();
    match tokio::spawn(async move { engine.execute().await }).await {
        Ok(outcome) => {
            let response = ExecuteResponse::from(outcome);
            if !response.success {
                tracing::error!(%request_id, "Failed to execute script via API: {}", response.message);
            }
            Json(response)
        }
        Err(e) => {
            tracing::error!(%request_id, "Execution task failed: {}", e);
            Json(ExecuteResponse::failure(format!("Execution task failed: {}", e)))
        }
    }
}

/// GET /plugins/shellexecutor/Configuration
async fn get_configuration(State(state): State<AppState>) -> Json<ScriptConfiguration> {
    Json(state.engine.config().await)
}

/// POST /plugins/shellexecutor/Configuration — replace the script text.
async fn update_configuration(
    State(state): State<AppState>,
    Json(update): Json<ScriptConfiguration>,
) -> Json<ExecuteResponse> {
    let engine = state.engine.clone();
    let saved = tokio::spawn(async move { engine.save(&update.script_content).await }).await;
    match saved {
        Ok(Ok(())) => Json(ExecuteResponse::success("Configuration saved")),
        Ok(Err(e)) => {
            tracing::error!("Failed to save configuration via API: {}", e);
            Json(ExecuteResponse::failure(e.to_string()))
        }
        Err(e) => {
            tracing::error!("Save task failed: {}", e);
            Json(ExecuteResponse::failure(format!("Save task failed: {}", e)))
        }
    }
}
