//! WebSocket gateway for Llamantin.
//!
//! A client opens `GET /ws/{task_id}`, sends one JSON frame
//! `{"agent_type": ..., "query": ...}`, and receives one [`TaskUpdate`]
//! before the server closes the socket.
//!
//! Built on Axum; connection bookkeeping lives in an explicit
//! [`ConnectionRegistry`] carried in the router state.

pub mod connections;
pub mod protocol;

use std::sync::Arc;

use axum::{
    Router,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use llamantin_agent::{AgentFactory, AgentKind};
use llamantin_config::AppConfig;
use llamantin_core::document::Embedder;
use llamantin_core::error::MemoryError;
use llamantin_core::event::EventBus;
use llamantin_core::provider::Provider;
use llamantin_memory::{Collector, HashingEmbedder, ProviderEmbedder};

pub use connections::{ConnectionGuard, ConnectionRegistry};
pub use protocol::{AgentRequest, TaskUpdate};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub factory: AgentFactory,
    /// Builds the document store; doc search waits until it is initialized.
    pub collector: Option<Arc<Collector>>,
    pub connections: ConnectionRegistry,
}

impl GatewayState {
    pub fn new(factory: AgentFactory) -> Self {
        Self {
            factory,
            collector: None,
            connections: ConnectionRegistry::new(),
        }
    }

    pub fn with_collector(mut self, collector: Arc<Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Whether document search can be served right now.
    pub fn documents_ready(&self) -> bool {
        self.collector.as_ref().is_none_or(|c| c.is_initialized())
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws/{task_id}", get(ws_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// The embedder configured for the document store.
///
/// Uses the provider's embedding endpoint when `llm.embedding_model` is set,
/// the offline hashing embedder otherwise.
pub fn embedder_for(config: &AppConfig, provider: Arc<dyn Provider>) -> Arc<dyn Embedder> {
    match &config.llm.embedding_model {
        Some(model) => Arc::new(ProviderEmbedder::new(provider, model.clone())),
        None => Arc::new(HashingEmbedder::default()),
    }
}

/// Open the collector over the configured data and processed-data directories.
pub async fn open_collector(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Collector, MemoryError> {
    Collector::open(
        config.storage.data_dir.clone(),
        config.storage.store_path(),
        embedder_for(config, provider),
    )
    .await
}

/// Start the gateway HTTP server.
///
/// The document store is initialized in the background; until it finishes,
/// doc search requests get a `waiting` update.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = llamantin_providers::create_provider(&config)?;
    let collector = Arc::new(open_collector(&config, Arc::clone(&provider)).await?);
    let event_bus = Arc::new(EventBus::default());

    let factory = AgentFactory::new(Arc::new(config), provider, event_bus).with_store(collector.store());

    let background = Arc::clone(&collector);
    tokio::spawn(async move {
        if let Err(e) = background.initialize().await {
            error!(error = %e, "Document store initialization failed");
        }
    });

    let state = Arc::new(GatewayState::new(factory).with_collector(collector));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run one request to completion and describe the outcome.
pub async fn process_request(state: &GatewayState, request: AgentRequest) -> TaskUpdate {
    info!(agent = request.agent_type.as_str(), "Processing agent query");

    if request.agent_type == AgentKind::DocSearch && !state.documents_ready() {
        return TaskUpdate::waiting();
    }

    let agent = match state.factory.create(request.agent_type) {
        Ok(agent) => agent,
        Err(e) => {
            warn!(agent = request.agent_type.as_str(), error = %e, "Could not create agent");
            return TaskUpdate::failed(e.to_string());
        }
    };

    match agent.search(&request.query).await {
        Ok(result) => TaskUpdate::completed(result),
        Err(e) => {
            warn!(agent = request.agent_type.as_str(), error = %e, "Agent query failed");
            TaskUpdate::failed(e.to_string())
        }
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    documents: &'static str,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        documents: if state.documents_ready() {
            "ready"
        } else {
            "initializing"
        },
    })
}

/// `GET /ws/{task_id}` — one request, one update.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(task_id): Path<Uuid>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, task_id, state))
}

async fn handle_ws_connection(mut socket: WebSocket, task_id: Uuid, state: SharedState) {
    let mut connection = state.connections.connect(task_id);
    info!(%task_id, "WebSocket connection established");

    let Some(request) = read_request(&mut socket).await else {
        debug!(%task_id, "Client closed before sending a request");
        return;
    };

    let mut job = match request {
        Ok(request) => {
            let state = Arc::clone(&state);
            Some(tokio::spawn(async move {
                let update = process_request(&state, request).await;
                state.connections.send_update(task_id, update);
            }))
        }
        Err(message) => {
            state.connections.send_update(task_id, TaskUpdate::error(message));
            None
        }
    };

    let update = tokio::select! {
        update = next_update(&mut connection, job.as_mut()) => Some(update),
        _ = wait_for_close(&mut socket) => None,
    };

    match update {
        Some(update) => {
            let json = serde_json::to_string(&update).unwrap_or_default();
            if socket.send(WsMessage::Text(json.into())).await.is_ok() {
                let _ = socket.send(WsMessage::Close(None)).await;
            }
        }
        None => {
            info!(%task_id, "Client left before the task finished");
            if let Some(job) = job {
                job.abort();
            }
        }
    }

    info!(%task_id, "WebSocket connection closed");
}

/// The update addressed to `connection`. A job that dies without sending one
/// is reported as a failure.
async fn next_update(
    connection: &mut ConnectionGuard,
    job: Option<&mut JoinHandle<()>>,
) -> TaskUpdate {
    let task_id = connection.task_id();
    let update = match job {
        None => connection.recv().await,
        Some(job) => tokio::select! {
            biased;
            update = connection.recv() => update,
            joined = job => match joined {
                Ok(()) => connection.try_recv(),
                Err(e) => {
                    error!(%task_id, error = %e, "Task did not finish");
                    Some(TaskUpdate::failed(format!("Task failed: {e}")))
                }
            },
        },
    };
    update.unwrap_or_else(|| {
        warn!(%task_id, "Task finished without an update");
        TaskUpdate::failed("Task finished without an update")
    })
}

/// The first data frame, parsed. `None` if the socket closed first.
async fn read_request(socket: &mut WebSocket) -> Option<Result<AgentRequest, String>> {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                return Some(
                    serde_json::from_str(text.as_str()).map_err(|e| format!("Invalid request: {e}")),
                );
            }
            Ok(WsMessage::Binary(_)) => return Some(Err("Expected a JSON text frame".into())),
            Ok(WsMessage::Close(_)) | Err(_) => return None,
            Ok(_) => continue, // ping, pong
        }
    }
    None
}

/// Resolve once the client goes away, discarding anything else it sends.
async fn wait_for_close(socket: &mut WebSocket) {
    while let Some(msg) = socket.recv().await {
        if matches!(msg, Ok(WsMessage::Close(_)) | Err(_)) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use llamantin_core::error::ProviderError;
    use llamantin_core::provider::{ModelReply, ProviderRequest, ProviderResponse};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Answers every consultation with the next scripted result.
    struct ScriptedProvider {
        replies: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    }

    impl ScriptedProvider {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(vec![Ok(ProviderResponse {
                    reply: ModelReply::text(text),
                    usage: None,
                    model: "mock-model".into(),
                })]),
            })
        }

        fn failing(error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(vec![Err(error)]),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn factory(provider: Arc<dyn Provider>) -> AgentFactory {
        AgentFactory::new(
            Arc::new(AppConfig::default()),
            provider,
            Arc::new(EventBus::default()),
        )
    }

    async fn collector_over(dir: &std::path::Path, db: &std::path::Path) -> Arc<Collector> {
        Arc::new(
            Collector::open(dir, db, Arc::new(HashingEmbedder::default()))
                .await
                .unwrap(),
        )
    }

    fn request(agent_type: AgentKind, query: &str) -> AgentRequest {
        AgentRequest {
            agent_type,
            query: query.into(),
        }
    }

    #[tokio::test]
    async fn health_endpoint() {
        let state = Arc::new(GatewayState::new(factory(ScriptedProvider::answering("ok"))));
        let app = build_router(state);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["documents"], "ready");
    }

    #[tokio::test]
    async fn ws_route_exists() {
        let state = Arc::new(GatewayState::new(factory(ScriptedProvider::answering("ok"))));
        let app = build_router(state);

        let uri = format!("/ws/{}", Uuid::new_v4());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        // Without upgrade headers the upgrade is rejected, but the route matched
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duck_search_completes() {
        let state = GatewayState::new(factory(ScriptedProvider::answering("A short report.")));
        let update = process_request(&state, request(AgentKind::DuckSearch, "rust news")).await;
        assert_eq!(update, TaskUpdate::completed("A short report."));
    }

    #[tokio::test]
    async fn google_search_without_key_fails() {
        let state = GatewayState::new(factory(ScriptedProvider::answering("unused")));
        let update = process_request(&state, request(AgentKind::GoogleSearch, "rust")).await;
        match update {
            TaskUpdate::Failed { error } => assert!(error.contains("SERPER_API_KEY")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn model_failure_is_reported() {
        let provider = ScriptedProvider::failing(ProviderError::Network("connection refused".into()));
        let state = GatewayState::new(factory(provider));
        let update = process_request(&state, request(AgentKind::DuckSearch, "rust")).await;
        assert!(matches!(update, TaskUpdate::Failed { .. }));
    }

    #[tokio::test]
    async fn empty_query_is_reported() {
        let state = GatewayState::new(factory(ScriptedProvider::answering("unused")));
        let update = process_request(&state, request(AgentKind::DuckSearch, "   ")).await;
        assert!(matches!(update, TaskUpdate::Failed { .. }));
    }

    #[tokio::test]
    async fn doc_search_waits_for_store() {
        let data = tempfile::tempdir().unwrap();
        let processed = tempfile::tempdir().unwrap();
        let collector = collector_over(data.path(), &processed.path().join("vector_db.json")).await;

        let state = GatewayState::new(factory(ScriptedProvider::answering("unused")).with_store(collector.store()))
            .with_collector(collector);
        assert!(!state.documents_ready());

        let update = process_request(&state, request(AgentKind::DocSearch, "trustees")).await;
        assert_eq!(update, TaskUpdate::waiting());
    }

    #[tokio::test]
    async fn doc_search_answers_once_initialized() {
        let data = tempfile::tempdir().unwrap();
        let processed = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("board.txt"), "Trustees are evaluated every year.").unwrap();
        let collector = collector_over(data.path(), &processed.path().join("vector_db.json")).await;
        collector.initialize().await.unwrap();

        let state = GatewayState::new(factory(ScriptedProvider::answering("Every year.")).with_store(collector.store()))
            .with_collector(collector);
        assert!(state.documents_ready());

        let update = process_request(&state, request(AgentKind::DocSearch, "how are trustees evaluated")).await;
        assert_eq!(update, TaskUpdate::completed("Every year."));
    }

    #[tokio::test]
    async fn panicking_job_is_reported() {
        let registry = ConnectionRegistry::new();
        let mut connection = registry.connect(Uuid::new_v4());
        let mut job: JoinHandle<()> = tokio::spawn(async { panic!("collector blew up") });

        let update = next_update(&mut connection, Some(&mut job)).await;
        assert!(matches!(update, TaskUpdate::Failed { error } if error.starts_with("Task failed")));
    }

    #[tokio::test]
    async fn job_update_is_delivered() {
        let registry = ConnectionRegistry::new();
        let task_id = Uuid::new_v4();
        let mut connection = registry.connect(task_id);
        let sender = registry.clone();
        let mut job = tokio::spawn(async move {
            sender.send_update(task_id, TaskUpdate::completed("done"));
        });

        let update = next_update(&mut connection, Some(&mut job)).await;
        assert_eq!(update, TaskUpdate::completed("done"));
    }

    #[tokio::test]
    async fn job_without_update_is_reported() {
        let registry = ConnectionRegistry::new();
        let mut connection = registry.connect(Uuid::new_v4());
        let mut job = tokio::spawn(async {});

        let update = next_update(&mut connection, Some(&mut job)).await;
        assert!(matches!(update, TaskUpdate::Failed { .. }));
    }

    #[test]
    fn embedder_follows_config() {
        let provider: Arc<dyn Provider> = ScriptedProvider::answering("unused");
        assert_eq!(embedder_for(&AppConfig::default(), Arc::clone(&provider)).dimensions(), Some(384));

        let mut config = AppConfig::default();
        config.llm.embedding_model = Some("nomic-embed-text".into());
        assert_eq!(embedder_for(&config, provider).dimensions(), None);
    }
}
