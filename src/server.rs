//! HTTP server for per-frame evaluation.
//!
//! This module provides an HTTP server that:
//! - Accepts pose frames via POST /sessions/:session_id/frames
//! - Evaluates them against the caller's session with the shared [`RepEngine`]
//! - Returns the rep count and the single message to show for that frame
//!
//! # Architecture
//!
//! ```text
//! Pose estimator ──→ POST /sessions/:id/frames ──→ RepEngine ──→ {count, message}
//!                                                      ↓
//!                                             [per-session state]
//! ```
//!
//! Each session id gets its own rep, smoothing and depth state, so any
//! number of clients can be coached concurrently without interfering.

use crate::config::{CoachingConfig, Config, ConfigError};
use crate::core::{
    Evaluation, ExerciseRegistry, FeedbackKind, FrameError, RepEngine, Session, Stage,
};
use crate::pose::types::{FrameSize, Keypoint};
use crate::stats::{create_shared_log, create_shared_log_with_persistence, SharedSessionLog};
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Profiles frames can be evaluated against
    pub registry: ExerciseRegistry,
    /// Engine tuning
    pub coaching: CoachingConfig,
    /// Frame size used when a request omits width/height
    pub frame: FrameSize,
    /// Where to persist session statistics on shutdown
    pub stats_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Create a server configuration with built-in profiles and default tuning.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            registry: ExerciseRegistry::builtin(),
            coaching: CoachingConfig::default(),
            frame: FrameSize::default(),
            stats_path: None,
        }
    }

    /// Create a server configuration from the application config.
    pub fn from_config(config: &Config, port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            port,
            registry: config.registry()?,
            coaching: config.coaching.clone(),
            frame: config.frame,
            stats_path: Some(config.data_path.join("stats.json")),
        })
    }
}

/// One client's session plus the clock used when frames carry no timestamp.
struct TrackedSession {
    session: Session,
    created: Instant,
}

impl TrackedSession {
    fn new() -> Self {
        Self {
            session: Session::new(),
            created: Instant::now(),
        }
    }
}

/// Shared server state
pub struct ServerState {
    engine: RepEngine,
    frame: FrameSize,
    sessions: RwLock<HashMap<String, TrackedSession>>,
    log: SharedSessionLog,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: &ServerConfig) -> Self {
        let log = match config.stats_path {
            Some(ref path) => create_shared_log_with_persistence(path.clone()),
            None => create_shared_log(),
        };

        Self {
            engine: RepEngine::new(config.registry.clone(), config.coaching.clone()),
            frame: config.frame,
            sessions: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Number of sessions with state on the server.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// One pose frame to evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRequest {
    /// Exercise id or name
    pub exercise_id: String,
    /// Normalized keypoints in landmark order
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Monotonic frame time in milliseconds; server receive time when absent
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

/// Result of evaluating one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResponse {
    pub count: u32,
    pub message: Option<String>,
    pub kind: Option<FeedbackKind>,
    pub stage: Stage,
}

/// Response from the reset endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub removed: bool,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /sessions/:session_id/frames
///
/// Evaluates one frame against the named session. A session is created only
/// by the first frame it can actually evaluate, so unknown exercises and
/// rejected frames never leave state behind.
async fn evaluate_frame(
    State(state): State<Arc<ServerState>>,
    Path(session_id): Path<String>,
    Json(request): Json<FrameRequest>,
) -> Result<Json<FrameResponse>, (StatusCode, Json<ErrorResponse>)> {
    let frame = FrameSize::new(
        request.width.unwrap_or(state.frame.width),
        request.height.unwrap_or(state.frame.height),
    );
    if frame.width == 0 || frame.height == 0 {
        state.log.record_skipped_frame();
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: format!("Invalid frame size {}x{}", frame.width, frame.height),
                code: "INVALID_FRAME".to_string(),
            }),
        ));
    }

    let known_exercise = state.engine.registry().resolve(&request.exercise_id).is_ok();

    let evaluation = {
        let mut sessions = state.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(tracked) => evaluate_tracked(&state.engine, tracked, &request, frame),
            None => {
                let mut tracked = TrackedSession::new();
                let evaluation = evaluate_tracked(&state.engine, &mut tracked, &request, frame);
                if known_exercise && evaluation.is_ok() {
                    tracing::info!("New coaching session {}", session_id);
                    sessions.insert(session_id.clone(), tracked);
                }
                evaluation
            }
        }
    };

    let evaluation = evaluation.map_err(|e| {
        tracing::warn!("Session {}: skipped frame: {}", session_id, e);
        state.log.record_skipped_frame();
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "MISSING_LANDMARK".to_string(),
            }),
        )
    })?;

    state.log.record_evaluation(&evaluation, known_exercise);

    Ok(Json(FrameResponse {
        count: evaluation.count,
        kind: evaluation.kind(),
        stage: evaluation.stage,
        message: evaluation.feedback.map(|f| f.message),
    }))
}

fn evaluate_tracked(
    engine: &RepEngine,
    tracked: &mut TrackedSession,
    request: &FrameRequest,
    frame: FrameSize,
) -> Result<Evaluation, FrameError> {
    let now = request
        .timestamp_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| tracked.created.elapsed());

    engine.evaluate(
        &mut tracked.session,
        &request.exercise_id,
        &request.keypoints,
        frame,
        now,
    )
}

/// DELETE /sessions/:session_id
///
/// Drops all state for the session, as on an exercise change or restart.
async fn reset_session(
    State(state): State<Arc<ServerState>>,
    Path(session_id): Path<String>,
) -> Json<ResetResponse> {
    let removed = state.sessions.write().await.remove(&session_id).is_some();
    if removed {
        tracing::info!("Reset coaching session {}", session_id);
    }

    Json(ResetResponse {
        session_id,
        removed,
    })
}

/// Build the router over shared state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions/:session_id/frames", post(evaluate_frame))
        .route("/sessions/:session_id", delete(reset_session))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                    // Browser front-end dev server
                    HeaderValue::from_static("http://localhost:3000"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
///
/// Returns the bound address, the shutdown trigger and the server task.
/// Await the task after triggering shutdown; stats are saved before it ends.
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(
    SocketAddr,
    tokio::sync::oneshot::Sender<()>,
    JoinHandle<()>,
)> {
    let state = Arc::new(ServerState::new(&config));
    serve(state, config.port).await
}

/// Run the HTTP server over existing state.
pub async fn serve(
    state: Arc<ServerState>,
    port: u16,
) -> anyhow::Result<(
    SocketAddr,
    tokio::sync::oneshot::Sender<()>,
    JoinHandle<()>,
)> {
    let app = router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Coach server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }

        if let Err(e) = state.log.save() {
            tracing::warn!("Failed to save session stats: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx, task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::types::LANDMARK_COUNT;

    fn request(exercise_id: &str, keypoints: usize) -> Json<FrameRequest> {
        Json(FrameRequest {
            exercise_id: exercise_id.to_string(),
            keypoints: vec![Keypoint::new(0.5, 0.5); keypoints],
            width: Some(100),
            height: Some(100),
            timestamp_ms: Some(0),
        })
    }

    #[tokio::test]
    async fn test_neutral_and_rejected_frames_create_no_sessions() {
        let state = Arc::new(ServerState::new(&ServerConfig::new(0)));

        for i in 0..100 {
            let unknown = evaluate_frame(
                State(state.clone()),
                Path(format!("unknown-{i}")),
                request("99", LANDMARK_COUNT),
            )
            .await;
            assert!(unknown.is_ok());

            let rejected = evaluate_frame(
                State(state.clone()),
                Path(format!("short-{i}")),
                request("13", 10),
            )
            .await;
            assert!(rejected.is_err());
        }

        assert_eq!(state.session_count().await, 0);
        let stats = state.log.stats();
        assert_eq!(stats.frames_skipped, 100);
    }

    #[tokio::test]
    async fn test_rejected_frame_keeps_existing_session() {
        let state = Arc::new(ServerState::new(&ServerConfig::new(0)));

        let first = evaluate_frame(
            State(state.clone()),
            Path("alice".to_string()),
            request("13", LANDMARK_COUNT),
        )
        .await;
        assert!(first.is_ok());
        assert_eq!(state.session_count().await, 1);

        let rejected = evaluate_frame(
            State(state.clone()),
            Path("alice".to_string()),
            request("13", 10),
        )
        .await;
        assert!(rejected.is_err());
        assert_eq!(state.session_count().await, 1);
    }
}
