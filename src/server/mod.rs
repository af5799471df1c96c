// file: src/server/mod.rs
// description: HTTP intake for questions and emitter for their summaries
// reference: https://docs.rs/axum

pub mod error;

use crate::config::ServerConfig;
use crate::error::{AgentError, Result};
use crate::models::{QueryRequest, QueryResponse};
use crate::pipeline::QueryPipeline;
use crate::utils::HealthReport;
use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{Request, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{Span, info, info_span};

pub const HOME_MESSAGE: &str = "Elasticsearch log agent is running.";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<QueryPipeline>,
}

/// Span wrapping one HTTP request, tagged with the service name.
pub fn request_span<B>(service: &str, request: &Request<B>) -> Span {
    info_span!(
        "request",
        service = %service,
        method = %request.method(),
        uri = %request.uri()
    )
}

pub fn build_router(
    pipeline: Arc<QueryPipeline>,
    request_timeout: Duration,
    service_name: &str,
) -> Router {
    let service = service_name.to_string();
    Router::new()
        .route("/", get(home_handler))
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { pipeline })
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| request_span(&service, request)),
        )
}

/// Binds the listener and serves until Ctrl-C or SIGTERM.
pub async fn serve(
    config: &ServerConfig,
    service_name: &str,
    pipeline: Arc<QueryPipeline>,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    let router = build_router(
        pipeline,
        Duration::from_secs(config.request_timeout_secs),
        service_name,
    );

    info!("Listening on http://{} as {}", addr, service_name);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
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
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn home_handler() -> Json<Value> {
    Json(json!({ "message": HOME_MESSAGE }))
}

async fn query_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> std::result::Result<Json<QueryResponse>, AgentError> {
    let Json(request) = payload
        .map_err(|e| AgentError::Validation(format!("Invalid JSON body: {}", e.body_text())))?;

    let question = request.question.unwrap_or_default();
    let answer = state.pipeline.answer(&question).await?;

    Ok(Json(QueryResponse {
        response: answer.response,
    }))
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.pipeline.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogHit;
    use crate::pipeline::testing::{FakeSource, ScriptedModel};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn router_with(replies: Vec<&str>, source: FakeSource) -> Router {
        let pipeline = QueryPipeline::new(Arc::new(ScriptedModel::new(replies)), Arc::new(source));
        build_router(Arc::new(pipeline), Duration::from_secs(5), "log-agent-test")
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_request_span_carries_service_name() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let request = Request::builder().uri("/query").body(()).unwrap();
            let span = request_span("log-agent-prod", &request);
            span.in_scope(|| info!("handled"));
        });

        let output = logs.contents();
        assert!(output.contains("service=log-agent-prod"), "{}", output);
        assert!(output.contains("uri=/query"), "{}", output);
        assert!(output.contains("handled"));
    }

    #[tokio::test]
    async fn test_router_requests_are_traced_with_service_name() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = router_with(vec![], FakeSource::with_hits(vec![]));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, _) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(logs.contents().contains("service=log-agent-test"));
    }

    #[tokio::test]
    async fn test_home() {
        let router = router_with(vec![], FakeSource::with_hits(vec![]));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": HOME_MESSAGE }));
    }

    #[tokio::test]
    async fn test_query_returns_summary() {
        let router = router_with(
            vec![r#"{"query": "disk full"}"#, "Node 3 ran out of disk space."],
            FakeSource::with_hits(vec![LogHit::new("t", "no space left on device")]),
        );

        let (status, body) = send(router, post_query(r#"{"question": "why did writes fail?"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "response": "Node 3 ran out of disk space." }));
    }

    #[tokio::test]
    async fn test_missing_question_is_bad_request() {
        let router = router_with(vec![], FakeSource::with_hits(vec![]));
        let (status, body) = send(router, post_query("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing 'question' in body" }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let router = router_with(vec![], FakeSource::with_hits(vec![]));
        let (status, body) = send(router, post_query("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let router = router_with(
            vec![r#"{"query": "x"}"#],
            FakeSource::failing("connection refused"),
        );
        let (status, body) = send(router, post_query(r#"{"question": "what happened?"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_health_unavailable_when_source_down() {
        let router = router_with(vec![], FakeSource::failing("down"));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(router, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["overall_status"], "unhealthy");
    }
}
