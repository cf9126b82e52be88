use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use taicc_readiness::workflows::assessment::{assessment_router, AssessmentService, SessionStore};

pub(crate) fn with_assessment_routes(
    service: Arc<AssessmentService>,
    sessions: Arc<SessionStore>,
) -> axum::Router {
    assessment_router(service, sessions)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Acquire);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };
    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::OfflineNarrator;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use taicc_readiness::workflows::assessment::{CsvRowSink, QuestionCatalog, SystemClock};
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let catalog = QuestionCatalog::from_json_str(r#"{"BFSI": {"Tier 1": ["Is fraud detection automated?"]}}"#)
            .expect("catalog parses");
        let service = AssessmentService::new(
            Arc::new(catalog),
            Arc::new(OfflineNarrator),
            Arc::new(CsvRowSink::new(Vec::new())),
            Arc::new(SystemClock),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_assessment_routes(
            Arc::new(service),
            Arc::new(SessionStore::new(Duration::from_secs(60))),
        )
        .layer(Extension(state))
    }

    async fn status_of(router: axum::Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        assert_eq!(status_of(app(false), "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(app(true), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn operational_routes_sit_beside_the_assessment() {
        let router = app(true);
        assert_eq!(status_of(router.clone(), "/metrics").await, StatusCode::OK);
        assert_eq!(status_of(router.clone(), "/").await, StatusCode::OK);
        assert_eq!(status_of(router, "/api/v1/catalog").await, StatusCode::OK);
    }
}
