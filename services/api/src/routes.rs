use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use parking_pass::identity::UserRepository;
use parking_pass::workflows::parking::{portal_router, ApplicationRepository, ParkingPortal};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_portal_routes<R, U>(portal: Arc<ParkingPortal<R, U>>) -> axum::Router
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    portal_router(portal)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
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
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use parking_pass::identity::SessionManager;
    use parking_pass::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(readiness: Arc<AtomicBool>) -> axum::Router {
        let store = Arc::new(MemoryStore::new());
        let portal = Arc::new(ParkingPortal::new(
            store.clone(),
            store,
            SessionManager::new("routes-secret", Duration::minutes(5)),
        ));
        let state = AppState {
            readiness,
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_portal_routes(portal).layer(Extension(state))
    }

    async fn status_of(router: &axum::Router, uri: &str) -> StatusCode {
        router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response")
            .status()
    }

    #[tokio::test]
    async fn readiness_flips_once_the_listener_is_bound() {
        let readiness = Arc::new(AtomicBool::new(false));
        let router = app(readiness.clone());

        assert_eq!(status_of(&router, "/health").await, StatusCode::OK);
        assert_eq!(
            status_of(&router, "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        readiness.store(true, Ordering::Release);
        assert_eq!(status_of(&router, "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn portal_and_metrics_routes_are_mounted() {
        let router = app(Arc::new(AtomicBool::new(true)));
        assert_eq!(status_of(&router, "/").await, StatusCode::OK);
        assert_eq!(status_of(&router, "/metrics").await, StatusCode::OK);
        assert_eq!(
            status_of(&router, "/api/v1/applications").await,
            StatusCode::UNAUTHORIZED
        );
    }
}
