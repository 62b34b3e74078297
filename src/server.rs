//! Scrape endpoint. Runs on its own task and only ever reads the metrics.

use crate::error::AppError;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use eyre::{
    Context as _,
    Result,
};
use std::net::SocketAddr;
use tokio::{
    net::TcpListener,
    task::JoinHandle,
};
use usage_exporter_core::ExporterMetrics;

#[derive(Clone)]
pub struct AppState {
    pub metrics: ExporterMetrics,
}

pub fn create_router(metrics: ExporterMetrics) -> Router {
    let state = AppState { metrics };

    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind the listener right away so a taken port fails startup, then serve in the background.
pub async fn spawn_server(address: SocketAddr, metrics: ExporterMetrics) -> Result<JoinHandle<()>> {
    let listener = TcpListener::bind(address)
        .await
        .wrap_err_with(|| format!("failed to bind metrics endpoint to {address}"))?;
    info!("serving metrics on http://{}/metrics", listener.local_addr()?);

    let app = create_router(metrics);
    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service()).await {
            error!("metrics server stopped: {err}");
        }
    }))
}

async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render().map_err(AppError::Encode)?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

async fn healthz() -> &'static str {
    "OK"
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{
        body::Body,
        http::{
            Request,
            StatusCode,
        },
    };
    use http_body_util::BodyExt as _;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt as _;
    use usage_exporter_core::SessionState;

    async fn fetch(router: Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
    }

    #[tokio::test]
    async fn serves_current_metrics() {
        let metrics = ExporterMetrics::new().unwrap();
        let router = create_router(metrics.clone());

        metrics.fetches.inc();
        metrics.set_state(SessionState::Healthy);
        metrics.set_project_cost("proj-a", 12.5);

        let (status, body, content_type) = fetch(router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
        assert!(body.contains("hcloud_usage_exporter_fetches_total 1"));
        assert!(body.contains(r#"hcloud_usage_exporter_state{state="healthy"} 1"#));
        assert!(body.contains(r#"hcloud_usage_exporter_project_cost_eur{project_name="proj-a"} 12.5"#));
    }

    #[tokio::test]
    async fn cleared_projects_disappear_from_scrape() {
        let metrics = ExporterMetrics::new().unwrap();
        metrics.set_project_cost("proj-a", 12.5);
        metrics.clear_project_costs();

        let (_, body, _) = fetch(create_router(metrics), "/metrics").await;
        assert!(!body.contains("proj-a"));
    }

    #[tokio::test]
    async fn health_check() {
        let (status, body, _) = fetch(create_router(ExporterMetrics::new().unwrap()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn binds_and_serves() {
        let handle = spawn_server("127.0.0.1:0".parse().unwrap(), ExporterMetrics::new().unwrap())
            .await
            .unwrap();
        assert!(!handle.is_finished());
        handle.abort();
    }
}
