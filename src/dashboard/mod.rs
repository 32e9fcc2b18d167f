//! Dashboard: Axum web server for the advisor desk.
//!
//! Serves a JSON REST API over the store and analytics, plus a small
//! self-contained HTML page. CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::{delete, get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub use routes::{AppState, DashboardState};

/// Advisor desk page, compiled into the binary.
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Bind the port and serve in a background task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Advisor desk listening on http://localhost:{port}");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    }))
}

/// Every API route plus the HTML page, with permissive CORS.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Book & clients
        .route("/api/book", get(routes::get_book))
        .route("/api/clients", get(routes::list_clients))
        .route("/api/clients/:id", get(routes::get_client).delete(routes::delete_client))
        .route("/api/clients/:id/portfolio", get(routes::get_portfolio))
        .route("/api/clients/:id/goals", get(routes::get_goals))
        .route("/api/clients/:id/goals/:goal_id/progress", post(routes::post_goal_progress))
        .route("/api/clients/:id/goals/:goal_id/share", post(routes::post_goal_share))
        .route(
            "/api/clients/:id/goals/:goal_id/share/:member",
            delete(routes::delete_goal_share),
        )
        .route("/api/clients/:id/actions", get(routes::get_actions))
        // Orders
        .route("/api/clients/:id/orders", get(routes::get_orders).post(routes::post_order))
        .route("/api/clients/:id/orders/execute", post(routes::post_execute))
        .route("/api/clients/:id/rebalance", post(routes::post_rebalance))
        .route("/api/orders/:client_id/:order_id/advance", post(routes::post_advance))
        .route("/api/orders/:client_id/:order_id/cancel", post(routes::post_cancel))
        // Copilot
        .route(
            "/api/clients/:id/copilot",
            get(routes::get_copilot_history)
                .post(routes::post_copilot)
                .delete(routes::delete_copilot_history),
        )
        .route("/api/clients/:id/brief", post(routes::post_brief))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::copilot::Copilot;
    use crate::data::seed::demo_clients;
    use crate::recommend::RecommendationEngine;
    use crate::storage::WealthStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let store = WealthStore::in_memory();
        store.seed_if_empty(&demo_clients()).unwrap();
        let cfg = AnalyticsConfig::default();
        Arc::new(
            DashboardState::new(store, Copilot::offline(cfg.clone()), RecommendationEngine::new(cfg))
                .with_as_of(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()),
        )
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, json) = send(build_router(test_state()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["copilot_online"], false);
    }

    #[tokio::test]
    async fn test_book_endpoint() {
        let (status, json) = send(build_router(test_state()), "GET", "/api/book", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["clients"], 5);
        assert!(!json["alerts"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_endpoints() {
        let state = test_state();
        for uri in [
            "/api/clients",
            "/api/clients/c-001",
            "/api/clients/c-001/portfolio",
            "/api/clients/c-001/goals",
            "/api/clients/c-001/actions",
            "/api/clients/c-001/orders",
            "/api/clients/c-001/copilot",
        ] {
            let (status, _) = send(build_router(state.clone()), "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_portfolio_endpoint_reports_drift() {
        let (_, json) = send(build_router(test_state()), "GET", "/api/clients/c-001/portfolio", None).await;
        assert_eq!(json["drift"]["model"], "Income & Stability");
        assert_eq!(json["drift"]["needs_rebalance"], true);
        assert_eq!(json["holdings"][0]["symbol"], "VTI");
    }

    #[tokio::test]
    async fn test_unknown_client_is_404() {
        let (status, json) = send(build_router(test_state()), "GET", "/api/clients/nobody/portfolio", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("nobody"));
    }

    #[tokio::test]
    async fn test_rebalance_then_walk_order_lifecycle() {
        let state = test_state();

        let (status, json) = send(build_router(state.clone()), "POST", "/api/clients/c-001/rebalance", None).await;
        assert_eq!(status, StatusCode::OK);
        let orders = json["orders"].as_array().unwrap();
        assert!(!orders.is_empty());
        let order_id = orders[0]["id"].as_str().unwrap().to_string();
        assert_eq!(orders[0]["side"], "Sell");

        let advance = format!("/api/orders/c-001/{order_id}/advance");
        let (_, json) = send(build_router(state.clone()), "POST", &advance, None).await;
        assert_eq!(json["status"], "Submitted");
        let (_, json) = send(build_router(state.clone()), "POST", &advance, None).await;
        assert_eq!(json["status"], "Filled");

        // Terminal orders neither advance nor cancel.
        let (status, _) = send(build_router(state.clone()), "POST", &advance, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let cancel = format!("/api/orders/c-001/{order_id}/cancel");
        let (status, _) = send(build_router(state.clone()), "POST", &cancel, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_cancel_pending_order() {
        let state = test_state();
        let body = serde_json::json!({
            "symbol": "VT",
            "side": "Buy",
            "quantity": 10,
            "price": 115,
            "asset_class": "Equity"
        });
        let (status, json) = send(build_router(state.clone()), "POST", "/api/clients/c-002/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], "Pending");

        let cancel = format!("/api/orders/c-002/{}/cancel", json["id"].as_str().unwrap());
        let (status, json) = send(build_router(state.clone()), "POST", &cancel, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "Cancelled");
    }

    #[tokio::test]
    async fn test_unknown_order_is_404() {
        let (status, _) = send(build_router(test_state()), "POST", "/api/orders/c-001/missing/advance", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_copilot_endpoint_records_history() {
        let state = test_state();
        let body = serde_json::json!({ "question": "How are the goals tracking?" });
        let (status, json) = send(build_router(state.clone()), "POST", "/api/clients/c-002/copilot", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["source"], "Fallback");
        assert_eq!(json["intent"], "Goals");

        let (_, history) = send(build_router(state.clone()), "GET", "/api/clients/c-002/copilot", None).await;
        assert_eq!(history.as_array().unwrap().len(), 2);

        let (status, _) = send(build_router(state.clone()), "DELETE", "/api/clients/c-002/copilot", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, history) = send(build_router(state), "GET", "/api/clients/c-002/copilot", None).await;
        assert!(history.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_routes() {
        let state = test_state();

        let share = "/api/clients/c-002/goals/g-oka-home/share/Priya%20Okafor";
        let (status, json) = send(build_router(state.clone()), "DELETE", share, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["shared_with"].as_array().unwrap().is_empty());

        let (status, _) = send(build_router(state.clone()), "DELETE", "/api/clients/c-004", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(build_router(state.clone()), "GET", "/api/clients/c-004", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, json) = send(build_router(state), "GET", "/api/book", None).await;
        assert_eq!(json["clients"], 4);
    }

    #[tokio::test]
    async fn test_brief_endpoint() {
        let (status, json) = send(build_router(test_state()), "POST", "/api/clients/c-003/brief", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["text"].as_str().unwrap().starts_with("Meeting brief for Alex Rivera."));
    }

    #[tokio::test]
    async fn test_dashboard_html() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("WEALTHDESK"));
        assert!(html.contains("Dashboard"));
    }
}
