//! HTTP transport boundary for the workflow orchestrator.
//!
//! Only construction failures and store conflicts become error
//! responses. Stage failures and absent classifications never surface
//! here — they resolve into a completed workflow whose decision
//! reflects the degraded inputs.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, StoreError, WorkflowError};
use crate::pipeline::{Orchestrator, WorkflowRequest};
use crate::store::{ListFilter, WorkflowStatus, WorkflowStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn WorkflowStore>,
    pub default_list_limit: usize,
}

/// Build the Axum router with workflow routes.
pub fn workflow_routes(
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn WorkflowStore>,
    default_list_limit: usize,
) -> Router {
    let state = AppState {
        orchestrator,
        store,
        default_list_limit,
    };

    Router::new()
        .route("/health", get(health))
        .route("/workflows/incoming-message", post(handle_incoming_message))
        .route("/workflows/{workflow_id}", get(get_workflow))
        .route("/workflows", get(list_workflows))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "ops-desk",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Incoming message ────────────────────────────────────────────────

async fn handle_incoming_message(
    State(state): State<AppState>,
    Json(request): Json<WorkflowRequest>,
) -> impl IntoResponse {
    match state.orchestrator.process(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "workflow_id": outcome.workflow_id,
                "decision": outcome.decision,
                "status": outcome.status,
                "message": "Workflow processed successfully",
            })),
        ),
        Err(Error::Workflow(WorkflowError::Construction { reason })) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": reason })),
        ),
        Err(Error::Store(StoreError::Conflict { workflow_id })) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("workflow {workflow_id} already exists")
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Workflow processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Workflow processing failed: {e}")
                })),
            )
        }
    }
}

// ── Read endpoints ──────────────────────────────────────────────────

async fn get_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> impl IntoResponse {
    let Ok(workflow_id) = Uuid::parse_str(&workflow_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid workflow ID" })),
        );
    };

    match state.store.get(workflow_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(serde_json::json!(record))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("Workflow {workflow_id} not found")
            })),
        ),
        Err(e) => {
            warn!(workflow_id = %workflow_id, error = %e, "Workflow lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    tenant_id: Option<String>,
    status: Option<String>,
    limit: Option<usize>,
}

async fn list_workflows(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let status = match query.status.as_deref() {
        Some(s) => match WorkflowStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": format!("Unknown status filter '{s}'")
                    })),
                );
            }
        },
        None => None,
    };

    let filter = ListFilter {
        tenant_id: query.tenant_id,
        status,
    };
    let limit = query.limit.unwrap_or(state.default_list_limit);

    match state.store.list(&filter, limit).await {
        Ok(records) => {
            let workflows: Vec<serde_json::Value> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "workflow_id": r.workflow_id,
                        "tenant_id": r.tenant_id,
                        "status": r.status,
                        "created_at": r.created_at,
                        "updated_at": r.updated_at,
                    })
                })
                .collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "count": workflows.len(),
                    "workflows": workflows,
                })),
            )
        }
        Err(e) => {
            warn!(error = %e, "Workflow listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use crate::agents::HeuristicRiskScorer;
    use crate::connectors::{
        RuleClassifier, StaticKnowledgeBase, StaticThreadConnector, WorkingHoursCalendar,
    };
    use crate::pipeline::PipelineDeps;
    use crate::store::MemoryStore;

    fn test_router() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Arc::new(Orchestrator::new(
            PipelineDeps {
                threads: Arc::new(StaticThreadConnector::new()),
                calendar: Arc::new(WorkingHoursCalendar::new()),
                classifier: Arc::new(RuleClassifier::default_rules()),
                knowledge_base: Arc::new(StaticKnowledgeBase::with_default_entries()),
                risk_scorer: Arc::new(HeuristicRiskScorer::new()),
                store: store.clone(),
            },
            Duration::from_secs(1),
        ));
        (
            workflow_routes(orchestrator, store.clone(), 50),
            store,
        )
    }

    fn incoming_body(tenant_id: &str) -> serde_json::Value {
        serde_json::json!({
            "tenant_id": tenant_id,
            "source": {
                "channel": "email",
                "thread_id": "t1",
                "message_id": "m1"
            },
            "contact": { "email": "alice@example.com", "name": "Alice" },
            "message": {
                "subject": "Meeting request",
                "body_text": "Can we schedule a call next week?",
                "received_at": "2025-06-01T09:00:00Z",
                "message_id": "m1",
                "thread_id": "t1"
            }
        })
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = test_router();
        let response = router.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn incoming_message_completes_workflow() {
        let (router, store) = test_router();
        let response = router
            .oneshot(post_json(
                "/workflows/incoming-message",
                &incoming_body("acme"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "completed");
        // Default tenant config disables auto-send.
        assert_eq!(json["decision"], "draft_only");

        let workflow_id = Uuid::parse_str(json["workflow_id"].as_str().unwrap()).unwrap();
        let record = store.get(workflow_id).await.unwrap().unwrap();
        assert_eq!(record.tenant_id, "acme");
    }

    #[tokio::test]
    async fn blank_tenant_is_unprocessable() {
        let (router, _) = test_router();
        let response = router
            .oneshot(post_json("/workflows/incoming-message", &incoming_body("")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("tenant_id"));
    }

    #[tokio::test]
    async fn get_unknown_workflow_is_not_found() {
        let (router, _) = test_router();
        let response = router
            .oneshot(get_req(&format!("/workflows/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_invalid_id_is_bad_request() {
        let (router, _) = test_router();
        let response = router
            .oneshot(get_req("/workflows/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_returns_full_record() {
        let (router, _) = test_router();
        let response = router
            .clone()
            .oneshot(post_json(
                "/workflows/incoming-message",
                &incoming_body("acme"),
            ))
            .await
            .unwrap();
        let created = response_json(response).await;
        let workflow_id = created["workflow_id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(get_req(&format!("/workflows/{workflow_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["workflow_id"].as_str().unwrap(), workflow_id);
        assert_eq!(json["status"], "completed");
        // Full payload snapshot is included for audit.
        assert_eq!(json["payload"]["tenant_id"], "acme");
        assert!(json["payload"]["classification"].is_object());
    }

    #[tokio::test]
    async fn list_filters_by_tenant() {
        let (router, _) = test_router();
        for tenant in ["acme", "acme", "globex"] {
            let response = router
                .clone()
                .oneshot(post_json(
                    "/workflows/incoming-message",
                    &incoming_body(tenant),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .clone()
            .oneshot(get_req("/workflows?tenant_id=acme"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["count"], 2);

        let response = router
            .oneshot(get_req("/workflows?status=completed&limit=1"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["count"], 1);
    }

    #[tokio::test]
    async fn list_unknown_status_is_bad_request() {
        let (router, _) = test_router();
        let response = router
            .oneshot(get_req("/workflows?status=wedged"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
