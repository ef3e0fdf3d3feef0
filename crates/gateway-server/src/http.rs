//! HTTP controller
//!
//! Thin REST surface over the gateway: one route per operation, query
//! parameters in, a JSON envelope or a classified error body out.
//! Status mapping: validation failures are the client's fault (417),
//! semantic ledger rejections are a distinct non-retryable outcome
//! (406), everything else is a server-side failure (500).

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use fabric_client::{Gateway, GatewayError};

/// Build the router for one gateway
pub fn router(gateway: Arc<Gateway>) -> Router {
    // CORS layer to allow browser clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/api/requests/add", post(handle_add))
        .route("/api/requests/set", post(handle_set))
        .route("/api/requests/delete", delete(handle_delete))
        .route("/api/requests/get", get(handle_get))
        .layer(cors)
        .with_state(gateway)
}

#[derive(Debug, Deserialize)]
struct EntityValueParams {
    entity: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct EntityParams {
    entity: String,
}

async fn handle_add(
    State(gateway): State<Arc<Gateway>>,
    Query(params): Query<EntityValueParams>,
) -> Response {
    tracing::debug!(entity = %params.entity, "REST request to add an entity");
    match gateway.add(params.entity, params.value).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_set(
    State(gateway): State<Arc<Gateway>>,
    Query(params): Query<EntityValueParams>,
) -> Response {
    tracing::debug!(entity = %params.entity, "REST request to set an entity");
    match gateway.set(params.entity, params.value).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_delete(
    State(gateway): State<Arc<Gateway>>,
    Query(params): Query<EntityParams>,
) -> Response {
    tracing::debug!(entity = %params.entity, "REST request to delete an entity");
    match gateway.delete(params.entity).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_get(
    State(gateway): State<Arc<Gateway>>,
    Query(params): Query<EntityParams>,
) -> Response {
    tracing::debug!(entity = %params.entity, "REST request to get an entity");
    match gateway.get(params.entity).await {
        Ok(state) => (StatusCode::OK, Json(state)).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(error: GatewayError) -> Response {
    let status = status_for(&error);
    let body = body_for(&error);
    tracing::debug!(code = error.code(), %status, "Request failed: {error}");
    (status, body).into_response()
}

fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::Validation(_) => StatusCode::EXPECTATION_FAILED,
        GatewayError::Semantic(_) => StatusCode::NOT_ACCEPTABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for(error: &GatewayError) -> String {
    match error {
        GatewayError::Validation(_) => error.code().to_string(),
        _ => format!("BLOCKCHAIN ERROR: {error}"),
    }
}
