use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::QueryError;
use crate::models::{QueryAnswer, QueryRequest};
use crate::state::AppState;

/// POST /query - Answer a question from the indexed documents.
pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryAnswer>, (StatusCode, String)> {
    let answer = state
        .service
        .answer(&req.question, req.return_sources, req.top_k)
        .await
        .map_err(into_response_error)?;

    Ok(Json(answer))
}

/// GET /health - Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "rag-query",
    }))
}

/// GET / - Service info.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "RAG Query API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "query": "/query (POST)",
            "health": "/health (GET)",
        },
    }))
}

/// Client mistakes get a 400, everything else a 500. The error text is the
/// human-readable message from the taxonomy.
fn into_response_error(err: QueryError) -> (StatusCode, String) {
    let status = match err {
        QueryError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
