//! JSON HTTP surface over the vault.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{Result, VaultError};
use crate::history::ConversationTurn;
use crate::vault::Vault;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub filename: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct GapRequest {
    pub jd_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GapResponse {
    pub analysis: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(vault: Arc<Vault>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/query", post(query_handler))
        .route("/jd-gap-analysis", post(gap_handler))
        .with_state(vault)
}

pub async fn serve(vault: Arc<Vault>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "llm-vault listening");
    axum::serve(listener, router(vault)).await?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn query_handler(
    State(vault): State<Arc<Vault>>,
    Json(request): Json<QueryRequest>,
) -> std::result::Result<Json<QueryResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let answer = vault
        .answer(&request.question, &request.history)
        .await
        .map_err(failure)?;
    let sources = answer
        .used_context
        .into_iter()
        .map(|record| SourceRef {
            id: record.id,
            filename: record.metadata.filename,
            category: record.metadata.category,
        })
        .collect();
    Ok(Json(QueryResponse {
        answer: answer.text,
        sources,
    }))
}

async fn gap_handler(
    State(vault): State<Arc<Vault>>,
    Json(request): Json<GapRequest>,
) -> std::result::Result<Json<GapResponse>, ApiError> {
    if request.jd_text.trim().is_empty() {
        return Err(bad_request("jd_text must not be empty"));
    }
    let analysis = vault
        .gap_analysis(&request.jd_text)
        .await
        .map_err(failure)?;
    Ok(Json(GapResponse { analysis }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn failure(err: VaultError) -> ApiError {
    error!(error = %err, "request failed");
    match err {
        VaultError::NotFound { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                message: err.to_string(),
            }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                message: "the request could not be completed, please try again".to_string(),
            }),
        ),
    }
}
