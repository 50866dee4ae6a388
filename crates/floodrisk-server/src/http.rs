//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use floodrisk_core::{ErrorStatusPolicy, PredictError, RawInputRecord};

use crate::AppState;

/// Response for `GET /`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Liveness and identity check
pub async fn home(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.message.clone(),
    })
}

/// Response for `GET /features`
#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
}

/// Get the feature catalog, in model column order
pub async fn get_features(State(state): State<Arc<AppState>>) -> Json<FeaturesResponse> {
    Json(FeaturesResponse {
        features: state.context.catalog().names().to_vec(),
    })
}

/// Get service status
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "features": state.context.catalog().len()
    }))
}

/// Request to run one prediction
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub data: RawInputRecord,
}

/// Successful prediction
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(rename = "prediction_inondations_dans_votre_departement")]
    pub prediction: i64,
    pub annonce: String,
}

/// Failed prediction
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status code for a prediction failure under the configured policy
pub fn error_status(policy: ErrorStatusPolicy, err: &PredictError) -> StatusCode {
    match policy {
        ErrorStatusPolicy::Ok => StatusCode::OK,
        ErrorStatusPolicy::ClientError if err.kind().is_client_error() => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorStatusPolicy::ClientError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run a prediction on a single record
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Response {
    match state.context.predict(&request.data) {
        Ok(result) => {
            tracing::debug!(label = result.label, risk = %result.risk, "Prediction served");
            Json(PredictResponse {
                prediction: result.label,
                annonce: result.annotation().to_string(),
            })
            .into_response()
        }
        Err(err) => {
            let kind = err.kind();
            if kind.is_client_error() {
                tracing::warn!(%kind, "Rejected prediction request: {}", err);
            } else {
                tracing::error!(%kind, "Prediction failed: {}", err);
            }
            (
                error_status(state.error_status, &err),
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
