//! Flood-risk Server - Prediction API Server
//!
//! HTTP server exposing the flood-risk classifier.

pub mod http;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use floodrisk_core::{
    ArtifactSet, ConfigError, ErrorStatusPolicy, PredictionContext, ServerConfig,
};

/// Shared application state
///
/// Built once at startup and never mutated, so handlers share it without locks.
pub struct AppState {
    pub context: PredictionContext,
    pub message: String,
    pub error_status: ErrorStatusPolicy,
    allowed_origin: HeaderValue,
}

impl AppState {
    pub fn new(context: PredictionContext, config: &ServerConfig) -> Result<Self, ConfigError> {
        let allowed_origin = HeaderValue::from_str(&config.allowed_origin).map_err(|e| {
            ConfigError::Invalid(format!(
                "allowed_origin '{}' is not a valid header value: {}",
                config.allowed_origin, e
            ))
        })?;

        Ok(Self {
            context,
            message: config.message.clone(),
            error_status: config.error_status,
            allowed_origin,
        })
    }

    /// Load artifacts named by the config and build the prediction context
    pub fn from_config(config: &ServerConfig) -> floodrisk_core::Result<Self> {
        config.validate()?;

        let artifacts = ArtifactSet::load(&config.artifacts.paths())?;
        let context = PredictionContext::from_artifacts(
            artifacts,
            &config.scaling,
            config.validation.unknown_keys,
        )?;

        tracing::info!(
            features = context.catalog().len(),
            scaler = %config.scaling.scaler_key,
            scaled = config.scaling.subset.len(),
            "Prediction context ready"
        );

        Ok(Self::new(context, config)?)
    }

    pub fn allowed_origin(&self) -> &HeaderValue {
        &self.allowed_origin
    }
}

/// Single-origin CORS policy with credentials
///
/// Wildcards are not allowed alongside credentials, so methods and
/// headers mirror whatever the preflight asks for.
fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.allowed_origin.clone());

    Router::new()
        .route("/", get(http::home))
        .route("/features", get(http::get_features))
        .route("/predict", post(http::predict))
        .route("/health", get(http::health))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Flood-risk server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
