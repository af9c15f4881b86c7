//! The completion proxy: one POST route that forwards a chat payload to the
//! configured provider with the server-held credential.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::ai_generation::config::AiGenerationConfig;
use crate::ai_generation::providers::{provider_factory, AiProvider};
use crate::ai_generation::{ChatResponse, CompletionRequest};
use crate::error::{Result, StudyError};

pub mod config;

/// Shared by every request. `provider` is absent when the credential was
/// missing at startup; requests then fail with a configuration error.
#[derive(Clone)]
pub struct ProxyState {
    provider: Option<Arc<dyn AiProvider>>,
    credential_var: &'static str,
}

impl ProxyState {
    pub fn from_config(config: &AiGenerationConfig) -> Result<Self> {
        let credential_var = config.provider.credential_var();
        match provider_factory(config) {
            Ok(provider) => {
                info!(
                    provider = config.provider.display_name(),
                    "completion provider ready"
                );
                Ok(Self {
                    provider: Some(Arc::from(provider)),
                    credential_var,
                })
            }
            Err(StudyError::Configuration { message }) => {
                error!("{message}; completion requests will fail until it is set");
                Ok(Self::unconfigured(credential_var))
            }
            Err(err) => Err(err),
        }
    }

    pub fn with_provider(provider: Arc<dyn AiProvider>) -> Self {
        Self {
            provider: Some(provider),
            credential_var: "",
        }
    }

    pub fn unconfigured(credential_var: &'static str) -> Self {
        Self {
            provider: None,
            credential_var,
        }
    }

    fn provider(&self) -> Result<&Arc<dyn AiProvider>> {
        self.provider.as_ref().ok_or_else(|| StudyError::Configuration {
            message: format!("{} is not set", self.credential_var),
        })
    }
}

pub fn router(state: ProxyState, route: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route(
            route,
            post(complete)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until ctrl-c.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    info!(addr = %listener.local_addr()?, "proxy listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("could not listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn complete(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, StudyError> {
    // credential first, so a misconfigured server answers 500 whatever the body
    let provider = state.provider()?;
    let request = CompletionRequest::from_body(&body)?;
    let response = provider.complete(&request).await?;
    Ok(Json(response))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> StudyError {
    StudyError::MethodNotAllowed
}

impl IntoResponse for StudyError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::BAD_GATEWAY);
        if status.is_server_error() {
            error!(status = status.as_u16(), "{self}");
        } else {
            warn!(status = status.as_u16(), "{self}");
        }
        let body = json!({ "error": { "message": self.caller_message() } });
        (status, Json(body)).into_response()
    }
}
