use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::access::{AccessCodes, AuthResponse};
use crate::config::ServerConfig;

pub const AUTH_ROUTE: &str = "/api/auth";

#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("invalid access code")]
    InvalidCode,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            AuthRejection::InvalidCode => (
                StatusCode::UNAUTHORIZED,
                Json(AuthResponse { success: false }),
            )
                .into_response(),
        }
    }
}

#[derive(Deserialize)]
struct AuthPayload {
    #[serde(default)]
    code: Option<String>,
}

pub fn router(codes: AccessCodes) -> Router {
    Router::new()
        .route(AUTH_ROUTE, any(auth_handler))
        .with_state(Arc::new(codes))
}

async fn auth_handler(
    State(codes): State<Arc<AccessCodes>>,
    method: Method,
    body: Bytes,
) -> Result<Json<AuthResponse>, AuthRejection> {
    if method != Method::POST {
        return Err(AuthRejection::MethodNotAllowed);
    }

    // Missing or unreadable bodies are treated like a wrong code.
    let code = serde_json::from_slice::<AuthPayload>(&body)
        .ok()
        .and_then(|payload| payload.code);

    match code {
        Some(code) if codes.accepts(&code) => {
            info!("access granted");
            Ok(Json(AuthResponse { success: true }))
        }
        _ => {
            warn!("access denied");
            Err(AuthRejection::InvalidCode)
        }
    }
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "auth service listening on http://{} ({} access code(s) configured)",
        listener.local_addr()?,
        config.access_codes.codes().len()
    );

    axum::serve(listener, router(config.access_codes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("auth service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
