//! Main HTTP Gateway Server.

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, instrument};

use signshuffle_core::{Oracle, UploadPolicy};

use crate::{extraction, generation, health_api};

/// Application state shared across routes. Nothing in here changes per request.
#[derive(Clone)]
pub struct GatewayState {
    pub oracle: Arc<dyn Oracle>,
    pub policy: UploadPolicy,
    pub model: String,
    pub temperature: f32,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(oracle: Arc<dyn Oracle>, model: impl Into<String>) -> Self {
        Self {
            oracle,
            policy: UploadPolicy::default(),
            model: model.into(),
            temperature: 1.0,
            started_at: Instant::now(),
        }
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Request bodies carry base64 (4/3 of the decoded size) plus a data-URL prefix.
/// Images somewhat over the policy limit must still reach the handler, which
/// answers "File too large".
fn request_body_limit(policy: &UploadPolicy) -> usize {
    policy.max_bytes().saturating_mul(2).saturating_add(64 * 1024)
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    let body_limit = request_body_limit(&state.policy);
    Router::new()
        .route("/api/get-letters", post(extraction::get_letters))
        .route("/api/get-sentences", post(generation::get_sentences))
        .route("/api/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Starts the Axum HTTP server for the gateway.
#[instrument(skip(router))]
pub async fn start_server(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway HTTP server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_exceeds_encoded_payload() {
        let policy = UploadPolicy::default();
        let encoded = policy.max_bytes().div_ceil(3) * 4;
        assert!(request_body_limit(&policy) > encoded);
    }
}
