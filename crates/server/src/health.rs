use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct HealthState {
    community_packs: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub verifier: HealthCheck,
    pub community_packs: bool,
    pub checked_at: String,
}

/// The interaction router only exists once the verification key parsed, so
/// reaching this handler implies the verifier is loaded.
pub fn router(community_packs: bool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { community_packs })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: format!("pullbot-server {}", env!("CARGO_PKG_VERSION")),
        },
        verifier: HealthCheck {
            status: "ready",
            detail: "ed25519 verification key loaded".to_string(),
        },
        community_packs: state.community_packs,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
