use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use pullbot_core::{Disposition, InteractionError};
use pullbot_discord::{
    FinalizedResponse, InteractionPipeline, ResponsePayload, SignedRequest, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
use tracing::{error, warn};

#[derive(Clone)]
pub struct WebhookState {
    pipeline: Arc<InteractionPipeline>,
}

pub fn router(pipeline: InteractionPipeline) -> Router {
    Router::new()
        .route("/", any(interactions))
        .with_state(WebhookState { pipeline: Arc::new(pipeline) })
}

/// Signature headers borrowed from an admitted request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureHeaders<'a> {
    pub signature: &'a str,
    pub timestamp: &'a str,
}

/// Transport checks that run before any cryptography.
pub struct RequestGate;

impl RequestGate {
    pub fn admit<'a>(
        method: &Method,
        headers: &'a HeaderMap,
    ) -> Result<SignatureHeaders<'a>, InteractionError> {
        if method != Method::POST {
            return Err(InteractionError::MethodNotAllowed(method.to_string()));
        }

        Ok(SignatureHeaders {
            signature: required_header(headers, SIGNATURE_HEADER)?,
            timestamp: required_header(headers, TIMESTAMP_HEADER)?,
        })
    }
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, InteractionError> {
    headers
        .get(name)
        .ok_or_else(|| InteractionError::MalformedRequest(format!("missing `{name}` header")))?
        .to_str()
        .map_err(|_| InteractionError::MalformedRequest(format!("`{name}` header is not ASCII")))
}

async fn interactions(
    State(state): State<WebhookState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let admitted = match RequestGate::admit(&method, &headers) {
        Ok(admitted) => admitted,
        Err(rejection) => {
            warn!(
                event_name = "interaction.rejected.malformed",
                correlation_id = "unverified",
                error = %rejection,
                "request rejected before signature verification"
            );
            return rejection_response(&rejection);
        }
    };

    let request = SignedRequest {
        body: &body,
        signature: admitted.signature,
        timestamp: admitted.timestamp,
    };

    match state.pipeline.handle(request).await {
        Ok(finalized) => into_http(finalized),
        Err(rejection) => rejection_response(&rejection),
    }
}

/// Sends JSON, or multipart when the payload travels with files.
pub fn into_http(finalized: FinalizedResponse) -> Response {
    match finalized.into_body() {
        Ok(body) => {
            (StatusCode::OK, [(CONTENT_TYPE, body.content_type)], body.bytes).into_response()
        }
        Err(failure) => {
            error!(
                event_name = "interaction.subsystem.failed",
                correlation_id = "unknown",
                error = %failure,
                "could not encode interaction response"
            );
            (StatusCode::OK, Json(ResponsePayload::failure())).into_response()
        }
    }
}

fn rejection_response(rejection: &InteractionError) -> Response {
    let status = match rejection.disposition() {
        Disposition::HttpRejection { status } => {
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST)
        }
        Disposition::Forbidden => {
            return (StatusCode::OK, Json(ResponsePayload::rejection())).into_response()
        }
        Disposition::Failure => {
            return (StatusCode::OK, Json(ResponsePayload::failure())).into_response()
        }
    };

    (status, rejection.user_message()).into_response()
}
