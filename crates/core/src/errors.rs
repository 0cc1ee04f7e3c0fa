use thiserror::Error;

/// Failure classes of the interaction edge, from transport shape down to the
/// subsystems behind the dispatcher.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("invalid request signature")]
    InvalidSignature,
    #[error("malformed interaction body: {0}")]
    MalformedBody(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("interaction is not addressed to the invoking user")]
    UnauthorizedSubject,
    #[error("subsystem failure: {0}")]
    SubsystemFailure(String),
}

/// How an [`InteractionError`] surfaces to the caller of the webhook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Rejected at the HTTP layer; no interaction response is produced.
    HttpRejection { status: u16 },
    /// The fixed ephemeral "no permission" payload, HTTP 200.
    Forbidden,
    /// A generic ephemeral failure embed, HTTP 200.
    Failure,
}

impl InteractionError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::MalformedRequest(_) | Self::MalformedBody(_) => {
                Disposition::HttpRejection { status: 400 }
            }
            Self::MethodNotAllowed(_) => Disposition::HttpRejection { status: 405 },
            Self::InvalidSignature => Disposition::HttpRejection { status: 401 },
            Self::UnknownCommand(_) | Self::UnauthorizedSubject => Disposition::Forbidden,
            Self::SubsystemFailure(_) => Disposition::Failure,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.disposition() {
            Disposition::HttpRejection { status: 401 } => "invalid request signature",
            Disposition::HttpRejection { status: 405 } => "method not allowed",
            Disposition::HttpRejection { .. } => "bad request",
            Disposition::Forbidden => FORBIDDEN_MESSAGE,
            Disposition::Failure => FAILURE_MESSAGE,
        }
    }
}

pub const FORBIDDEN_MESSAGE: &str = "You don't have permission to complete this interaction!";
pub const FAILURE_MESSAGE: &str = "An unexpected internal error occurred.";
