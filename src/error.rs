use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Message shared by password-change and login failures.
pub const ACCESS_DENIED: &str = "Access denied";

/// The service's error type.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The requested session algorithm is not recognized.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key agreement could not be completed.
    #[error("Negotiation failed: {0}")]
    NegotiationFailure(String),

    /// Bad padding, wrong key length or malformed ciphertext.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// The session does not exist or has been closed.
    #[error("No such session")]
    UnknownSession,

    /// The old password presented to SetPassword did not verify.
    #[error("Access denied")]
    PasswordMismatch,

    /// The hash presented to Login (or the cookie presented to Command) did not verify.
    #[error("Access denied")]
    AuthenticationFailed,

    /// A freshly generated identifier collided with a live one.
    #[error("Object path collision: {0}")]
    PathCollision(String),

    /// A collection or item lookup missed.
    #[error("No such object")]
    NotFound,

    /// A malformed argument.
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// An I/O error from the password-file collaborator.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A transport failure seen by the client.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `ServiceError` as the error type.
pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    /// The bus-style error name carried on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceError::UnsupportedAlgorithm(_) => "org.freedesktop.DBus.Error.NotSupported",
            ServiceError::NegotiationFailure(_) => "org.freedesktop.Secret.Error.NegotiationFailure",
            ServiceError::Crypto(_) => "org.freedesktop.Secret.Error.Crypto",
            ServiceError::UnknownSession => "org.freedesktop.Secret.Error.NoSession",
            ServiceError::PasswordMismatch => "org.freedesktop.Secret.Error.PasswordMismatch",
            ServiceError::AuthenticationFailed => {
                "org.freedesktop.Secret.Error.AuthenticationFailed"
            }
            ServiceError::PathCollision(_) => "org.freedesktop.Secret.Error.PathCollision",
            ServiceError::NotFound => "org.freedesktop.Secret.Error.NoSuchObject",
            ServiceError::Validation(_) => "org.freedesktop.DBus.Error.InvalidArgs",
            ServiceError::Io(_) => "org.freedesktop.DBus.Error.IOError",
            ServiceError::Transport(_) => "org.freedesktop.DBus.Error.NoReply",
            ServiceError::Internal(_) => "org.freedesktop.DBus.Error.Failed",
        }
    }

    /// Rebuilds a typed error from a wire name and message.
    pub fn from_wire(name: &str, message: String) -> Self {
        match name {
            "org.freedesktop.DBus.Error.NotSupported" => ServiceError::UnsupportedAlgorithm(message),
            "org.freedesktop.Secret.Error.NegotiationFailure" => {
                ServiceError::NegotiationFailure(message)
            }
            "org.freedesktop.Secret.Error.Crypto" => ServiceError::Crypto(message),
            "org.freedesktop.Secret.Error.NoSession" => ServiceError::UnknownSession,
            "org.freedesktop.Secret.Error.PasswordMismatch" => ServiceError::PasswordMismatch,
            "org.freedesktop.Secret.Error.AuthenticationFailed" => {
                ServiceError::AuthenticationFailed
            }
            "org.freedesktop.Secret.Error.PathCollision" => ServiceError::PathCollision(message),
            "org.freedesktop.Secret.Error.NoSuchObject" => ServiceError::NotFound,
            "org.freedesktop.DBus.Error.InvalidArgs" => ServiceError::Validation(message),
            "org.freedesktop.DBus.Error.NoReply" => ServiceError::Transport(message),
            _ => ServiceError::Internal(message),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServiceError::UnsupportedAlgorithm(ref alg) => {
                tracing::debug!("Unsupported algorithm requested: {}", alg);
                (StatusCode::BAD_REQUEST, self.to_string())
            }

            ServiceError::NegotiationFailure(ref msg) => {
                tracing::warn!("Session negotiation failed: {}", msg);
                (StatusCode::BAD_REQUEST, self.to_string())
            }

            ServiceError::Crypto(ref msg) => {
                tracing::warn!("Crypto error: {}", msg);
                (StatusCode::BAD_REQUEST, "Crypto error".to_string())
            }

            ServiceError::UnknownSession => {
                tracing::debug!("Unknown session");
                (StatusCode::NOT_FOUND, self.to_string())
            }

            ServiceError::PasswordMismatch | ServiceError::AuthenticationFailed => {
                tracing::warn!("Access denied ({})", self.name());
                (StatusCode::UNAUTHORIZED, ACCESS_DENIED.to_string())
            }

            ServiceError::PathCollision(ref path) => {
                tracing::error!("Object path collision: {}", path);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            ServiceError::NotFound => {
                tracing::debug!("Object not found");
                (StatusCode::NOT_FOUND, self.to_string())
            }

            ServiceError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            ServiceError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "File system error".to_string())
            }

            ServiceError::Transport(ref msg) | ServiceError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let name = self.name();
        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message,
            "name": name
        }))
        .unwrap_or_else(|_| {
            r#"{"error":"Internal server error","name":"org.freedesktop.DBus.Error.Failed"}"#
                .to_string()
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
