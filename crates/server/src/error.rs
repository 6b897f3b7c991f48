//! Unified error handling for the catalog server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::sessions::SessionStoreError;
use crate::shopify::{AuthError, UpstreamError};

/// Application-level error type.
///
/// Response bodies are plain text. Every 5xx is reported to Sentry and
/// answered with a fixed message, never the underlying error.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required query parameter was absent or empty.
    #[error("{0}")]
    MissingParameter(&'static str),

    /// No stored session for the requested shop.
    #[error("Unauthorized – session not found")]
    SessionNotFound,

    /// Starting the OAuth flow failed.
    #[error("Auth initiation failed: {0}")]
    AuthBegin(#[source] AuthError),

    /// Completing the OAuth callback failed.
    #[error("Authentication failed: {0}")]
    AuthCallback(#[source] AuthError),

    /// The Admin API call failed.
    #[error("Failed to fetch products: {0}")]
    Upstream(#[from] UpstreamError),

    /// Session storage failed.
    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),

    /// Resource not found.
    #[error("Not found")]
    NotFound,
}

/// Message for a missing `shop` on the OAuth begin route.
pub const MISSING_SHOP_AUTH: &str = "Missing shop parameter ?shop=your-shop.myshopify.com";

/// Message for a missing `shop` on the products routes.
pub const MISSING_SHOP: &str = "Missing shop parameter";

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AuthBegin(_)
            | Self::AuthCallback(_)
            | Self::Upstream(_)
            | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::MissingParameter(message) => (*message).to_string(),
            Self::SessionNotFound | Self::NotFound => self.to_string(),
            Self::AuthBegin(_) => "Auth initiation failed".to_string(),
            Self::AuthCallback(_) => "Authentication failed".to_string(),
            Self::Upstream(_) => "Failed to fetch products".to_string(),
            Self::Session(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T, E = AppError> = std::result::Result<T, E>;
