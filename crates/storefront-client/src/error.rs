//! Error types for storefront-client.

use thiserror::Error;

/// Result type alias for storefront-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in storefront-client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from storefront-core
    #[error("Core error: {0}")]
    Core(#[from] storefront_core::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request could not be delivered
    #[error("Transport error for {url}: {message}")]
    Transport {
        /// Target URL
        url: String,
        /// What went wrong
        message: String,
    },

    /// Attempt exceeded the configured timeout
    #[error("Request timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Backend answered with `ok: false` or an `error` field
    #[error("{route}: {}", message.as_deref().unwrap_or("request failed"))]
    Api {
        /// Backend route
        route: String,
        /// Backend error text, when it sent one
        message: Option<String>,
    },

    /// Backend answer did not have the expected shape
    #[error("Unexpected response from {route}: {message}")]
    InvalidResponse {
        /// Backend route
        route: String,
        /// What was missing
        message: String,
    },

    /// Admin operation attempted without logging in
    #[error("Admin login required")]
    NotAuthorized,
}

impl Error {
    /// Returns whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Transport { .. } => true,
            Error::Timeout { .. } => true,
            Error::Core(_) => false,
            Error::Api { .. } => false,
            Error::InvalidResponse { .. } => false,
            Error::NotAuthorized => false,
        }
    }

    /// Creates an API error with the backend's message.
    pub fn api(route: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            route: route.into(),
            message: Some(message.into()),
        }
    }

    /// Creates an API error from an envelope, keeping its `error` text.
    pub fn api_from(route: impl Into<String>, envelope: &serde_json::Value) -> Self {
        Error::Api {
            route: route.into(),
            message: crate::envelope::error_of(envelope),
        }
    }

    /// The backend's own error text, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Error::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Creates a transport error.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(route: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidResponse {
            route: route.into(),
            message: message.into(),
        }
    }

    /// Message suitable for a notice: validation text or backend error as is.
    pub fn user_message(&self) -> String {
        match self {
            Error::Core(e) => e.user_message(),
            Error::Api {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}
