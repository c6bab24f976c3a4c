//! Error types for storefront-cli.

use thiserror::Error;

/// Result type alias for storefront-cli operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in storefront-cli.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from storefront-core
    #[error(transparent)]
    Core(#[from] storefront_core::Error),

    /// Error from storefront-client
    #[error(transparent)]
    Client(#[from] storefront_client::Error),

    /// Writing to the terminal failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Argument that clap cannot check on its own
    #[error("Invalid argument: {0}")]
    Usage(String),
}

impl Error {
    /// Creates a usage error.
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Error::Usage(message.into())
    }
}
