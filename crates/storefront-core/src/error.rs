//! Error types for the storefront core library.

use std::path::{Path, PathBuf};

/// Errors that can occur in storefront core operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input failed validation (admin forms, checkout fields, promo records)
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation, if known
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// I/O error tied to a path (store files, config files)
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Menu item not present in the catalog
    #[error("Item not found: {id}")]
    ItemNotFound {
        /// Item ID that was not found
        id: String,
    },

    /// Cart line index does not exist
    #[error("Cart line {index} out of range ({len} lines)")]
    LineOutOfRange {
        /// Requested index
        index: usize,
        /// Number of lines in the cart
        len: usize,
    },
}

/// Convenience `Result` type alias for storefront core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it concerns.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns the user-facing message for validation errors, or the display
    /// string otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("Nama menu wajib diisi");
        assert_eq!(err.to_string(), "Validation error: Nama menu wajib diisi");
        assert_eq!(err.user_message(), "Nama menu wajib diisi");
    }

    #[test]
    fn test_validation_error_with_field() {
        let err = Error::validation_field("code", "Kode wajib diisi");
        let Error::Validation { field, message } = err else {
            unreachable!("Expected Validation error variant");
        };
        assert_eq!(field, Some("code".to_string()));
        assert_eq!(message, "Kode wajib diisi");
    }

    #[test]
    fn test_io_with_path_mentions_path() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            "/tmp/store/adm_cart.json",
        );
        assert!(err.to_string().contains("/tmp/store/adm_cart.json"));
    }

    #[test]
    fn test_line_out_of_range_display() {
        let err = Error::LineOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Cart line 4 out of range (2 lines)");
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
