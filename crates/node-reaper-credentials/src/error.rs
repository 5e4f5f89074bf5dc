//! Credential error types.

use thiserror::Error;

/// A result type using `CredentialError`.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors that can occur while obtaining or materializing cluster credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The secret store refused access to the credential.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The secret store is unavailable.
    #[error("secret store unavailable: {0}")]
    Transient(String),

    /// The secret exists but holds no usable kubeconfig.
    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    /// The credential could not be written to its scoped file.
    #[error("failed to materialize credential: {0}")]
    Materialize(#[source] std::io::Error),

    /// The provider is misconfigured.
    #[error("credential configuration error: {0}")]
    Config(String),
}

impl CredentialError {
    /// Returns `true` if redelivering the request may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Materialize(_))
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AccessDenied(_) => 403,
            Self::Transient(_) => 503,
            Self::InvalidSecret(_) | Self::Materialize(_) | Self::Config(_) => 500,
        }
    }
}
