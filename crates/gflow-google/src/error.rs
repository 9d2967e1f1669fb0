//! Error types for token management and authenticated dispatch.
//!
//! Every terminal failure surfaced by [`TokenManager`](crate::TokenManager) or
//! [`AuthenticatedRequestDispatcher`](crate::AuthenticatedRequestDispatcher)
//! is an [`AuthError`]. [`AuthErrorKind`] gives callers a flat classification
//! for matching and for retry decisions.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// The category of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// The credential has no refresh token; the user must authorize again.
    NoRefreshToken,
    /// A single token-endpoint exchange failed.
    TokenExchangeFailed,
    /// The retry budget was exhausted.
    TooManyRefreshAttempts,
    /// The target API answered with an error status or error body.
    HttpError,
    /// The provider rejected the bearer token even after reauthentication.
    Unauthorized,
    /// Network-level failure: connect, timeout, reading the body.
    TransportError,
    /// No credential is stored under the requested id.
    CredentialNotFound,
    /// The credential store failed to read or write.
    StoreError,
    /// A response could not be decoded.
    InvalidResponse,
    /// Invalid configuration or request.
    ConfigurationError,
}

impl AuthErrorKind {
    /// Returns true if a failed attempt of this kind may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TokenExchangeFailed | Self::HttpError | Self::TransportError
        )
    }

    /// Returns a stable snake_case name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRefreshToken => "no_refresh_token",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::TooManyRefreshAttempts => "too_many_refresh_attempts",
            Self::HttpError => "http_error",
            Self::Unauthorized => "unauthorized",
            Self::TransportError => "transport_error",
            Self::CredentialNotFound => "credential_not_found",
            Self::StoreError => "store_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while refreshing tokens or dispatching requests.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential has no refresh token.
    #[error("no refresh token available, authorization is required")]
    NoRefreshToken,

    /// One token exchange attempt failed.
    #[error("token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    /// The bounded retry loop gave up. `last_error` is the final attempt's error.
    #[error("giving up after {attempts} attempts: {last_error}")]
    TooManyRefreshAttempts {
        attempts: u32,
        last_error: Box<AuthError>,
    },

    /// The API returned an error status (or an error body).
    #[error("HTTP error {code}: {message}")]
    Http {
        code: u16,
        message: String,
        /// The decoded response body, if any.
        body: Option<Value>,
    },

    /// The bearer token was rejected after one reauthentication.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Network-level failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// No credential stored under the given id.
    #[error("no credential stored under '{id}'")]
    CredentialNotFound { id: String },

    /// The credential store failed.
    #[error("credential store error: {message}")]
    Store { message: String },

    /// A response body could not be decoded.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Invalid configuration or request.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl AuthError {
    /// Creates a token exchange error.
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::TokenExchangeFailed {
            message: message.into(),
        }
    }

    /// Creates an HTTP error without a body.
    pub fn http(code: u16, message: impl Into<String>) -> Self {
        Self::Http {
            code,
            message: message.into(),
            body: None,
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a transport error from a reqwest failure.
    ///
    /// The URL is stripped since query strings may carry an API key.
    pub fn transport(context: &str, source: reqwest::Error) -> Self {
        let source = source.without_url();
        let message = if source.is_timeout() {
            format!("{context}: request timeout")
        } else if source.is_connect() {
            format!("{context}: connection failed: {source}")
        } else {
            format!("{context}: {source}")
        };
        Self::Transport {
            message,
            source: Some(source),
        }
    }

    /// Creates a credential-not-found error.
    pub fn credential_not_found(id: impl Into<String>) -> Self {
        Self::CredentialNotFound { id: id.into() }
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::NoRefreshToken => AuthErrorKind::NoRefreshToken,
            Self::TokenExchangeFailed { .. } => AuthErrorKind::TokenExchangeFailed,
            Self::TooManyRefreshAttempts { .. } => AuthErrorKind::TooManyRefreshAttempts,
            Self::Http { .. } => AuthErrorKind::HttpError,
            Self::Unauthorized { .. } => AuthErrorKind::Unauthorized,
            Self::Transport { .. } => AuthErrorKind::TransportError,
            Self::CredentialNotFound { .. } => AuthErrorKind::CredentialNotFound,
            Self::Store { .. } => AuthErrorKind::StoreError,
            Self::InvalidResponse { .. } => AuthErrorKind::InvalidResponse,
            Self::Configuration { .. } => AuthErrorKind::ConfigurationError,
        }
    }

    /// Returns true if a failed attempt with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Returns the HTTP status code carried by this error, looking through
    /// an exhausted retry loop to its last attempt.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { code, .. } => Some(*code),
            Self::Unauthorized { .. } => Some(401),
            Self::TooManyRefreshAttempts { last_error, .. } => last_error.status_code(),
            _ => None,
        }
    }

    /// Returns the response body carried by this error, if any.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            Self::TooManyRefreshAttempts { last_error, .. } => last_error.body(),
            _ => None,
        }
    }
}

/// A specialized Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
