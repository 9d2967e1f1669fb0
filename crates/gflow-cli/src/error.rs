//! CLI error types.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by `gflow` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Token or API failure.
    #[error(transparent)]
    Auth(#[from] gflow_google::AuthError),

    /// The user must run `gflow auth login` first.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// Invalid command-line input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracing setup failed.
    #[error(transparent)]
    Tracing(#[from] gflow_core::TracingError),
}

impl CliError {
    /// Returns the process exit code for this error.
    ///
    /// Authentication problems exit with 2 so scripts can prompt for login.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AuthRequired(_) => 2,
            Self::Auth(err) => match err.kind() {
                gflow_google::AuthErrorKind::NoRefreshToken
                | gflow_google::AuthErrorKind::Unauthorized
                | gflow_google::AuthErrorKind::CredentialNotFound => 2,
                _ => 1,
            },
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gflow_google::AuthError;

    #[test]
    fn auth_errors_keep_their_message() {
        let err: CliError = AuthError::NoRefreshToken.into();
        assert!(err.to_string().contains("no refresh token"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 1);
        let http: CliError = AuthError::http(500, "boom").into();
        assert_eq!(http.exit_code(), 1);
        assert_eq!(CliError::AuthRequired("login".into()).exit_code(), 2);
    }
}
