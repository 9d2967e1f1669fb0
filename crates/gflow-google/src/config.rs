//! Google OAuth and API configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::backoff::BackoffPolicy;
use crate::credential::CredentialRecord;
use crate::error::{AuthError, AuthResult};

/// OAuth 2.0 client identity registered in the Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

/// Shape of the credentials JSON downloaded from the Cloud Console.
///
/// Either an `installed`/`web` section, or `client_id`/`client_secret` at the
/// root (as written by gcloud).
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AuthError::configuration(format!("failed to read credentials file: {}", e))
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a Cloud Console JSON string.
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            AuthError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self::new(client_id, client_secret)),
            _ => Err(AuthError::configuration(
                "credentials JSON must contain an 'installed'/'web' section or a root-level 'client_id'/'client_secret'",
            )),
        }
    }

    /// Checks that the client ID looks like a Google one and the secret is set.
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.is_empty() {
            return Err(AuthError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(AuthError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(AuthError::configuration("client_secret is required"));
        }
        Ok(())
    }

    /// Builds an empty credential record for this client.
    pub fn to_record(&self) -> CredentialRecord {
        CredentialRecord::new(&self.client_id, &self.client_secret)
    }
}

/// Endpoints and tuning for the Google adapters.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Token endpoint used for refresh and code exchange.
    pub token_url: String,

    /// Consent page used to start authorization.
    pub auth_url: String,

    /// Base URL of the Calendar API v3.
    pub calendar_api_base: String,

    /// Directions API endpoint.
    pub directions_url: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,

    /// OAuth scopes requested at authorization time.
    pub scopes: Vec<String>,

    /// Retry policy for refresh and dispatch.
    pub backoff: BackoffPolicy,

    /// Coalesce concurrent refreshes of the same credential into one exchange.
    pub single_flight_refresh: bool,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            calendar_api_base: Self::DEFAULT_CALENDAR_API_BASE.to_string(),
            directions_url: Self::DEFAULT_DIRECTIONS_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("gflow/{}", env!("CARGO_PKG_VERSION")),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            backoff: BackoffPolicy::default(),
            single_flight_refresh: false,
        }
    }
}

impl GoogleConfig {
    /// Google's token endpoint.
    pub const DEFAULT_TOKEN_URL: &'static str = "https://accounts.google.com/o/oauth2/token";

    /// Google's consent page.
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/auth";

    /// Calendar API v3 base URL.
    pub const DEFAULT_CALENDAR_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Directions API endpoint.
    pub const DEFAULT_DIRECTIONS_URL: &'static str =
        "https://maps.googleapis.com/maps/api/directions/json";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default scope: full calendar access, needed to insert events.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration with Google's production endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the consent page URL.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the Calendar API base URL.
    pub fn with_calendar_api_base(mut self, url: impl Into<String>) -> Self {
        self.calendar_api_base = url.into();
        self
    }

    /// Sets the Directions API endpoint.
    pub fn with_directions_url(mut self, url: impl Into<String>) -> Self {
        self.directions_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the retry policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enables or disables single-flight refresh.
    pub fn with_single_flight_refresh(mut self, enabled: bool) -> Self {
        self.single_flight_refresh = enabled;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        for (name, url) in [
            ("token_url", &self.token_url),
            ("auth_url", &self.auth_url),
            ("calendar_api_base", &self.calendar_api_base),
            ("directions_url", &self.directions_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| AuthError::configuration(format!("invalid {}: {}", name, e)))?;
        }

        if self.scopes.is_empty() {
            return Err(AuthError::configuration("at least one OAuth scope is required"));
        }

        if self.backoff.max_attempts == 0 {
            return Err(AuthError::configuration("backoff max_attempts must be at least 1"));
        }

        if self.backoff.initial_delay > self.backoff.max_delay {
            return Err(AuthError::configuration(
                "backoff initial_delay must not exceed max_delay",
            ));
        }

        Ok(())
    }

    /// Builds the shared HTTP client.
    pub fn http_client(&self) -> AuthResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {}", e)))
    }
}
