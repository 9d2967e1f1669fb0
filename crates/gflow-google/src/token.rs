//! Access token lifecycle.
//!
//! [`TokenManager`] keeps the access token of one stored credential current by
//! exchanging its refresh token at the token endpoint. Each exchange attempt
//! that fails is retried with the configured [`BackoffPolicy`].

use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::backoff::BackoffPolicy;
use crate::config::GoogleConfig;
use crate::credential::{CredentialRecord, CredentialStore};
use crate::error::{AuthError, AuthResult};
use crate::events::{RetryNotifier, RetryOperation};

/// Successful response from the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Splits the space-delimited `scope` field.
    pub fn scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Performs one token-endpoint exchange.
///
/// Every failure, including transport errors, is reported as
/// [`AuthError::TokenExchangeFailed`] so the caller may retry it.
pub(crate) async fn request_token(
    http_client: &reqwest::Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> AuthResult<TokenResponse> {
    let response = http_client
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|e| AuthError::token_exchange(format!("token request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::token_exchange(format!("failed to read token response: {}", e)))?;

    if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
        return Err(AuthError::token_exchange(match err.error_description {
            Some(description) => format!("{} ({}): {}", err.error, status, description),
            None => format!("{} ({})", err.error, status),
        }));
    }

    if !status.is_success() {
        return Err(AuthError::token_exchange(format!(
            "token endpoint returned {}",
            status
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| AuthError::token_exchange(format!("invalid token response: {}", e)))?;

    if token.access_token.is_empty() {
        return Err(AuthError::token_exchange("token response has an empty access_token"));
    }

    Ok(token)
}

/// Keeps the access token of one stored credential current.
pub struct TokenManager {
    credential_id: String,
    store: Arc<dyn CredentialStore>,
    http_client: reqwest::Client,
    token_url: String,
    backoff: BackoffPolicy,
    notifier: RetryNotifier,
    /// Present when concurrent refreshes are coalesced.
    refresh_gate: Option<Mutex<()>>,
}

impl TokenManager {
    /// Creates a manager for the credential stored under `credential_id`.
    pub fn new(
        credential_id: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        config: &GoogleConfig,
    ) -> AuthResult<Self> {
        Ok(Self {
            credential_id: credential_id.into(),
            store,
            http_client: config.http_client()?,
            token_url: config.token_url.clone(),
            backoff: config.backoff.clone(),
            notifier: RetryNotifier::none(),
            refresh_gate: config.single_flight_refresh.then(|| Mutex::new(())),
        })
    }

    /// Builder: set the retry listener.
    pub fn with_notifier(mut self, notifier: RetryNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Builder: use an existing HTTP client.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Returns the id of the managed credential.
    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }

    /// Returns the shared credential store.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Reads the current record from the store.
    pub fn record(&self) -> AuthResult<CredentialRecord> {
        self.store
            .get(&self.credential_id)?
            .ok_or_else(|| AuthError::credential_not_found(&self.credential_id))
    }

    /// Refreshes the access token if it is expired or has no known expiry.
    pub async fn ensure_fresh(&self) -> AuthResult<()> {
        if self.record()?.is_expired() {
            debug!(credential = %self.credential_id, "access token expired");
            self.refresh().await?;
        }
        Ok(())
    }

    /// Exchanges the refresh token for a new access token and stores it.
    ///
    /// Fails with [`AuthError::NoRefreshToken`] without any network call when
    /// the record has no refresh token, and with
    /// [`AuthError::TooManyRefreshAttempts`] once the retry budget is spent.
    #[instrument(skip(self), fields(credential = %self.credential_id))]
    pub async fn refresh(&self) -> AuthResult<()> {
        let Some(ref gate) = self.refresh_gate else {
            return self.refresh_now().await;
        };

        let observed = self.record()?.expire_time;
        let _guard = gate.lock().await;

        let current = self.record()?;
        if current.expire_time != observed && !current.is_expired() {
            debug!("access token already renewed by a concurrent refresh");
            return Ok(());
        }

        self.refresh_now().await
    }

    async fn refresh_now(&self) -> AuthResult<()> {
        let record = self.record()?;
        if !record.has_refresh_token() {
            return Err(AuthError::NoRefreshToken);
        }
        let refresh_token = record
            .refresh_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .unwrap_or_default();

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", record.client_id.as_str()),
            ("client_secret", record.client_secret.expose_secret().as_str()),
            ("refresh_token", refresh_token),
        ];

        debug!("requesting new access token");
        let token = self
            .backoff
            .run(RetryOperation::TokenRefresh, &self.notifier, |_| {
                request_token(&self.http_client, &self.token_url, &params)
            })
            .await?;
        let issued_at = Utc::now();

        // Apply to the latest stored state so a concurrent rotation is kept.
        let mut updated = self
            .store
            .get(&self.credential_id)?
            .unwrap_or_else(|| record.clone());
        let scopes = token.scopes();
        let rotated = token.refresh_token.is_some();
        updated.apply_grant(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            issued_at,
        )?;
        if let Some(scopes) = scopes {
            updated.scopes = scopes;
        }
        self.store.put(&self.credential_id, updated)?;

        info!(
            expires_in = token.expires_in,
            rotated, "access token refreshed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credential_id", &self.credential_id)
            .field("token_url", &self.token_url)
            .field("backoff", &self.backoff)
            .field("single_flight", &self.refresh_gate.is_some())
            .finish()
    }
}
