//! Shared fixtures for adapter tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use wiremock::MockServer;

use crate::{
    AuthenticatedRequestDispatcher, BackoffPolicy, CredentialRecord, GoogleConfig,
    MemoryCredentialStore, TokenManager,
};

/// A dispatcher holding a valid token, retrying fast against `server`.
pub fn dispatcher_for(server: &MockServer) -> Arc<AuthenticatedRequestDispatcher> {
    let config = GoogleConfig::new()
        .with_token_url(format!("{}/o/oauth2/token", server.uri()))
        .with_backoff(BackoffPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(10),
            2,
            3,
        ));
    let record = CredentialRecord::new("client-id", "client-secret")
        .with_refresh_token("REFRESH")
        .with_access_token("VALID", Some(Utc::now() + ChronoDuration::hours(1)));
    let store = Arc::new(MemoryCredentialStore::with_record("google", record));
    let tokens = Arc::new(TokenManager::new("google", store, &config).unwrap());
    Arc::new(AuthenticatedRequestDispatcher::new(tokens, &config).unwrap())
}
