//! Credential records and the store contract.
//!
//! A [`CredentialRecord`] is owned by the host through a [`CredentialStore`].
//! The token manager and the dispatcher hold the same store handle and read the
//! record again at every attempt, so a refresh performed by one caller is seen
//! by all of them and a replaced access token is never reused.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use gflow_core::expiry_after;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AuthError, AuthResult};

/// OAuth credential state for one configured account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// OAuth client ID.
    pub client_id: String,

    /// OAuth client secret.
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: SecretString,

    /// Current bearer token. Empty until the first exchange.
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: SecretString,

    /// Long-lived token used to obtain new access tokens.
    #[serde(default, serialize_with = "serialize_option_secret")]
    pub refresh_token: Option<SecretString>,

    /// When the access token expires. Stored as seconds since the epoch.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expire_time: Option<DateTime<Utc>>,

    /// Scopes granted with the current tokens.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl CredentialRecord {
    /// Creates a record holding only the client identity.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            access_token: SecretString::new(String::new()),
            refresh_token: None,
            expire_time: None,
            scopes: Vec::new(),
        }
    }

    /// Builder: set the refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::new(token.into()));
        self
    }

    /// Builder: set the access token and its expiry.
    pub fn with_access_token(
        mut self,
        token: impl Into<String>,
        expire_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.access_token = SecretString::new(token.into());
        self.expire_time = expire_time;
        self
    }

    /// Builder: set the granted scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Returns true if the access token must be refreshed before use at `now`:
    /// either no expiry is known or it lies in the past.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expire_time {
            Some(expire_time) => expire_time < now,
            None => true,
        }
    }

    /// Returns true if the access token must be refreshed before use.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if a refresh token is present and non-empty.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }

    /// Returns the time left before expiry, if known.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expire_time.map(|expire_time| expire_time - Utc::now())
    }

    /// Applies a successful token exchange issued at `issued_at`.
    ///
    /// The access token is always replaced. The refresh token is only replaced
    /// when the provider rotated it. An `expires_in` that cannot be turned into
    /// a timestamp is rejected and leaves the record untouched.
    pub fn apply_grant(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        issued_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let expire_time = match expires_in_secs {
            Some(secs) => Some(expiry_after(issued_at, secs).ok_or_else(|| {
                AuthError::invalid_response(format!("expires_in out of range: {}", secs))
            })?),
            None => None,
        };

        self.access_token = SecretString::new(access_token);
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(SecretString::new(refresh_token));
        }
        self.expire_time = expire_time;
        Ok(())
    }

    /// Formats the `Authorization` header value for the current token.
    pub(crate) fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

/// Serializes a secret in the clear. Only used when persisting records.
pub fn serialize_secret<S: Serializer>(secret: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(secret.expose_secret())
}

/// Serializes an optional secret in the clear.
pub fn serialize_option_secret<S: Serializer>(
    secret: &Option<SecretString>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => s.serialize_some(secret.expose_secret()),
        None => s.serialize_none(),
    }
}

/// Storage for credential records, supplied by the host.
///
/// Implementations must store the full record on `put`; readers never see a
/// partially updated record.
pub trait CredentialStore: Send + Sync {
    /// Returns the record stored under `id`, if any.
    fn get(&self, id: &str) -> AuthResult<Option<CredentialRecord>>;

    /// Replaces the record stored under `id`.
    fn put(&self, id: &str, record: CredentialRecord) -> AuthResult<()>;
}

/// In-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one record.
    pub fn with_record(id: impl Into<String>, record: CredentialRecord) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.write() {
            records.insert(id.into(), record);
        }
        store
    }

    /// Returns the ids of all stored records.
    pub fn ids(&self) -> Vec<String> {
        self.records
            .read()
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, id: &str) -> AuthResult<Option<CredentialRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| AuthError::store("credential store lock poisoned"))?;
        Ok(records.get(id).cloned())
    }

    fn put(&self, id: &str, record: CredentialRecord) -> AuthResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| AuthError::store("credential store lock poisoned"))?;
        records.insert(id.to_string(), record);
        Ok(())
    }
}
