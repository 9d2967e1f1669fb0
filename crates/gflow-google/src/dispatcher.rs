//! Authenticated request dispatch.
//!
//! [`AuthenticatedRequestDispatcher::send`] runs one logical request through
//! three stages:
//!
//! 1. refresh the access token if it is expired,
//! 2. send with backoff, reading the current bearer token at every attempt,
//! 3. on an authentication rejection, refresh once and resend with a fresh
//!    backoff budget. A second rejection is terminal.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::backoff::BackoffPolicy;
use crate::config::GoogleConfig;
use crate::error::{AuthError, AuthResult};
use crate::events::{RetryNotifier, RetryOperation};
use crate::token::TokenManager;

/// Body of a [`PendingRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(Value),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
}

/// An API call waiting to be authenticated and sent.
///
/// The bearer token is never part of the request; the dispatcher attaches it
/// at send time.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// HTTP method, GET unless set otherwise.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Extra headers. An `Authorization` entry is ignored; the bearer token is
    /// always taken from the store.
    pub headers: Vec<(String, String)>,
}

impl PendingRequest {
    /// Creates a GET request.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: Vec::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Creates a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).with_method(Method::POST)
    }

    /// Builder: set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Builder: append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Builder: append a query parameter when `value` is present.
    pub fn with_optional_query(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Builder: send a JSON body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Builder: send a form body.
    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    /// Builder: add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Error object returned in Google API bodies: `{"error": {"code", "message"}}`.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: u16,
    #[serde(default)]
    message: String,
}

impl ProviderError {
    fn from_body(body: &Value) -> Option<Self> {
        ProviderErrorBody::deserialize(body).ok().map(|b| b.error)
    }
}

/// Result of one backoff-wrapped dispatch.
#[derive(Debug)]
enum Outcome {
    /// The target accepted the request.
    Done(Value),
    /// The target rejected the bearer token.
    Rejected(String),
}

/// Sends requests on behalf of one stored credential.
pub struct AuthenticatedRequestDispatcher {
    tokens: Arc<TokenManager>,
    http_client: reqwest::Client,
    backoff: BackoffPolicy,
    notifier: RetryNotifier,
}

impl AuthenticatedRequestDispatcher {
    /// Creates a dispatcher sharing `tokens` with other callers.
    pub fn new(tokens: Arc<TokenManager>, config: &GoogleConfig) -> AuthResult<Self> {
        Ok(Self {
            tokens,
            http_client: config.http_client()?,
            backoff: config.backoff.clone(),
            notifier: RetryNotifier::none(),
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

    /// Returns the token manager.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Sends `request` and returns the decoded JSON body.
    ///
    /// An empty body decodes to `Value::Null`; a body that is not JSON is
    /// returned as a string.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: &PendingRequest) -> AuthResult<Value> {
        self.tokens.ensure_fresh().await?;

        let message = match self.dispatch(request).await? {
            Outcome::Done(body) => return Ok(body),
            Outcome::Rejected(message) => message,
        };

        info!(reason = %message, "access token rejected, reauthenticating");
        self.tokens.refresh().await?;

        match self.dispatch(request).await? {
            Outcome::Done(body) => Ok(body),
            Outcome::Rejected(message) => {
                warn!(reason = %message, "access token rejected after reauthentication");
                Err(AuthError::unauthorized(message))
            }
        }
    }

    /// Sends `request` and deserializes the response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &PendingRequest) -> AuthResult<T> {
        let body = self.send(request).await?;
        serde_json::from_value(body)
            .map_err(|e| AuthError::invalid_response(format!("failed to decode response: {}", e)))
    }

    async fn dispatch(&self, request: &PendingRequest) -> AuthResult<Outcome> {
        self.backoff
            .run(RetryOperation::Dispatch, &self.notifier, |attempt| {
                self.attempt(request, attempt)
            })
            .await
    }

    async fn attempt(&self, request: &PendingRequest, attempt: u32) -> AuthResult<Outcome> {
        // Read the record again so a token refreshed elsewhere is picked up.
        let record = self.tokens.record()?;

        let mut builder = self
            .http_client
            .request(request.method.clone(), &request.url)
            .header(ACCEPT, "application/json");
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.header(AUTHORIZATION, record.bearer_header());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(ref body) => builder.json(body),
            RequestBody::Form(ref fields) => builder.form(fields),
        };

        debug!(attempt, "sending request");
        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                AuthError::configuration(format!("invalid request: {}", e.without_url()))
            } else {
                AuthError::transport("request failed", e)
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::transport("failed to read response", e))?;

        classify(status, decode_body(&text))
    }
}

impl std::fmt::Debug for AuthenticatedRequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedRequestDispatcher")
            .field("tokens", &self.tokens)
            .field("backoff", &self.backoff)
            .finish()
    }
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Maps a response to an outcome.
///
/// An error object with code 401 means the token was rejected, whatever the
/// HTTP status. Any other error status or error object is a failed attempt.
fn classify(status: StatusCode, body: Value) -> AuthResult<Outcome> {
    let provider_error = ProviderError::from_body(&body);

    if let Some(ref err) = provider_error
        && err.code == StatusCode::UNAUTHORIZED.as_u16()
    {
        return Ok(Outcome::Rejected(if err.message.is_empty() {
            "invalid credentials".to_string()
        } else {
            err.message.clone()
        }));
    }

    if !status.is_success() {
        let message = provider_error
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .or_else(|| status.canonical_reason().map(String::from))
            .unwrap_or_else(|| "request failed".to_string());
        return Err(AuthError::Http {
            code: status.as_u16(),
            message,
            body: (!body.is_null()).then_some(body),
        });
    }

    if let Some(err) = provider_error {
        return Err(AuthError::Http {
            code: err.code,
            message: err.message,
            body: Some(body),
        });
    }

    Ok(Outcome::Done(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, Utc};
    use secrecy::ExposeSecret;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::credential::{CredentialRecord, CredentialStore, MemoryCredentialStore};

    const ID: &str = "google";
    const TOKEN_PATH: &str = "/o/oauth2/token";
    const TARGET_PATH: &str = "/calendar/v3/users/me/calendarList";

    struct Harness {
        server: MockServer,
        store: Arc<MemoryCredentialStore>,
        dispatcher: AuthenticatedRequestDispatcher,
        events: tokio::sync::mpsc::UnboundedReceiver<crate::events::RetryEvent>,
    }

    impl Harness {
        async fn new(record: CredentialRecord) -> Self {
            let server = MockServer::start().await;
            let config = GoogleConfig::new()
                .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH))
                .with_backoff(BackoffPolicy::new(
                    Duration::from_millis(1),
                    Duration::from_millis(100),
                    9,
                    4,
                ));
            let store = Arc::new(MemoryCredentialStore::with_record(ID, record));
            let tokens = Arc::new(TokenManager::new(ID, store.clone(), &config).unwrap());
            let (notifier, events) = RetryNotifier::channel();
            let dispatcher = AuthenticatedRequestDispatcher::new(tokens, &config)
                .unwrap()
                .with_notifier(notifier);
            Self {
                server,
                store,
                dispatcher,
                events,
            }
        }

        fn target(&self) -> PendingRequest {
            PendingRequest::get(format!("{}{}", self.server.uri(), TARGET_PATH))
        }

        fn drain_events(&mut self) -> Vec<crate::events::RetryEvent> {
            std::iter::from_fn(|| self.events.try_recv().ok()).collect()
        }

        async fn paths(&self) -> Vec<String> {
            self.server
                .received_requests()
                .await
                .unwrap_or_default()
                .into_iter()
                .map(|r| r.url.path().to_string())
                .collect()
        }
    }

    fn fresh_record(token: &str) -> CredentialRecord {
        CredentialRecord::new("client-id", "client-secret")
            .with_refresh_token("REFRESH")
            .with_access_token(token, Some(Utc::now() + ChronoDuration::hours(1)))
    }

    fn expired_record(token: &str) -> CredentialRecord {
        CredentialRecord::new("client-id", "client-secret")
            .with_refresh_token("REFRESH")
            .with_access_token(token, Some(Utc::now() - ChronoDuration::minutes(5)))
    }

    fn token_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 3600
        }))
    }

    fn unauthorized_body() -> ResponseTemplate {
        ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "Invalid Credentials"}
        }))
    }

    #[tokio::test]
    async fn valid_token_is_sent_without_refresh() {
        let mut h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("unused"))
            .expect(0)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .and(header("authorization", "Bearer VALID"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&h.server)
            .await;

        let body = h.dispatcher.send(&h.target()).await.unwrap();
        assert_eq!(body, json!({"items": []}));
        assert!(h.drain_events().is_empty());
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_sending() {
        let h = Harness::new(expired_record("OLD")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("A1"))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&h.server)
            .await;

        h.dispatcher.send(&h.target()).await.unwrap();
        assert_eq!(h.paths().await, vec![TOKEN_PATH, TARGET_PATH]);
    }

    #[tokio::test]
    async fn refresh_sets_expiry_and_next_send_skips_it() {
        let h = Harness::new(expired_record("OLD")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("A1"))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(2)
            .mount(&h.server)
            .await;

        let before = Utc::now();
        h.dispatcher.send(&h.target()).await.unwrap();
        let after = Utc::now();

        let record = h.store.get(ID).unwrap().unwrap();
        let expire_time = record.expire_time.unwrap();
        assert!(expire_time >= before + ChronoDuration::seconds(3600));
        assert!(expire_time <= after + ChronoDuration::seconds(3600));

        h.dispatcher.send(&h.target()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_refresh_is_surfaced_without_sending() {
        let record = CredentialRecord::new("client-id", "client-secret");
        let h = Harness::new(record).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&h.server)
            .await;

        let err = h.dispatcher.send(&h.target()).await.unwrap_err();
        assert!(matches!(err, AuthError::NoRefreshToken));
    }

    #[tokio::test]
    async fn server_errors_are_retried_with_backoff() {
        let mut h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(3)
            .expect(3)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"attempt": 4})))
            .expect(1)
            .mount(&h.server)
            .await;

        let body = h.dispatcher.send(&h.target()).await.unwrap();
        assert_eq!(body["attempt"], 4);

        let events = h.drain_events();
        assert_eq!(
            events.iter().map(|e| e.delay).collect::<Vec<_>>(),
            vec![
                Duration::from_millis(1),
                Duration::from_millis(9),
                Duration::from_millis(81),
            ]
        );
        assert!(events.iter().all(|e| e.operation == RetryOperation::Dispatch));
    }

    #[tokio::test]
    async fn persistent_errors_exhaust_the_budget() {
        let h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": {"code": 503, "message": "Backend Error"}
            })))
            .expect(4)
            .mount(&h.server)
            .await;

        let err = h.dispatcher.send(&h.target()).await.unwrap_err();
        assert_eq!(err.kind(), crate::AuthErrorKind::TooManyRefreshAttempts);
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.body().unwrap()["error"]["message"], "Backend Error");
    }

    #[tokio::test]
    async fn rejected_token_is_refreshed_once_and_resent() {
        let h = Harness::new(fresh_record("REVOKED")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("NEW"))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .and(header("authorization", "Bearer REVOKED"))
            .respond_with(unauthorized_body())
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .and(header("authorization", "Bearer NEW"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&h.server)
            .await;

        let body = h.dispatcher.send(&h.target()).await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(
            h.store.get(ID).unwrap().unwrap().access_token.expose_secret(),
            "NEW"
        );
    }

    #[tokio::test]
    async fn second_rejection_is_unauthorized() {
        let h = Harness::new(fresh_record("REVOKED")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("STILL-BAD"))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(unauthorized_body())
            .expect(2)
            .mount(&h.server)
            .await;

        let err = h.dispatcher.send(&h.target()).await.unwrap_err();
        match err {
            AuthError::Unauthorized { message } => assert_eq!(message, "Invalid Credentials"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_object_in_success_body_triggers_reauthentication() {
        let h = Harness::new(fresh_record("REVOKED")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("NEW"))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer REVOKED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": 401, "message": "Login Required"}
            })))
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer NEW"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&h.server)
            .await;

        h.dispatcher.send(&h.target()).await.unwrap();
    }

    #[tokio::test]
    async fn bare_401_is_retried_without_reauthentication() {
        let h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(token_response("unused"))
            .expect(0)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(4)
            .mount(&h.server)
            .await;

        let err = h.dispatcher.send(&h.target()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.kind(), crate::AuthErrorKind::TooManyRefreshAttempts);
    }

    #[tokio::test]
    async fn refresh_failure_during_reauthentication_is_surfaced() {
        let h = Harness::new(fresh_record("REVOKED")).await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .expect(4)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(unauthorized_body())
            .expect(1)
            .mount(&h.server)
            .await;

        let err = h.dispatcher.send(&h.target()).await.unwrap_err();
        match err {
            AuthError::TooManyRefreshAttempts { last_error, .. } => {
                assert!(matches!(*last_error, AuthError::TokenExchangeFailed { .. }))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn post_with_query_and_json_body() {
        let h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("POST"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(query_param("sendUpdates", "all"))
            .and(header("x-custom", "1"))
            .and(body_json(json!({"summary": "Standup"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt1"})))
            .expect(1)
            .mount(&h.server)
            .await;

        let request = PendingRequest::post(format!(
            "{}/calendar/v3/calendars/primary/events",
            h.server.uri()
        ))
        .with_query("sendUpdates", "all")
        .with_header("x-custom", "1")
        .with_json(json!({"summary": "Standup"}));

        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = h.dispatcher.send_json(&request).await.unwrap();
        assert_eq!(created.id, "evt1");
    }

    #[tokio::test]
    async fn caller_authorization_header_is_replaced_by_stored_token() {
        let h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&h.server)
            .await;

        let request = h.target().with_header("Authorization", "Bearer STALE");
        h.dispatcher.send(&request).await.unwrap();

        let received = h.server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 1);
        let values: Vec<_> = received[0]
            .headers
            .get_all("authorization")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["Bearer VALID"]);
    }

    #[tokio::test]
    async fn malformed_header_fails_without_retrying() {
        let mut h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("GET"))
            .and(path(TARGET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&h.server)
            .await;

        let request = h.target().with_header("bad header", "1");
        let err = h.dispatcher.send(&request).await.unwrap_err();
        assert_eq!(err.kind(), crate::AuthErrorKind::ConfigurationError);
        assert!(h.paths().await.is_empty());
        assert!(h.drain_events().is_empty());
    }

    #[tokio::test]
    async fn empty_and_text_bodies_are_decoded() {
        let h = Harness::new(fresh_record("VALID")).await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain"))
            .mount(&h.server)
            .await;

        let deleted = h
            .dispatcher
            .send(&h.target().with_method(Method::DELETE))
            .await
            .unwrap();
        assert!(deleted.is_null());

        let text = h.dispatcher.send(&h.target()).await.unwrap();
        assert_eq!(text, Value::String("plain".into()));
    }

    #[test]
    fn classify_success_body() {
        let outcome = classify(StatusCode::OK, json!({"items": [1]})).unwrap();
        assert!(matches!(outcome, Outcome::Done(_)));
    }

    #[test]
    fn classify_error_object_in_success_body() {
        let err = classify(
            StatusCode::OK,
            json!({"error": {"code": 403, "message": "Rate Limit Exceeded"}}),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_error_status_without_body() {
        let err = classify(StatusCode::BAD_GATEWAY, Value::Null).unwrap_err();
        match err {
            AuthError::Http { code, message, body } => {
                assert_eq!(code, 502);
                assert_eq!(message, "Bad Gateway");
                assert!(body.is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn pending_request_defaults_to_get() {
        let request = PendingRequest::new("https://example.com")
            .with_optional_query("a", Some(1))
            .with_optional_query("b", None::<&str>);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.query, vec![("a".to_string(), "1".to_string())]);
        assert_eq!(request.body, RequestBody::Empty);
    }
}
