//! Authorization-code flow with PKCE.
//!
//! The host shows [`AuthorizationRequest::url`] to the user, receives the
//! redirect back (or just the code), and hands it to
//! [`OAuthClient::exchange_code`]. The resulting [`CredentialRecord`] is the
//! host's to store.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::config::{GoogleConfig, OAuthCredentials};
use crate::credential::CredentialRecord;
use crate::error::{AuthError, AuthResult};
use crate::token::request_token;

/// Bytes of entropy in the PKCE verifier (43 characters once encoded).
const VERIFIER_BYTES: usize = 32;

/// Bytes of entropy in the CSRF state.
const STATE_BYTES: usize = 16;

/// A consent URL and the values needed to complete it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL the user opens in a browser.
    pub url: String,
    /// CSRF token that must come back unchanged with the redirect.
    pub state: String,
    /// PKCE verifier sent with the code exchange.
    pub verifier: String,
    /// Redirect URI the code is bound to.
    pub redirect_uri: String,
}

impl AuthorizationRequest {
    /// Checks the `state` returned with the redirect.
    pub fn verify_state(&self, received: Option<&str>) -> AuthResult<()> {
        match received {
            Some(state) if state == self.state => Ok(()),
            Some(_) => Err(AuthError::configuration(
                "OAuth state mismatch, possible CSRF attack",
            )),
            None => Err(AuthError::configuration("redirect is missing the OAuth state")),
        }
    }
}

/// Code and state extracted from a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// The authorization code.
    pub code: String,
    /// The returned state, if the redirect carried one.
    pub state: Option<String>,
    /// Whether the input was a full redirect URL rather than a bare code.
    pub from_redirect: bool,
}

impl AuthorizationResponse {
    /// Parses what the user pasted back: either the full redirect URL or the
    /// bare authorization code.
    pub fn parse(input: &str) -> AuthResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AuthError::configuration("authorization code is empty"));
        }

        let Ok(url) = Url::parse(input) else {
            return Ok(Self {
                code: input.to_string(),
                state: None,
                from_redirect: false,
            });
        };

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => {
                    return Err(AuthError::configuration(format!(
                        "authorization denied: {}",
                        value
                    )));
                }
                _ => {}
            }
        }

        match code {
            Some(code) if !code.is_empty() => Ok(Self {
                code,
                state,
                from_redirect: true,
            }),
            _ => Err(AuthError::configuration(
                "redirect URL has no authorization code",
            )),
        }
    }
}

/// Starts and completes the authorization-code flow.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    auth_url: String,
    token_url: String,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client for `credentials` using the endpoints in `config`.
    pub fn new(credentials: OAuthCredentials, config: &GoogleConfig) -> AuthResult<Self> {
        Ok(Self {
            credentials,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            scopes: config.scopes.clone(),
            http_client: config.http_client()?,
        })
    }

    /// Builds a consent URL with fresh state and PKCE verifier.
    pub fn authorization_request(&self, redirect_uri: &str) -> AuthResult<AuthorizationRequest> {
        let verifier = random_token(VERIFIER_BYTES);
        let state = random_token(STATE_BYTES);

        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| AuthError::configuration(format!("invalid auth_url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("code_challenge", &code_challenge(&verifier))
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
            verifier,
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Exchanges an authorization code for a new credential record.
    ///
    /// Codes are single-use, so the exchange is not retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> AuthResult<CredentialRecord> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ];

        debug!("exchanging authorization code");
        let token = request_token(&self.http_client, &self.token_url, &params).await?;
        let issued_at = Utc::now();

        if token.refresh_token.as_deref().is_none_or(str::is_empty) {
            return Err(AuthError::token_exchange(
                "no refresh token returned, revoke the app's access and authorize again",
            ));
        }

        let scopes = token.scopes().unwrap_or_else(|| self.scopes.clone());
        let mut record = self.credentials.to_record().with_scopes(scopes);
        record.apply_grant(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            issued_at,
        )?;

        info!("authorization completed");
        Ok(record)
    }

    /// Completes the flow from what the user pasted back.
    ///
    /// A redirect URL must carry the state issued with `request`. A bare code
    /// has nothing to check and is exchanged as is.
    pub async fn complete(
        &self,
        request: &AuthorizationRequest,
        pasted: &str,
    ) -> AuthResult<CredentialRecord> {
        let response = AuthorizationResponse::parse(pasted)?;
        if response.from_redirect {
            request.verify_state(response.state.as_deref())?;
        }
        self.exchange_code(&response.code, &request.verifier, &request.redirect_uri)
            .await
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// S256 challenge for a PKCE verifier.
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REDIRECT: &str = "http://127.0.0.1:8085/callback";

    fn client(config: &GoogleConfig) -> OAuthClient {
        OAuthClient::new(
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret"),
            config,
        )
        .unwrap()
    }

    #[test]
    fn authorization_url_has_required_parameters() {
        let request = client(&GoogleConfig::new())
            .authorization_request(REDIRECT)
            .unwrap();

        assert!(request.url.starts_with(GoogleConfig::DEFAULT_AUTH_URL));
        let url = Url::parse(&request.url).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "test-client.apps.googleusercontent.com");
        assert_eq!(pairs["redirect_uri"], REDIRECT);
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], GoogleConfig::DEFAULT_SCOPE);
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["code_challenge"], code_challenge(&request.verifier));
        assert_eq!(pairs["state"], request.state);
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["prompt"], "consent");
    }

    #[test]
    fn state_and_verifier_are_random() {
        let client = client(&GoogleConfig::new());
        let a = client.authorization_request(REDIRECT).unwrap();
        let b = client.authorization_request(REDIRECT).unwrap();
        assert_ne!(a.state, b.state);
        assert_ne!(a.verifier, b.verifier);
        assert_eq!(a.verifier.len(), 43);
    }

    #[test]
    fn challenge_matches_rfc7636_example() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn parse_redirect_url() {
        let response =
            AuthorizationResponse::parse(" http://127.0.0.1:8085/callback?code=4%2Fabc&state=xyz\n")
                .unwrap();
        assert_eq!(response.code, "4/abc");
        assert_eq!(response.state.as_deref(), Some("xyz"));
        assert!(response.from_redirect);
    }

    #[test]
    fn parse_bare_code() {
        let response = AuthorizationResponse::parse("4/bare-code").unwrap();
        assert_eq!(response.code, "4/bare-code");
        assert!(response.state.is_none());
        assert!(!response.from_redirect);
    }

    #[test]
    fn parse_denied_and_empty() {
        let err = AuthorizationResponse::parse("http://localhost/cb?error=access_denied").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
        assert!(AuthorizationResponse::parse("   ").is_err());
        assert!(AuthorizationResponse::parse("http://localhost/cb?state=x").is_err());
    }

    #[test]
    fn verify_state() {
        let request = client(&GoogleConfig::new())
            .authorization_request(REDIRECT)
            .unwrap();
        assert!(request.verify_state(Some(&request.state)).is_ok());
        assert!(request.verify_state(Some("forged")).is_err());
        assert!(request.verify_state(None).is_err());
    }

    #[tokio::test]
    async fn exchange_code_builds_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "A1",
                "refresh_token": "R1",
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/calendar",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = GoogleConfig::new().with_token_url(format!("{}/token", server.uri()));
        let record = client(&config)
            .exchange_code("the-code", "the-verifier", REDIRECT)
            .await
            .unwrap();

        assert_eq!(record.client_id, "test-client.apps.googleusercontent.com");
        assert_eq!(record.access_token.expose_secret(), "A1");
        assert_eq!(record.refresh_token.unwrap().expose_secret(), "R1");
        assert!(record.expire_time.is_some());
        assert_eq!(record.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
    }

    #[tokio::test]
    async fn exchange_without_refresh_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "A1",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = GoogleConfig::new().with_token_url(server.uri());
        let err = client(&config)
            .exchange_code("code", "verifier", REDIRECT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no refresh token"));
    }

    #[tokio::test]
    async fn complete_rejects_forged_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = GoogleConfig::new().with_token_url(server.uri());
        let client = client(&config);
        let request = client.authorization_request(REDIRECT).unwrap();

        let err = client
            .complete(&request, "http://127.0.0.1:8085/callback?code=c&state=forged")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("state mismatch"));
    }

    #[tokio::test]
    async fn complete_rejects_redirect_without_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = GoogleConfig::new().with_token_url(server.uri());
        let client = client(&config);
        let request = client.authorization_request(REDIRECT).unwrap();

        let err = client
            .complete(&request, "http://127.0.0.1:8085/callback?code=ATTACKER_CODE")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing the OAuth state"));
    }
}
