//! Token commands.

use chrono::{DateTime, Utc};
use serde::Serialize;

use gflow_google::{CredentialRecord, CredentialStore};

use crate::commands::{Context, print_json};
use crate::error::{CliError, CliResult};

/// What `gflow token status` reports. Never includes token values.
#[derive(Debug, Serialize)]
struct TokenStatus<'a> {
    account: &'a str,
    client_id: &'a str,
    expire_time: Option<DateTime<Utc>>,
    expired: bool,
    expires_in_secs: Option<i64>,
    has_refresh_token: bool,
    scopes: &'a [String],
}

impl<'a> TokenStatus<'a> {
    fn new(account: &'a str, record: &'a CredentialRecord) -> Self {
        Self {
            account,
            client_id: &record.client_id,
            expire_time: record.expire_time,
            expired: record.is_expired(),
            expires_in_secs: record.time_until_expiry().map(|d| d.num_seconds()),
            has_refresh_token: record.has_refresh_token(),
            scopes: &record.scopes,
        }
    }
}

/// Force a refresh-token exchange for the selected account.
pub async fn refresh(ctx: &Context) -> CliResult<()> {
    let session = ctx.session()?;
    session.tokens.refresh().await?;

    let record = session.tokens.record()?;
    match record.expire_time {
        Some(at) => println!("Access token refreshed, valid until {}.", at.to_rfc3339()),
        None => println!("Access token refreshed (no expiry reported)."),
    }
    Ok(())
}

/// Show expiry and scopes of the stored credential.
pub fn status(ctx: &Context, json: bool) -> CliResult<()> {
    let record = ctx.store().get(&ctx.account)?.ok_or_else(|| {
        CliError::AuthRequired(format!(
            "no credential stored for account '{}', run `gflow auth login`",
            ctx.account
        ))
    })?;
    let status = TokenStatus::new(&ctx.account, &record);

    if json {
        return print_json(&status);
    }

    println!("account:       {}", status.account);
    println!("client_id:     {}", status.client_id);
    match (status.expire_time, status.expires_in_secs) {
        (Some(at), Some(secs)) if !status.expired => {
            println!("expires:       {} (in {} min)", at.to_rfc3339(), secs / 60)
        }
        (Some(at), _) => println!("expires:       {} (expired)", at.to_rfc3339()),
        (None, _) => println!("expires:       unknown (refreshed on next use)"),
    }
    println!(
        "refresh token: {}",
        if status.has_refresh_token { "yes" } else { "no" }
    );
    println!("scopes:        {}", status.scopes.join(" "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use chrono::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn status_hides_secrets() {
        let record = CredentialRecord::new("id.apps.googleusercontent.com", "client-secret")
            .with_refresh_token("refresh-secret")
            .with_access_token("access-secret", Some(Utc::now() + Duration::minutes(30)));
        let status = TokenStatus::new("default", &record);

        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("secret"));
        assert!(!status.expired);
        assert!(status.has_refresh_token);
        assert!(status.expires_in_secs.unwrap() > 0);
    }

    #[test]
    fn status_without_credential_requires_login() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = CliConfig::default();
        config.google.credential_store = Some(dir.path().join("credentials.json"));
        let ctx = Context::new(config, None, false);

        let err = status(&ctx, false).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn refresh_updates_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "A2",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let mut config = CliConfig::default();
        config.google.credential_store = Some(dir.path().join("credentials.json"));
        config.google.token_url = Some(format!("{}/token", server.uri()));
        let ctx = Context::new(config, None, false);
        ctx.store()
            .put(
                "default",
                CredentialRecord::new("id.apps.googleusercontent.com", "secret")
                    .with_refresh_token("R1")
                    .with_access_token("A1", Some(Utc::now() - Duration::minutes(1))),
            )
            .unwrap();

        refresh(&ctx).await.unwrap();

        let record = ctx.store().get("default").unwrap().unwrap();
        assert!(!record.is_expired());
        assert!(record.has_refresh_token());
    }
}
