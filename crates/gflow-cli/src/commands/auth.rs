//! Authentication commands.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use gflow_google::{
    AuthorizationRequest, AuthorizationResponse, CredentialStore, OAuthClient, OAuthCredentials,
};

use crate::cli::ClientArgs;
use crate::commands::Context;
use crate::config::GoogleSettings;
use crate::error::{CliError, CliResult};

/// Run the interactive authorization-code flow.
///
/// Opens the consent page, reads the redirect URL (or bare code) the user
/// pastes back, and stores the resulting credential under the account id.
pub async fn login(
    ctx: &Context,
    client: ClientArgs,
    no_browser: bool,
    force: bool,
) -> CliResult<()> {
    let store = ctx.store();
    if store.get(&ctx.account)?.is_some() && !force {
        println!("Account '{}' is already authenticated.", ctx.account);
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    let oauth = oauth_client(ctx, &client)?;
    let redirect_uri = redirect_uri(ctx, &client);
    let request = oauth.authorization_request(&redirect_uri)?;

    println!("Open this URL to authorize access:");
    println!();
    println!("  {}", request.url);
    println!();
    if !no_browser && let Err(e) = open::that(&request.url) {
        warn!("could not open browser: {}", e);
    }

    println!("After approving, paste the URL you were redirected to (or just the code):");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    let pasted = line.trim();
    if pasted.is_empty() {
        return Err(CliError::InvalidArgument(
            "no authorization response given".to_string(),
        ));
    }

    let record = oauth.complete(&request, pasted).await?;
    store.put(&ctx.account, record)?;

    info!(account = %ctx.account, "credential stored");
    println!();
    println!("Authentication successful!");
    println!(
        "Credential for '{}' saved to {}",
        ctx.account,
        store.path().display()
    );
    Ok(())
}

/// Print a consent URL with the state and verifier needed by `auth exchange`.
pub fn url(ctx: &Context, client: ClientArgs) -> CliResult<()> {
    let oauth = oauth_client(ctx, &client)?;
    let request = oauth.authorization_request(&redirect_uri(ctx, &client))?;

    println!("url:      {}", request.url);
    println!("state:    {}", request.state);
    println!("verifier: {}", request.verifier);
    println!();
    println!(
        "Then run: gflow auth exchange --code '<redirect URL>' --verifier {} --state {}",
        request.verifier, request.state
    );
    Ok(())
}

/// Exchange an authorization code obtained out of band.
pub async fn exchange(
    ctx: &Context,
    client: ClientArgs,
    code: String,
    verifier: String,
    state: Option<String>,
) -> CliResult<()> {
    let oauth = oauth_client(ctx, &client)?;
    let redirect_uri = redirect_uri(ctx, &client);
    let response = AuthorizationResponse::parse(&code)?;

    if let Some(state) = state {
        let request = AuthorizationRequest {
            url: String::new(),
            state,
            verifier: verifier.clone(),
            redirect_uri: redirect_uri.clone(),
        };
        request.verify_state(response.state.as_deref())?;
    }

    let record = oauth
        .exchange_code(&response.code, &verifier, &redirect_uri)
        .await?;
    let store = ctx.store();
    store.put(&ctx.account, record)?;

    println!(
        "Credential for '{}' saved to {}",
        ctx.account,
        store.path().display()
    );
    Ok(())
}

/// Delete the stored credential of the selected account.
pub fn logout(ctx: &Context) -> CliResult<()> {
    if ctx.store().remove(&ctx.account)? {
        println!("Removed credential for '{}'.", ctx.account);
    } else {
        println!("No credential stored for '{}'.", ctx.account);
    }
    Ok(())
}

fn oauth_client(ctx: &Context, client: &ClientArgs) -> CliResult<OAuthClient> {
    let credentials = resolve_client_credentials(client, &ctx.config.google)?;
    credentials
        .validate()
        .map_err(|e| CliError::Config(format!("invalid Google credentials: {}", e)))?;
    Ok(OAuthClient::new(credentials, &ctx.google_config()?)?)
}

fn redirect_uri(ctx: &Context, client: &ClientArgs) -> String {
    client
        .redirect_uri
        .clone()
        .unwrap_or_else(|| ctx.config.google.redirect_uri.clone())
}

/// Resolves the OAuth client identity.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section
fn resolve_client_credentials(
    client: &ClientArgs,
    settings: &GoogleSettings,
) -> CliResult<OAuthCredentials> {
    match (&client.client_id, &client.client_secret) {
        (Some(id), Some(secret)) => return Ok(OAuthCredentials::new(id, secret)),
        (Some(_), None) | (None, Some(_)) => {
            return Err(CliError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(ref path) = client.credentials_file {
        return OAuthCredentials::from_file(path).map_err(|e| {
            CliError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        });
    }

    settings.resolve_credentials()
}
