//! Command implementations.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod directions;
pub mod request;
pub mod token;

use std::sync::Arc;

use gflow_google::{
    AuthenticatedRequestDispatcher, CredentialStore, GoogleConfig, RetryEvent, RetryNotifier,
    TokenManager,
};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::store::FileCredentialStore;

/// State shared by every command: loaded config plus global flags.
#[derive(Debug)]
pub struct Context {
    pub config: CliConfig,
    pub account: String,
    pub show_retries: bool,
}

/// Objects needed to talk to Google on behalf of the selected account.
#[derive(Debug)]
pub struct Session {
    pub google: GoogleConfig,
    pub tokens: Arc<TokenManager>,
    pub dispatcher: Arc<AuthenticatedRequestDispatcher>,
}

impl Context {
    /// Creates a context. `account` overrides `google.account` from the config.
    pub fn new(config: CliConfig, account: Option<String>, show_retries: bool) -> Self {
        let account = account.unwrap_or_else(|| config.google.account.clone());
        Self {
            config,
            account,
            show_retries,
        }
    }

    /// Opens the credential store.
    pub fn store(&self) -> Arc<FileCredentialStore> {
        Arc::new(FileCredentialStore::new(self.config.credential_store_path()))
    }

    /// Builds the library configuration.
    pub fn google_config(&self) -> CliResult<GoogleConfig> {
        self.config.google_config()
    }

    /// Returns a notifier printing retries on stderr when `--show-retries` is set.
    pub fn notifier(&self) -> RetryNotifier {
        if !self.show_retries {
            return RetryNotifier::none();
        }
        RetryNotifier::new(Arc::new(|event: &RetryEvent| {
            eprintln!("{}", describe_retry(event));
        }))
    }

    /// Builds the token manager and dispatcher for the selected account.
    ///
    /// Fails with [`CliError::AuthRequired`] when nothing is stored yet.
    pub fn session(&self) -> CliResult<Session> {
        let google = self.google_config()?;
        let store = self.store();
        if store.get(&self.account)?.is_none() {
            return Err(CliError::AuthRequired(format!(
                "no credential stored for account '{}', run `gflow auth login`",
                self.account
            )));
        }

        let notifier = self.notifier();
        let store: Arc<dyn CredentialStore> = store;
        let tokens = Arc::new(
            TokenManager::new(&self.account, store, &google)?.with_notifier(notifier.clone()),
        );
        let dispatcher = Arc::new(
            AuthenticatedRequestDispatcher::new(Arc::clone(&tokens), &google)?
                .with_notifier(notifier),
        );

        Ok(Session {
            google,
            tokens,
            dispatcher,
        })
    }
}

fn describe_retry(event: &RetryEvent) -> String {
    format!(
        "retrying {} in {} ms (attempt {}): {}",
        event.operation,
        event.delay_ms(),
        event.attempt,
        event.reason
    )
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::InvalidArgument(format!("failed to render JSON: {}", e)))?;
    println!("{}", text);
    Ok(())
}
