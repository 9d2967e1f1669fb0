//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/gflow/config.toml` by default.
//!
//! Secret values (`client_id`, `client_secret`, `directions_api_key`) support
//! secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use gflow_google::{BackoffPolicy, GoogleConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Configuration for the `gflow` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Google account and endpoint settings.
    pub google: GoogleSettings,

    /// Retry policy overrides.
    pub backoff: BackoffSettings,

    /// Debug logging.
    pub debug: bool,
}

impl CliConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gflow")
    }

    /// Returns the default data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gflow")
    }

    /// Returns where credential records are stored.
    pub fn credential_store_path(&self) -> PathBuf {
        self.google
            .credential_store
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("credentials.json"))
    }

    /// Builds the library configuration from these settings.
    pub fn google_config(&self) -> CliResult<GoogleConfig> {
        let google = &self.google;
        let mut config = GoogleConfig::new()
            .with_timeout(Duration::from_secs(google.timeout_secs))
            .with_scopes(google.scopes.clone())
            .with_backoff(self.backoff.to_policy())
            .with_single_flight_refresh(google.single_flight_refresh);

        if let Some(ref url) = google.token_url {
            config = config.with_token_url(url);
        }
        if let Some(ref url) = google.auth_url {
            config = config.with_auth_url(url);
        }
        if let Some(ref url) = google.calendar_api_base {
            config = config.with_calendar_api_base(url);
        }
        if let Some(ref url) = google.directions_url {
            config = config.with_directions_url(url);
        }

        config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Google settings (`[google]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Cloud Console credentials JSON, used when the inline pair is absent.
    pub credentials_file: Option<PathBuf>,

    /// Account id under which the credential record is stored.
    pub account: String,

    /// Path of the credential store file.
    pub credential_store: Option<PathBuf>,

    /// Redirect URI registered for the OAuth client.
    pub redirect_uri: String,

    /// OAuth scopes requested at login.
    pub scopes: Vec<String>,

    /// Calendar used when `--calendar` is not given.
    pub default_calendar: String,

    /// Directions API key (supports `pass::` and `env::` prefixes).
    pub directions_api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Coalesce concurrent token refreshes.
    pub single_flight_refresh: bool,

    /// Endpoint overrides, mostly for testing against a local server.
    pub token_url: Option<String>,
    pub auth_url: Option<String>,
    pub calendar_api_base: Option<String>,
    pub directions_url: Option<String>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            credentials_file: None,
            account: "default".to_string(),
            credential_store: None,
            redirect_uri: "http://127.0.0.1:8085/callback".to_string(),
            scopes: vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
            default_calendar: "primary".to_string(),
            directions_api_key: None,
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            single_flight_refresh: false,
            token_url: None,
            auth_url: None,
            calendar_api_base: None,
            directions_url: None,
        }
    }
}

impl GoogleSettings {
    /// Resolves the OAuth client identity.
    ///
    /// Inline `client_id`/`client_secret` win over `credentials_file`. Each
    /// inline value is passed through [`crate::secret::resolve`].
    pub fn resolve_credentials(&self) -> CliResult<OAuthCredentials> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(raw_id), Some(raw_secret)) => {
                let client_id = crate::secret::resolve(raw_id)
                    .map_err(|e| CliError::Config(format!("failed to resolve client_id: {}", e)))?;
                let client_secret = crate::secret::resolve(raw_secret).map_err(|e| {
                    CliError::Config(format!("failed to resolve client_secret: {}", e))
                })?;
                Ok(OAuthCredentials::new(client_id, client_secret))
            }
            (Some(_), None) => Err(CliError::Config(
                "client_secret is missing from [google] section in config.toml".to_string(),
            )),
            (None, Some(_)) => Err(CliError::Config(
                "client_id is missing from [google] section in config.toml".to_string(),
            )),
            (None, None) => match self.credentials_file {
                Some(ref path) => OAuthCredentials::from_file(path).map_err(|e| {
                    CliError::Config(format!("failed to load {}: {}", path.display(), e))
                }),
                None => Err(CliError::Config(format!(
                    "Google credentials not found. Add to {}:\n  \
                     [google]\n  \
                     client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                     client_secret = \"YOUR_SECRET\"",
                    CliConfig::default_path().display()
                ))),
            },
        }
    }

    /// Resolves the Directions API key, if configured.
    pub fn resolve_directions_api_key(&self) -> CliResult<Option<String>> {
        self.directions_api_key
            .as_deref()
            .map(|raw| {
                crate::secret::resolve(raw).map_err(|e| {
                    CliError::Config(format!("failed to resolve directions_api_key: {}", e))
                })
            })
            .transpose()
    }
}

/// Retry overrides (`[backoff]` in config.toml). Unset fields keep defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub factor: Option<u32>,
    pub max_attempts: Option<u32>,
}

impl BackoffSettings {
    /// Merges the overrides onto the default policy.
    pub fn to_policy(&self) -> BackoffPolicy {
        let defaults = BackoffPolicy::default();
        BackoffPolicy::new(
            self.initial_delay_ms
                .map_or(defaults.initial_delay, Duration::from_millis),
            self.max_delay_ms
                .map_or(defaults.max_delay, Duration::from_millis),
            self.factor.unwrap_or(defaults.factor),
            self.max_attempts.unwrap_or(defaults.max_attempts),
        )
    }
}
