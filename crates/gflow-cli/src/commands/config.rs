//! Configuration commands.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::secret;

const REDACTED: &str = "<redacted>";

/// Dump the current configuration to stdout, hiding inline secrets.
pub fn dump(config: &CliConfig, path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(&redacted(config))
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &CliConfig) -> CliResult<()> {
    config.google_config()?;

    let google = &config.google;
    if google.account.trim().is_empty() {
        return Err(CliError::Config("google.account must not be empty".to_string()));
    }

    if google.client_id.is_some() || google.client_secret.is_some() || google.credentials_file.is_some() {
        let credentials = google.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| CliError::Config(format!("invalid Google credentials: {}", e)))?;
        println!("Google credentials are valid.");
    }
    if google.resolve_directions_api_key()?.is_some() {
        println!("Directions API key resolved.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and credential file paths.
pub fn path(config: &CliConfig, path: &Path) -> CliResult<()> {
    println!("config:      {}", path.display());
    println!("credentials: {}", config.credential_store_path().display());
    Ok(())
}

/// Replaces plain-text secrets with a marker. References are kept since they
/// only name where the secret lives.
fn redacted(config: &CliConfig) -> CliConfig {
    let hide = |value: &Option<String>| {
        value.as_ref().map(|v| {
            if secret::is_reference(v) {
                v.clone()
            } else {
                REDACTED.to_string()
            }
        })
    };

    let mut copy = config.clone();
    copy.google.client_secret = hide(&config.google.client_secret);
    copy.google.directions_api_key = hide(&config.google.directions_api_key);
    copy
}
