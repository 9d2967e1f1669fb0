//! Command-line host for the gflow Google client.
//!
//! This crate provides the `gflow` binary: it owns configuration, the
//! on-disk credential store and user interaction, and drives the
//! `gflow-google` library.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod store;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use store::FileCredentialStore;
