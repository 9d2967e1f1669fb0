//! OAuth2 token lifecycle and authenticated dispatch for Google APIs.
//!
//! - [`TokenManager`] - keeps a stored credential's access token current
//! - [`AuthenticatedRequestDispatcher`] - sends requests with refresh, backoff
//!   and one-shot reauthentication
//! - [`OAuthClient`] - authorization-code flow producing new credentials
//! - [`api`] - Calendar and Directions adapters on top of the dispatcher
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐
//! │ CalendarApi  │   │ DirectionsApi  │
//! └──────┬───────┘   └───────┬────────┘
//!        └─────────┬─────────┘
//!                  ▼
//!   ┌───────────────────────────────┐      ┌──────────────┐
//!   │ AuthenticatedRequestDispatcher│─────▶│ TokenManager │
//!   └───────────────┬───────────────┘      └──────┬───────┘
//!                   │   reads bearer per attempt  │ writes full record
//!                   ▼                             ▼
//!            ┌─────────────────────────────────────────┐
//!            │        CredentialStore (host-owned)     │
//!            └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gflow_google::{AuthenticatedRequestDispatcher, GoogleConfig, PendingRequest, TokenManager};
//!
//! let config = GoogleConfig::new();
//! let tokens = Arc::new(TokenManager::new("google", store, &config)?);
//! let dispatcher = AuthenticatedRequestDispatcher::new(tokens, &config)?;
//! let body = dispatcher
//!     .send(&PendingRequest::get("https://www.googleapis.com/calendar/v3/users/me/calendarList"))
//!     .await?;
//! ```

pub mod api;
pub mod backoff;
pub mod config;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod oauth;
pub mod token;

#[cfg(test)]
mod testing;

pub use backoff::BackoffPolicy;
pub use config::{GoogleConfig, OAuthCredentials};
pub use credential::{CredentialRecord, CredentialStore, MemoryCredentialStore};
pub use dispatcher::{AuthenticatedRequestDispatcher, PendingRequest, RequestBody};
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use events::{RetryEvent, RetryListener, RetryNotifier, RetryOperation};
pub use oauth::{AuthorizationRequest, AuthorizationResponse, OAuthClient};
pub use token::TokenManager;

pub use reqwest::Method;
