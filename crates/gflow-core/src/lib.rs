//! Shared plumbing for the gflow crates: tracing setup and time windows.

pub mod time;
pub mod tracing;

pub use time::{TimeWindow, TimeWindowError, expiry_after};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
