//! Time helpers.
//!
//! [`TimeWindow`] describes the range used for calendar queries, and
//! [`expiry_after`] turns a provider's relative `expires_in` into the absolute
//! instant stored on a credential.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`TimeWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeWindowError {
    /// The window would end before it starts.
    #[error("time window start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A half-open range of time, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, rejecting inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeWindowError> {
        if start > end {
            return Err(TimeWindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a window starting at `start` and lasting `duration`.
    ///
    /// Negative durations collapse to an empty window.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        let end = start + duration.max(Duration::zero());
        Self { start, end }
    }

    /// Creates a window reaching `past` before and `ahead` after `now`.
    pub fn around(now: DateTime<Utc>, past: Duration, ahead: Duration) -> Self {
        Self {
            start: now - past.max(Duration::zero()),
            end: now + ahead.max(Duration::zero()),
        }
    }

    /// Returns the duration of this window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Returns true if the window has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Computes the absolute expiry of a token issued at `issued_at` that lives for
/// `expires_in_secs` seconds.
///
/// Returns `None` when the result does not fit in a `DateTime`.
pub fn expiry_after(issued_at: DateTime<Utc>, expires_in_secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(expires_in_secs).and_then(|ttl| issued_at.checked_add_signed(ttl))
}
