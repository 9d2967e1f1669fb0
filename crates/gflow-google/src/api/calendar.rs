//! Google Calendar API v3 adapter.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use gflow_core::TimeWindow;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GoogleConfig;
use crate::dispatcher::{AuthenticatedRequestDispatcher, PendingRequest};
use crate::error::{AuthError, AuthResult};

/// Calendar API client. Every call goes through the dispatcher.
#[derive(Debug, Clone)]
pub struct CalendarApi {
    dispatcher: Arc<AuthenticatedRequestDispatcher>,
    base_url: String,
}

impl CalendarApi {
    /// Creates a client against `config.calendar_api_base`.
    pub fn new(dispatcher: Arc<AuthenticatedRequestDispatcher>, config: &GoogleConfig) -> Self {
        Self {
            dispatcher,
            base_url: config.calendar_api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Lists the calendars of the authenticated user.
    pub async fn list_calendars(&self) -> AuthResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let request =
                PendingRequest::get(&url).with_optional_query("pageToken", page_token.as_deref());
            let page: Page<CalendarListEntry> = self.dispatcher.send_json(&request).await?;
            calendars.extend(page.items);

            page_token = next_page(&mut seen, page.next_page_token);
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = calendars.len(), "fetched calendar list");
        Ok(calendars)
    }

    /// Lists events of `calendar_id`, following pagination.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        query: &EventQuery,
    ) -> AuthResult<Vec<CalendarEvent>> {
        let url = self.events_url(calendar_id);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let request = query
                .apply(PendingRequest::get(&url))
                .with_optional_query("pageToken", page_token.as_deref());
            let page: Page<CalendarEvent> = self.dispatcher.send_json(&request).await?;

            events.extend(
                page.items
                    .into_iter()
                    .filter(|e| query.show_deleted || !e.is_cancelled()),
            );

            if let Some(max) = query.max_results
                && events.len() >= max
            {
                events.truncate(max);
                break;
            }

            page_token = next_page(&mut seen, page.next_page_token);
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = events.len(), calendar = calendar_id, "fetched events");
        Ok(events)
    }

    /// Creates an event and returns it as stored by Google.
    pub async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> AuthResult<CalendarEvent> {
        event.validate()?;
        let body = serde_json::to_value(event)
            .map_err(|e| AuthError::configuration(format!("failed to encode event: {}", e)))?;
        let request = PendingRequest::post(self.events_url(calendar_id)).with_json(body);
        let created: CalendarEvent = self.dispatcher.send_json(&request).await?;
        debug!(id = %created.id, calendar = calendar_id, "inserted event");
        Ok(created)
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }
}

/// Filters for [`CalendarApi::list_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    /// Only events overlapping this window.
    pub window: Option<TimeWindow>,
    /// Stop after this many events.
    pub max_results: Option<usize>,
    /// Expand recurring events into instances, ordered by start time.
    pub single_events: bool,
    /// Free-text search.
    pub text: Option<String>,
    /// Include cancelled events.
    pub show_deleted: bool,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            window: None,
            max_results: None,
            single_events: true,
            text: None,
            show_deleted: false,
        }
    }
}

impl EventQuery {
    /// Creates a query for events within `window`.
    pub fn within(window: TimeWindow) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    /// Builder: limit the number of events.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Builder: full-text search.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn apply(&self, mut request: PendingRequest) -> PendingRequest {
        if let Some(ref window) = self.window {
            request = request
                .with_query("timeMin", window.start.to_rfc3339())
                .with_query("timeMax", window.end.to_rfc3339());
        }
        request = request.with_query("singleEvents", self.single_events);
        if self.single_events {
            request = request.with_query("orderBy", "startTime");
        }
        if self.show_deleted {
            request = request.with_query("showDeleted", true);
        }
        request
            .with_optional_query("maxResults", self.max_results)
            .with_optional_query("q", self.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

/// Returns the token of the next page, or `None` once the listing is done.
/// A token already followed ends the listing.
fn next_page(seen: &mut HashSet<String>, token: Option<String>) -> Option<String> {
    let token = token?;
    if !seen.insert(token.clone()) {
        warn!("page token repeated, stopping pagination");
        return None;
    }
    Some(token)
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar name.
    #[serde(default)]
    pub summary: String,
    /// The calendar description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this is the user's primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// The calendar timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// The user's access role (`owner`, `writer`, `reader`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
}

/// Start or end of an event: a timestamp, or a date for all-day events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// A timed start or end.
    pub fn at(dt: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(dt.fixed_offset()),
            ..Self::default()
        }
    }

    /// An all-day start or end.
    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    /// Returns true for a date without time.
    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }

    /// Returns the instant in UTC. All-day values map to midnight UTC.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(dt.with_timezone(&Utc)),
            (None, Some(date)) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            (None, None) => None,
        }
    }
}

/// An event attendee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub organizer: bool,
    #[serde(rename = "self", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_self: bool,
}

impl Attendee {
    /// Creates an attendee invited by email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

/// An event as returned by the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    /// Returns true if the event was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

/// An event to create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl NewEvent {
    /// Creates an event with a title and bounds.
    pub fn new(summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            summary: summary.into(),
            description: None,
            location: None,
            start,
            end,
            attendees: Vec::new(),
        }
    }

    /// Creates a timed event covering `window`.
    pub fn timed(summary: impl Into<String>, window: TimeWindow) -> Self {
        Self::new(summary, EventTime::at(window.start), EventTime::at(window.end))
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder: invite someone.
    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendees.push(Attendee::new(email));
        self
    }

    fn validate(&self) -> AuthResult<()> {
        let (Some(start), Some(end)) = (self.start.to_utc(), self.end.to_utc()) else {
            return Err(AuthError::configuration("event start and end are required"));
        };
        if end < start {
            return Err(AuthError::configuration("event ends before it starts"));
        }
        Ok(())
    }
}
