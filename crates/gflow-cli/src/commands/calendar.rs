//! Calendar commands.

use chrono::{DateTime, Duration, Local, Utc};

use gflow_core::TimeWindow;
use gflow_google::api::{CalendarApi, CalendarEvent, EventQuery, NewEvent};

use crate::commands::{Context, print_json};
use crate::error::{CliError, CliResult};

/// Options for `gflow calendar events`.
#[derive(Debug, Clone)]
pub struct EventsOptions {
    pub calendar: Option<String>,
    pub days: i64,
    pub past_days: i64,
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub json: bool,
}

/// Options for `gflow calendar insert`.
#[derive(Debug, Clone)]
pub struct InsertOptions {
    pub calendar: Option<String>,
    pub summary: String,
    pub start: String,
    pub end: Option<String>,
    pub duration_minutes: i64,
    pub location: Option<String>,
    pub description: Option<String>,
    pub attendees: Vec<String>,
}

/// List the user's calendars.
pub async fn list(ctx: &Context, json: bool) -> CliResult<()> {
    let session = ctx.session()?;
    let api = CalendarApi::new(session.dispatcher, &session.google);
    let calendars = api.list_calendars().await?;

    if json {
        return print_json(&calendars);
    }
    if calendars.is_empty() {
        println!("No calendars.");
        return Ok(());
    }
    for calendar in &calendars {
        let marker = if calendar.primary { "*" } else { " " };
        println!("{} {}  {}", marker, calendar.id, calendar.summary);
    }
    Ok(())
}

/// List events around now.
pub async fn events(ctx: &Context, opts: EventsOptions) -> CliResult<()> {
    let query = build_query(&opts, Utc::now())?;
    let calendar = opts
        .calendar
        .unwrap_or_else(|| ctx.config.google.default_calendar.clone());

    let session = ctx.session()?;
    let api = CalendarApi::new(session.dispatcher, &session.google);
    let events = api.list_events(&calendar, &query).await?;

    if opts.json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }
    for event in &events {
        println!("{}", format_event(event));
    }
    Ok(())
}

/// Create an event.
pub async fn insert(ctx: &Context, opts: InsertOptions) -> CliResult<()> {
    let event = build_event(&opts)?;
    let calendar = opts
        .calendar
        .clone()
        .unwrap_or_else(|| ctx.config.google.default_calendar.clone());

    let session = ctx.session()?;
    let api = CalendarApi::new(session.dispatcher, &session.google);
    let created = api.insert_event(&calendar, &event).await?;

    println!("Created event {}", created.id);
    if let Some(ref link) = created.html_link {
        println!("{}", link);
    }
    Ok(())
}

fn build_query(opts: &EventsOptions, now: DateTime<Utc>) -> CliResult<EventQuery> {
    if opts.days < 0 || opts.past_days < 0 {
        return Err(CliError::InvalidArgument(
            "--days and --past-days must not be negative".to_string(),
        ));
    }
    let window = TimeWindow::around(now, Duration::days(opts.past_days), Duration::days(opts.days));

    let mut query = EventQuery::within(window);
    if let Some(limit) = opts.limit {
        query = query.with_max_results(limit);
    }
    if let Some(ref text) = opts.search {
        query = query.with_text(text);
    }
    Ok(query)
}

fn build_event(opts: &InsertOptions) -> CliResult<NewEvent> {
    let start = parse_time(&opts.start, "--start")?;
    let end = match opts.end {
        Some(ref end) => parse_time(end, "--end")?,
        None => start + Duration::minutes(opts.duration_minutes),
    };
    let window = TimeWindow::new(start, end)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let mut event = NewEvent::timed(&opts.summary, window);
    if let Some(ref description) = opts.description {
        event = event.with_description(description);
    }
    if let Some(ref location) = opts.location {
        event = event.with_location(location);
    }
    for email in &opts.attendees {
        event = event.with_attendee(email);
    }
    Ok(event)
}

pub(crate) fn parse_time(value: &str, flag: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CliError::InvalidArgument(format!("{} '{}': {}", flag, value, e)))
}

fn format_event(event: &CalendarEvent) -> String {
    let when = if event.start.is_all_day() {
        event
            .start
            .date
            .map(|d| format!("{}      ", d.format("%Y-%m-%d")))
            .unwrap_or_default()
    } else {
        event
            .start
            .to_utc()
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    };

    let mut line = format!(
        "{}  {}",
        when,
        event.summary.as_deref().unwrap_or("(no title)")
    );
    if let Some(ref location) = event.location {
        line.push_str(&format!("  @ {}", location));
    }
    line
}
