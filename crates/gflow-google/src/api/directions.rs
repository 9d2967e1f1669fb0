//! Google Directions API adapter.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::GoogleConfig;
use crate::dispatcher::{AuthenticatedRequestDispatcher, PendingRequest};
use crate::error::{AuthError, AuthResult};

/// How to travel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "driving" => Ok(Self::Driving),
            "walking" => Ok(Self::Walking),
            "bicycling" => Ok(Self::Bicycling),
            "transit" => Ok(Self::Transit),
            other => Err(AuthError::configuration(format!(
                "unknown travel mode '{}'",
                other
            ))),
        }
    }
}

/// Unit system for distances in text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

/// When to leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureTime {
    Now,
    At(DateTime<Utc>),
}

impl DepartureTime {
    fn to_query_value(self) -> String {
        match self {
            Self::Now => "now".to_string(),
            Self::At(dt) => dt.timestamp().to_string(),
        }
    }
}

/// A route query.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
    pub waypoints: Vec<String>,
    pub alternatives: bool,
    /// Features to avoid: `tolls`, `highways`, `ferries`, `indoor`.
    pub avoid: Vec<String>,
    pub units: Option<Units>,
    pub language: Option<String>,
    pub region: Option<String>,
    pub departure_time: Option<DepartureTime>,
    pub arrival_time: Option<DateTime<Utc>>,
}

impl DirectionsRequest {
    /// Creates a driving query between two places.
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            mode: TravelMode::default(),
            waypoints: Vec::new(),
            alternatives: false,
            avoid: Vec::new(),
            units: None,
            language: None,
            region: None,
            departure_time: None,
            arrival_time: None,
        }
    }

    pub fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_waypoint(mut self, waypoint: impl Into<String>) -> Self {
        self.waypoints.push(waypoint.into());
        self
    }

    pub fn with_alternatives(mut self, alternatives: bool) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn with_avoid(mut self, feature: impl Into<String>) -> Self {
        self.avoid.push(feature.into());
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_departure_time(mut self, departure: DepartureTime) -> Self {
        self.departure_time = Some(departure);
        self
    }

    pub fn with_arrival_time(mut self, arrival: DateTime<Utc>) -> Self {
        self.arrival_time = Some(arrival);
        self
    }

    /// Checks the query before it is sent.
    pub fn validate(&self) -> AuthResult<()> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(AuthError::configuration(
                "directions need both an origin and a destination",
            ));
        }
        if self.departure_time.is_some() && self.arrival_time.is_some() {
            return Err(AuthError::configuration(
                "departure_time and arrival_time are mutually exclusive",
            ));
        }
        Ok(())
    }

    fn apply(&self, request: PendingRequest) -> PendingRequest {
        let mut request = request
            .with_query("origin", &self.origin)
            .with_query("destination", &self.destination)
            .with_query("mode", self.mode);
        if !self.waypoints.is_empty() {
            request = request.with_query("waypoints", self.waypoints.join("|"));
        }
        if self.alternatives {
            request = request.with_query("alternatives", true);
        }
        if !self.avoid.is_empty() {
            request = request.with_query("avoid", self.avoid.join("|"));
        }
        request
            .with_optional_query("units", self.units.map(|u| u.as_str()))
            .with_optional_query("language", self.language.as_deref())
            .with_optional_query("region", self.region.as_deref())
            .with_optional_query(
                "departure_time",
                self.departure_time.map(DepartureTime::to_query_value),
            )
            .with_optional_query("arrival_time", self.arrival_time.map(|t| t.timestamp()))
    }
}

/// A distance or duration: human text plus the raw value (meters or seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: i64,
}

/// One leg of a route, between two consecutive waypoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub start_address: Option<String>,
    #[serde(default)]
    pub end_address: Option<String>,
    #[serde(default)]
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub duration: Option<TextValue>,
    #[serde(default)]
    pub duration_in_traffic: Option<TextValue>,
    #[serde(default)]
    pub steps: Vec<Value>,
}

/// One suggested route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub copyrights: Option<String>,
}

impl Route {
    /// Sums the duration of all legs, in seconds.
    pub fn total_duration_secs(&self) -> i64 {
        self.legs
            .iter()
            .filter_map(|l| l.duration.as_ref())
            .map(|d| d.value)
            .sum()
    }

    /// Sums the distance of all legs, in meters.
    pub fn total_distance_meters(&self) -> i64 {
        self.legs
            .iter()
            .filter_map(|l| l.distance.as_ref())
            .map(|d| d.value)
            .sum()
    }
}

/// Decoded Directions API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub geocoded_waypoints: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DirectionsResponse {
    /// Maps a non-`OK` status to an error. `ZERO_RESULTS` is an empty answer.
    fn check(self) -> AuthResult<Self> {
        let code = match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => return Ok(self),
            "REQUEST_DENIED" => 403,
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => 429,
            "UNKNOWN_ERROR" => 500,
            // NOT_FOUND, INVALID_REQUEST, MAX_WAYPOINTS_EXCEEDED, MAX_ROUTE_LENGTH_EXCEEDED
            _ => 400,
        };
        let message = match self.error_message {
            Some(ref detail) => format!("{}: {}", self.status, detail),
            None => self.status.clone(),
        };
        Err(AuthError::Http {
            code,
            message,
            body: serde_json::to_value(&self).ok(),
        })
    }
}

/// Directions API client.
pub struct DirectionsApi {
    dispatcher: Arc<AuthenticatedRequestDispatcher>,
    url: String,
    api_key: Option<SecretString>,
}

impl DirectionsApi {
    /// Creates a client against `config.directions_url`.
    pub fn new(dispatcher: Arc<AuthenticatedRequestDispatcher>, config: &GoogleConfig) -> Self {
        Self {
            dispatcher,
            url: config.directions_url.clone(),
            api_key: None,
        }
    }

    /// Builder: also send an API key, for projects that require one.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Looks up routes for `request`.
    pub async fn route(&self, request: &DirectionsRequest) -> AuthResult<DirectionsResponse> {
        request.validate()?;

        let mut pending = request.apply(PendingRequest::get(&self.url));
        if let Some(ref key) = self.api_key {
            pending = pending.with_query("key", key.expose_secret());
        }

        let response: DirectionsResponse = self.dispatcher.send_json(&pending).await?;
        debug!(
            status = %response.status,
            routes = response.routes.len(),
            "directions received"
        );
        response.check()
    }
}

impl fmt::Debug for DirectionsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectionsApi")
            .field("url", &self.url)
            .field("api_key", &self.api_key.is_some())
            .finish()
    }
}
