//! Google API adapters built on the authenticated dispatcher.

mod calendar;
mod directions;

pub use calendar::{Attendee, CalendarApi, CalendarEvent, CalendarListEntry, EventQuery, EventTime, NewEvent};
pub use directions::{
    DepartureTime, DirectionsApi, DirectionsRequest, DirectionsResponse, Leg, Route, TextValue,
    TravelMode, Units,
};
