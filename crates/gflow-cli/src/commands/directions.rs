//! Directions command.

use gflow_google::api::{
    DepartureTime, DirectionsApi, DirectionsRequest, DirectionsResponse, TravelMode, Units,
};

use crate::cli::{DirectionsArgs, ModeArg, UnitsArg};
use crate::commands::calendar::parse_time;
use crate::commands::{Context, print_json};
use crate::error::CliResult;

impl From<ModeArg> for TravelMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Driving => Self::Driving,
            ModeArg::Walking => Self::Walking,
            ModeArg::Bicycling => Self::Bicycling,
            ModeArg::Transit => Self::Transit,
        }
    }
}

impl From<UnitsArg> for Units {
    fn from(units: UnitsArg) -> Self {
        match units {
            UnitsArg::Metric => Self::Metric,
            UnitsArg::Imperial => Self::Imperial,
        }
    }
}

/// Look up a route and print a summary per alternative.
pub async fn run(ctx: &Context, args: DirectionsArgs) -> CliResult<()> {
    let request = build_request(&args)?;
    let api_key = ctx.config.google.resolve_directions_api_key()?;

    let session = ctx.session()?;
    let mut api = DirectionsApi::new(session.dispatcher, &session.google);
    if let Some(key) = api_key {
        api = api.with_api_key(key);
    }
    let response = api.route(&request).await?;

    if args.json {
        return print_json(&response);
    }
    print_summary(&response);
    Ok(())
}

fn build_request(args: &DirectionsArgs) -> CliResult<DirectionsRequest> {
    let mut request = DirectionsRequest::new(&args.origin, &args.destination)
        .with_mode(args.mode.into())
        .with_alternatives(args.alternatives);

    for waypoint in &args.waypoint {
        request = request.with_waypoint(waypoint);
    }
    for feature in &args.avoid {
        request = request.with_avoid(feature);
    }
    if let Some(units) = args.units {
        request = request.with_units(units.into());
    }
    if let Some(ref language) = args.language {
        request = request.with_language(language);
    }
    if let Some(ref region) = args.region {
        request = request.with_region(region);
    }
    match args.depart.as_deref() {
        Some("now") => request = request.with_departure_time(DepartureTime::Now),
        Some(value) => {
            request = request.with_departure_time(DepartureTime::At(parse_time(value, "--depart")?))
        }
        None => {}
    }
    if let Some(ref value) = args.arrive {
        request = request.with_arrival_time(parse_time(value, "--arrive")?);
    }

    request.validate()?;
    Ok(request)
}

fn print_summary(response: &DirectionsResponse) {
    if response.routes.is_empty() {
        println!("No route found.");
        return;
    }
    for route in &response.routes {
        let via = if route.summary.is_empty() {
            String::new()
        } else {
            format!("via {}: ", route.summary)
        };
        println!(
            "{}{}, {}",
            via,
            format_distance(route.total_distance_meters()),
            format_duration(route.total_duration_secs())
        );
        for warning in &route.warnings {
            println!("  ! {}", warning);
        }
    }
}

fn format_distance(meters: i64) -> String {
    if meters < 1000 {
        format!("{} m", meters)
    } else {
        format!("{:.1} km", meters as f64 / 1000.0)
    }
}

fn format_duration(secs: i64) -> String {
    let minutes = (secs + 30) / 60;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{} min", m),
        (h, m) => format!("{} h {:02} min", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DirectionsArgs {
        DirectionsArgs {
            origin: "Paris".to_string(),
            destination: "Lille".to_string(),
            mode: ModeArg::Transit,
            waypoint: vec!["Arras".to_string()],
            avoid: vec!["tolls".to_string()],
            alternatives: true,
            units: Some(UnitsArg::Imperial),
            language: None,
            region: Some("fr".to_string()),
            depart: Some("now".to_string()),
            arrive: None,
            json: false,
        }
    }

    #[test]
    fn builds_request_from_flags() {
        let request = build_request(&args()).unwrap();
        assert_eq!(request.mode, TravelMode::Transit);
        assert_eq!(request.waypoints, vec!["Arras"]);
        assert_eq!(request.avoid, vec!["tolls"]);
        assert!(request.alternatives);
        assert_eq!(request.units, Some(Units::Imperial));
        assert_eq!(request.departure_time, Some(DepartureTime::Now));
    }

    #[test]
    fn departure_timestamp_parsed() {
        let request = build_request(&DirectionsArgs {
            depart: Some("2024-03-15T08:00:00Z".to_string()),
            ..args()
        })
        .unwrap();
        assert!(matches!(request.departure_time, Some(DepartureTime::At(_))));

        assert!(
            build_request(&DirectionsArgs {
                depart: Some("soon".to_string()),
                ..args()
            })
            .is_err()
        );
    }

    #[test]
    fn empty_origin_rejected() {
        assert!(
            build_request(&DirectionsArgs {
                origin: "  ".to_string(),
                ..args()
            })
            .is_err()
        );
    }

    #[test]
    fn formatting() {
        assert_eq!(format_distance(850), "850 m");
        assert_eq!(format_distance(225_400), "225.4 km");
        assert_eq!(format_duration(600), "10 min");
        assert_eq!(format_duration(7_890), "2 h 12 min");
    }
}
