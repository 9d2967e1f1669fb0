//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// gflow - authenticated access to Google Calendar and Directions
#[derive(Debug, Parser)]
#[command(name = "gflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GFLOW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Account id in the credential store (overrides config)
    #[arg(long, short, env = "GFLOW_ACCOUNT", global = true)]
    pub account: Option<String>,

    /// Print retry notifications on stderr
    #[arg(long, global = true)]
    pub show_retries: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize access and manage stored credentials
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Inspect or refresh the access token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Send an authenticated request and print the JSON response
    Request(RequestArgs),

    /// Google Calendar operations
    Calendar {
        #[command(subcommand)]
        action: CalendarAction,
    },

    /// Look up a route with the Directions API
    Directions(DirectionsArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// OAuth client identity overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct ClientArgs {
    /// OAuth client ID (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Path to Google Cloud Console credentials JSON file
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Redirect URI registered for the client
    #[arg(long)]
    pub redirect_uri: Option<String>,
}

/// Authorization actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Open the consent page, read the redirect back and store the credential
    Login {
        #[command(flatten)]
        client: ClientArgs,

        /// Print the URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,

        /// Replace an existing credential
        #[arg(long, short)]
        force: bool,
    },

    /// Print a consent URL with its state and PKCE verifier
    Url {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Exchange an authorization code and store the credential
    Exchange {
        #[command(flatten)]
        client: ClientArgs,

        /// Authorization code, or the full redirect URL
        #[arg(long)]
        code: String,

        /// PKCE verifier printed by `gflow auth url`
        #[arg(long)]
        verifier: String,

        /// State printed by `gflow auth url`, checked against the redirect
        #[arg(long)]
        state: Option<String>,
    },

    /// Delete the stored credential
    Logout,
}

/// Token actions.
#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Exchange the refresh token for a new access token now
    Refresh,

    /// Show expiry and scopes of the stored credential
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments for `gflow request`.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_parser = ["GET", "POST", "PUT", "PATCH", "DELETE"], ignore_case = true)]
    pub method: String,

    /// Absolute URL
    pub url: String,

    /// Query parameter as key=value (can be repeated)
    #[arg(long = "query", short = 'q', action = clap::ArgAction::Append)]
    pub query: Vec<String>,

    /// Header as name:value (can be repeated)
    #[arg(long = "header", short = 'H', action = clap::ArgAction::Append)]
    pub headers: Vec<String>,

    /// JSON body, or @path to read it from a file
    #[arg(long, short)]
    pub data: Option<String>,
}

/// Calendar actions.
#[derive(Debug, Subcommand)]
pub enum CalendarAction {
    /// List calendars
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List events in a time window
    Events {
        /// Calendar id (defaults to config)
        #[arg(long)]
        calendar: Option<String>,

        /// Days ahead to include
        #[arg(long, default_value = "7")]
        days: i64,

        /// Days back to include
        #[arg(long, default_value = "0")]
        past_days: i64,

        /// Maximum number of events
        #[arg(long)]
        limit: Option<usize>,

        /// Free-text search
        #[arg(long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an event
    Insert {
        /// Calendar id (defaults to config)
        #[arg(long)]
        calendar: Option<String>,

        /// Event title
        #[arg(long)]
        summary: String,

        /// Start time (RFC 3339)
        #[arg(long)]
        start: String,

        /// End time (RFC 3339)
        #[arg(long, conflicts_with = "duration")]
        end: Option<String>,

        /// Duration in minutes
        #[arg(long, default_value = "30")]
        duration: i64,

        /// Event location
        #[arg(long)]
        location: Option<String>,

        /// Event description
        #[arg(long)]
        description: Option<String>,

        /// Attendee email (can be repeated)
        #[arg(long, action = clap::ArgAction::Append)]
        attendee: Vec<String>,
    },
}

/// Travel mode argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

/// Unit system argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitsArg {
    Metric,
    Imperial,
}

/// Arguments for `gflow directions`.
#[derive(Debug, Args)]
pub struct DirectionsArgs {
    /// Starting point (address or lat,lng)
    pub origin: String,

    /// End point (address or lat,lng)
    pub destination: String,

    /// Travel mode
    #[arg(long, value_enum, default_value = "driving")]
    pub mode: ModeArg,

    /// Intermediate stop (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub waypoint: Vec<String>,

    /// Feature to avoid: tolls, highways, ferries, indoor (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub avoid: Vec<String>,

    /// Ask for alternative routes
    #[arg(long)]
    pub alternatives: bool,

    /// Unit system for text fields
    #[arg(long, value_enum)]
    pub units: Option<UnitsArg>,

    /// Response language
    #[arg(long)]
    pub language: Option<String>,

    /// Region bias (ccTLD)
    #[arg(long)]
    pub region: Option<String>,

    /// Departure time (RFC 3339 or "now")
    #[arg(long, conflicts_with = "arrive")]
    pub depart: Option<String>,

    /// Arrival time (RFC 3339)
    #[arg(long)]
    pub arrive: Option<String>,

    /// Output the raw JSON response
    #[arg(long)]
    pub json: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration and credential file paths
    Path,
}
