//! gflow CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use gflow_cli::cli::{AuthAction, CalendarAction, Cli, Command, ConfigAction, TokenAction};
use gflow_cli::commands::{self, Context, calendar};
use gflow_cli::config::CliConfig;
use gflow_cli::error::CliResult;
use gflow_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::default_path);
    let config = if cli.config.is_some() {
        CliConfig::load_from(&config_path)
    } else {
        CliConfig::load()
    };

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let tracing = if cli.json_logs {
        TracingConfig::host()
    } else {
        TracingConfig::cli(debug)
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli, config, &config_path).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, config: CliConfig, config_path: &Path) -> CliResult<()> {
    let ctx = Context::new(config, cli.account, cli.show_retries);
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&ctx.config, config_path),
            ConfigAction::Validate => commands::config::validate(&ctx.config),
            ConfigAction::Path => commands::config::path(&ctx.config, config_path),
        },
        Command::Auth { action } => match action {
            AuthAction::Login {
                client,
                no_browser,
                force,
            } => commands::auth::login(&ctx, client, no_browser, force).await,
            AuthAction::Url { client } => commands::auth::url(&ctx, client),
            AuthAction::Exchange {
                client,
                code,
                verifier,
                state,
            } => commands::auth::exchange(&ctx, client, code, verifier, state).await,
            AuthAction::Logout => commands::auth::logout(&ctx),
        },
        Command::Token { action } => match action {
            TokenAction::Refresh => commands::token::refresh(&ctx).await,
            TokenAction::Status { json } => commands::token::status(&ctx, json),
        },
        Command::Request(args) => commands::request::run(&ctx, args).await,
        Command::Calendar { action } => match action {
            CalendarAction::List { json } => calendar::list(&ctx, json).await,
            CalendarAction::Events {
                calendar: calendar_id,
                days,
                past_days,
                limit,
                search,
                json,
            } => {
                calendar::events(
                    &ctx,
                    calendar::EventsOptions {
                        calendar: calendar_id,
                        days,
                        past_days,
                        limit,
                        search,
                        json,
                    },
                )
                .await
            }
            CalendarAction::Insert {
                calendar: calendar_id,
                summary,
                start,
                end,
                duration,
                location,
                description,
                attendee,
            } => {
                calendar::insert(
                    &ctx,
                    calendar::InsertOptions {
                        calendar: calendar_id,
                        summary,
                        start,
                        end,
                        duration_minutes: duration,
                        location,
                        description,
                        attendees: attendee,
                    },
                )
                .await
            }
        },
        Command::Directions(args) => commands::directions::run(&ctx, args).await,
    }
}
