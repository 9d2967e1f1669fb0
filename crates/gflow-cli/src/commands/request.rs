//! Raw authenticated request command.

use gflow_google::{Method, PendingRequest};
use serde_json::Value;

use crate::cli::RequestArgs;
use crate::commands::{Context, print_json};
use crate::error::{CliError, CliResult};

/// Send one request through the dispatcher and print the decoded body.
pub async fn run(ctx: &Context, args: RequestArgs) -> CliResult<()> {
    let request = build_request(args)?;
    let session = ctx.session()?;
    let body = session.dispatcher.send(&request).await?;
    print_json(&body)
}

fn build_request(args: RequestArgs) -> CliResult<PendingRequest> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidArgument(format!("invalid method: {}", args.method)))?;

    let mut request = PendingRequest::new(args.url).with_method(method);
    for pair in &args.query {
        let (key, value) = split_pair(pair, '=', "query")?;
        request = request.with_query(key, value);
    }
    for pair in &args.headers {
        let (name, value) = split_pair(pair, ':', "header")?;
        request = request.with_header(name, value);
    }
    if let Some(ref data) = args.data {
        request = request.with_json(read_body(data)?);
    }
    Ok(request)
}

fn split_pair<'a>(pair: &'a str, sep: char, what: &str) -> CliResult<(&'a str, &'a str)> {
    pair.split_once(sep)
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| {
            CliError::InvalidArgument(format!("{} '{}' must look like name{}value", what, pair, sep))
        })
}

/// Parses `--data`: inline JSON, or `@path` to read it from a file.
fn read_body(data: &str) -> CliResult<Value> {
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => data.to_string(),
    };
    serde_json::from_str(&text)
        .map_err(|e| CliError::InvalidArgument(format!("--data is not valid JSON: {}", e)))
}
