//! quakecache - read-through caching gateway for USGS earthquake queries.
//!
//! Validates query parameters, serves repeated queries from a short-lived
//! Redis cache, and re-serializes filtered results as JSON or XML.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

mod cli;
mod client;
mod config;
mod dates;
mod errors;
mod fetcher;
mod filters;
mod keys;
mod models;
mod output;
mod query;
mod server;
mod service;
mod store;

use cli::{Cli, Command, QueryKind};
use config::GatewayConfig;
use service::{EarthquakeRequest, FeltRequest, QueryService, TsunamiParams, TsunamiRequest};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Query(args) => cmd_query(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_service(config: &GatewayConfig) -> Result<QueryService> {
    info!(
        "upstream {} (timeout {}s), cache {}:{} (ttl {}s)",
        config.upstream_base_url,
        config.upstream_timeout.as_secs(),
        config.cache_store_host,
        config.cache_store_port,
        config.cache_ttl.as_secs()
    );
    QueryService::from_config(config).context("failed to create USGS client")
}

/// Execute the `serve` command - run the HTTP gateway.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let service = build_service(&args.gateway.to_config())?;

    let config = server::ServerConfig {
        port: args.port,
        host: args.host,
    };

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config, service))
}

/// Execute the `query` command - one pipeline run to stdout.
fn cmd_query(args: cli::QueryArgs) -> Result<()> {
    let service = build_service(&args.gateway.to_config())?;

    let spec = match args.kind {
        QueryKind::Earthquakes => EarthquakeRequest {
            start_time: args.start_time,
            end_time: args.end_time.unwrap_or_default(),
            format: args.format,
            min_magnitude: args.min_magnitude,
        }
        .into_spec(),
        QueryKind::Felt => FeltRequest {
            start_time: args.start_time,
            end_time: args.end_time.unwrap_or_default(),
            format: args.format,
            min_felt_reports: args.min_felt_reports,
        }
        .into_spec(),
        QueryKind::Tsunami => TsunamiRequest {
            state: args.state,
            params: TsunamiParams {
                start_time: args.start_time,
                time_range: args.time_range,
                format: args.format,
            },
        }
        .into_spec(),
    }?;

    let formatted = service.run(&spec)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(&formatted.body)?;
    writeln!(handle)?;

    Ok(())
}
