//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::client::USGS_API_URL;
use crate::config::GatewayConfig;
use crate::service::{DEFAULT_MIN_FELT_REPORTS, DEFAULT_MIN_MAGNITUDE, DEFAULT_TIME_RANGE_HOURS};

/// Read-through caching gateway for USGS earthquake queries.
#[derive(Parser, Debug)]
#[command(name = "quakecache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP gateway
    Serve(ServeArgs),

    /// Run a single query and print the response
    Query(QueryArgs),
}

/// Cache store and upstream options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GatewayArgs {
    /// Cache store host
    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,

    /// Cache store port
    #[arg(long, env = "REDIS_PORT", default_value = "6379")]
    pub redis_port: u16,

    /// Upstream event query endpoint
    #[arg(long, env = "USGS_API_URL", default_value = USGS_API_URL)]
    pub upstream_url: String,
}

impl GatewayArgs {
    #[must_use]
    pub fn to_config(&self) -> GatewayConfig {
        GatewayConfig::new(
            self.redis_host.clone(),
            self.redis_port,
            self.upstream_url.clone(),
        )
    }
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8000")]
    pub port: u16,
}

/// Which query surface to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Earthquakes around San Francisco above a magnitude
    Earthquakes,
    /// Earthquakes around San Francisco with felt reports
    Felt,
    /// Tsunami-flagged events before a start time
    Tsunami,
}

/// Arguments for the `query` command.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Query surface
    #[arg(long, value_enum, default_value = "earthquakes")]
    pub kind: QueryKind,

    /// Start time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long)]
    pub start_time: String,

    /// End time (YYYY-MM-DDTHH:MM:SS); not used by `tsunami`
    #[arg(long)]
    pub end_time: Option<String>,

    /// Response format (json or xml)
    #[arg(long, short = 'f', default_value = "json")]
    pub format: String,

    /// Minimum magnitude (`earthquakes`)
    #[arg(long, default_value_t = DEFAULT_MIN_MAGNITUDE)]
    pub min_magnitude: f64,

    /// Minimum felt reports (`felt`)
    #[arg(long, default_value_t = DEFAULT_MIN_FELT_REPORTS)]
    pub min_felt_reports: i64,

    /// Region label (`tsunami`)
    #[arg(long, default_value = "California")]
    pub state: String,

    /// Look-back in hours, 1 to 168 (`tsunami`)
    #[arg(long, default_value_t = DEFAULT_TIME_RANGE_HOURS)]
    pub time_range: u32,
}
