// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, ValueEnum};

use crate::types::{DEFAULT_TENANT_DOMAIN, DEFAULT_USER_STORE_DOMAIN};

/// Command-line arguments for `forget-me`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "forget-me",
    version,
    about = "Remove or pseudonymise a user's traces from logs, files and databases.",
    long_about = None
)]
pub struct CliArgs {
    /// Home directory containing `config.toml` and the configured sources.
    #[arg(short = 'd', long = "home", value_name = "DIR")]
    pub home: String,

    /// Name of the user to forget.
    #[arg(
        short = 'U',
        long = "user",
        value_name = "NAME",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub user: String,

    /// User store domain of the user.
    #[arg(short = 'D', long, value_name = "DOMAIN", default_value = DEFAULT_USER_STORE_DOMAIN)]
    pub user_domain: String,

    /// Tenant domain of the user.
    #[arg(
        short = 'T',
        long,
        value_name = "TENANT",
        default_value = DEFAULT_TENANT_DOMAIN,
        allow_hyphen_values = true
    )]
    pub tenant_domain: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FORGET_ME_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Discover and print lanes and tasks, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
