//! cli
//!
//! Command-line interface for staging edits against record fixtures.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber
//! - Load configuration and delegate to command handlers
//!
//! The CLI layer is thin. Staging semantics live in [`crate::proxy`].

pub mod args;
pub mod commands;
pub mod fixture;

pub use args::{Cli, Shell};

use anyhow::{Context as _, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;

/// Per-invocation state shared by command handlers.
#[derive(Debug)]
pub struct Context {
    pub debug: bool,
    pub config: Config,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(path = ?config.path(), "configuration loaded");

    let ctx = Context {
        debug: cli.debug,
        config,
    };
    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. `RUST_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "simple_changeset=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
