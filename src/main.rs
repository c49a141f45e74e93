mod cleanup;
mod cli;
mod config;
mod convert;
mod mapping;
mod migrate;
mod model;
mod order;
mod providers;
mod resolve;
mod selection;
mod util;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    let level = config
        .log_level(env)
        .or_else(|| cli.verbosity_level().map(String::from))
        .unwrap_or_else(|| "info".to_string());
    setup_logging(&level);

    let answers = cli.answers.as_deref();
    match cli.command {
        Command::Migrate(args) => cli::handle_migrate(args, config.resolve(env)?, answers).await,
        Command::Delete(args) => {
            cli::handle_delete(args, config.resolve_cleanup(env)?, answers).await
        }
    }
}

/// Log to stderr so prompts and the summary on stdout stay readable.
/// `RUST_LOG` wins over `level`.
fn setup_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
