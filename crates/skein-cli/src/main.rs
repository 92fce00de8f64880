//! Skein CLI: the `skein` command.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            bind,
            data,
            repo,
            port_attempts,
        } => commands::serve::run(bind, data, repo, port_attempts),

        Commands::Show { data, json } => commands::show::run(data, json),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SKEIN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
