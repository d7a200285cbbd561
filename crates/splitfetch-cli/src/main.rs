//! splitfetch - download and assemble split Android packages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use splitfetch_cli::cmd;
use splitfetch_cli::cmd::fetch::FetchArgs;
use splitfetch_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            package,
            reply,
            method,
            name,
            output_dir,
            no_interactive,
        } => {
            cmd::fetch::fetch(FetchArgs {
                package: &package,
                reply: &reply,
                method,
                name,
                output_dir: &output_dir,
                no_interactive,
            })
            .await
        }
        Commands::Check { json } => cmd::check::check(json),
        Commands::ConfigDir { tools } => cmd::config_dir::config_dir(tools),
    }
}
