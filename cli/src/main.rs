//! basecamp - local development environments

use basecamp_cli::cli::Cli;
use basecamp_cli::infra::env::HostEnv;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let host = HostEnv::from_env().unwrap_or_default();
    let cli = Cli::parse();

    let filter = host
        .log
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cli.run(host).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
