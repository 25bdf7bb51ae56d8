//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::infra::env::HostEnv;

/// Local development environments: VM, containers, network, then infrastructure
#[derive(Parser)]
#[command(
    name = "basecamp",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Assume yes for confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Context to operate on
    #[arg(long, global = true, env = "BASECAMP_CONTEXT")]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Configure a context and generate its files
    Init(commands::init::InitArgs),

    /// Bring up the workstation and apply infrastructure
    Up(commands::up::UpArgs),

    /// Destroy infrastructure and stop the workstation
    Down(commands::down::DownArgs),

    /// Remove generated artifacts for the current context
    Clean,

    /// Show version
    Version {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, host: HostEnv) -> Result<()> {
        let Cli {
            quiet,
            no_color,
            verbose: _,
            yes,
            context,
            command,
        } = self;

        if let Command::Version { json } = command {
            commands::version::run(json)?;
            return Ok(());
        }

        let app = AppContext::new(
            AppFlags {
                output: OutputFlags { no_color, quiet },
                behaviour: BehaviourFlags { yes },
                context,
            },
            host,
        );

        match command {
            Command::Init(args) => commands::init::run(&app, args).await,
            Command::Up(args) => commands::up::run(&app, args).await,
            Command::Down(args) => commands::down::run(&app, args).await,
            Command::Clean => commands::clean::run(&app).await,
            Command::Version { .. } => Ok(()),
        }
    }
}
