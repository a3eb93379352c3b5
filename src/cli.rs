//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use git_externals::defaults::{DEFAULT_GIT, DEFAULT_SVN};
use git_externals::output::OutputConfig;
use git_externals::vcs::Tools;

use crate::commands::{self, Context};

/// git-externals - Manage repositories checked out and linked into a git working tree
#[derive(Parser, Debug)]
#[command(name = "git-externals")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Program used for git commands
    #[arg(long, global = true, value_name = "PATH", env = "GIT_EXTERNALS_GIT", default_value = DEFAULT_GIT)]
    git: String,

    /// Program used for svn commands
    #[arg(long, global = true, value_name = "PATH", env = "GIT_EXTERNALS_SVN", default_value = DEFAULT_SVN)]
    svn: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or update every external and refresh its links
    Update(commands::update::UpdateArgs),

    /// Show the working tree status of the externals
    Status(commands::status::StatusArgs),

    /// Show local changes of the externals
    Diff(commands::diff::DiffArgs),

    /// List the externals that have a checkout
    List(commands::list::ListArgs),

    /// Declare an external in git_externals.json
    Add(commands::add::AddArgs),

    /// Remove externals from git_externals.json
    Remove(commands::remove::RemoveArgs),

    /// Print the declared externals
    Info(commands::info::InfoArgs),

    /// Run a command in every external checkout
    Foreach(commands::foreach::ForeachArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// The output configuration selected by `--color`.
    pub fn output(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let ctx = Context {
            tools: Tools {
                git: self.git.clone(),
                svn: self.svn.clone(),
            },
            output: self.output(),
        };

        match self.command {
            Commands::Update(args) => commands::update::execute(args, &ctx),
            Commands::Status(args) => commands::status::execute(args, &ctx),
            Commands::Diff(args) => commands::diff::execute(args, &ctx),
            Commands::List(args) => commands::list::execute(args, &ctx),
            Commands::Add(args) => commands::add::execute(args, &ctx),
            Commands::Remove(args) => commands::remove::execute(args, &ctx),
            Commands::Info(args) => commands::info::execute(args, &ctx),
            Commands::Foreach(args) => commands::foreach::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Install the stderr logger. `RUST_LOG`, when set, refines `--log-level`.
fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder
        .parse_filters(level)
        .format_timestamp(None)
        .format_target(false);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // A second initialisation (e.g. in tests) keeps the first logger.
    let _ = builder.try_init();
}
