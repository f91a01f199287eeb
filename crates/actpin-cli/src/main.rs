mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, list::ListArgs, pin::PinArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "actpin",
    about = "Pin GitHub Action tags in workflow files to commit hashes",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root holding .actpin.yaml (default: auto-detect from .git/)
    #[arg(long, global = true, env = "ACTPIN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress at INFO level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress per-reference progress lines
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace version tags with the commit hashes they point to
    Pin(PinArgs),

    /// Show references still pinned to a version tag
    List(ListArgs),

    /// Validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cwd = root::working_dir();
    let root = root::resolve_root(cli.root.as_deref(), &cwd);

    let result = match cli.command {
        Commands::Pin(args) => cmd::pin::run(&root, &cwd, args, cli.json, cli.quiet),
        Commands::List(args) => cmd::list::run(&root, &cwd, args, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
