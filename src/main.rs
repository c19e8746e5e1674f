//! `keg`: a standalone, client-side installer for precompiled macOS bottles.

use clap::{Parser, Subcommand};
use kegctl::commands::{self, Context};
use kegctl::error::KegError;

#[derive(Parser)]
#[command(name = "keg", version, about = "Standalone bottle package manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show formula metadata and local install state
    Info {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Open a formula's homepage in the default browser
    Home { name: String },
    /// Download bottles without installing them
    Fetch { names: Vec<String> },
    /// List installed packages
    List {
        #[arg(long = "versions")]
        versions: bool,
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        quiet: bool,
        #[arg(long)]
        columns: bool,
    },
    /// Show installed packages with a newer stable version available
    Outdated {
        #[arg(short, long)]
        quiet: bool,
    },
    /// Upgrade outdated, unpinned packages
    Upgrade { names: Vec<String> },
    /// Show a package's dependencies
    Deps {
        name: String,
        #[arg(long)]
        tree: bool,
        #[arg(long)]
        direct: bool,
    },
    /// Show installed packages that depend on the named one
    Uses { name: String },
    /// Show installed packages nothing else depends on
    Leaves,
    /// Show dependencies of installed packages that aren't themselves installed
    Missing { names: Vec<String> },
    /// Install formulae and their dependencies
    Install {
        names: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    /// Uninstall a package, cascading to orphaned dependencies
    Uninstall {
        names: Vec<String>,
        #[arg(long)]
        force: bool,
        #[arg(long = "ignore-dependencies")]
        no_dependencies: bool,
    },
    /// Link a package's opt-link and executables into the prefix
    Link {
        names: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    /// Remove a package's opt-link and executables without uninstalling it
    Unlink { names: Vec<String> },
    /// Switch a package's active version
    Switch { name: String, version: String },
    /// Toggle which versioned alias holds the shared bin-links
    Toggle { name: String },
    /// Pin a package to its current version, exempting it from upgrade/cleanup
    Pin { names: Vec<String> },
    /// Remove a package's pin
    Unpin { names: Vec<String> },
    /// Remove inactive installed versions
    Cleanup {
        names: Vec<String>,
        #[arg(short = 'n', long = "dry-run")]
        dry_run: bool,
    },
    /// Print the set of explicitly requested packages
    Export {
        #[arg(long)]
        versions: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        let code = if matches!(err, KegError::StoreNotConfigured) { 42 } else { 1 };
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> kegctl::error::Result<()> {
    let ctx = Context::new()?;

    match cli.command {
        Commands::Info { name, json } => commands::info::info(&ctx, &name, json).await,
        Commands::Home { name } => commands::home::home(&ctx, &name).await,
        Commands::Fetch { names } => commands::fetch::fetch(&ctx, &names).await,
        Commands::List { versions, json, quiet, columns } => {
            commands::list::list(&ctx, versions, json, quiet, columns)
        }
        Commands::Outdated { quiet } => commands::outdated::outdated(&ctx, quiet).await,
        Commands::Upgrade { names } => commands::upgrade::upgrade(&ctx, &names).await,
        Commands::Deps { name, tree, direct } => commands::deps::deps(&ctx, &name, tree, direct),
        Commands::Uses { name } => commands::uses::uses(&ctx, &name),
        Commands::Leaves => commands::leaves::leaves(&ctx),
        Commands::Missing { names } => commands::missing::missing(&ctx, &names),
        Commands::Install { names, force } => commands::install::install(&ctx, &names, force).await,
        Commands::Uninstall { names, force, no_dependencies } => {
            commands::uninstall::uninstall(&ctx, &names, force, no_dependencies)
        }
        Commands::Link { names, force } => commands::link::link(&ctx, &names, force),
        Commands::Unlink { names } => commands::unlink::unlink(&ctx, &names),
        Commands::Switch { name, version } => commands::switch::switch(&ctx, &name, &version),
        Commands::Toggle { name } => commands::toggle::toggle(&ctx, &name),
        Commands::Pin { names } => commands::pin::pin(&ctx, &names),
        Commands::Unpin { names } => commands::unpin::unpin(&ctx, &names),
        Commands::Cleanup { names, dry_run } => commands::cleanup::cleanup(&ctx, &names, dry_run),
        Commands::Export { versions } => commands::export::export(&ctx, versions),
    }
}
