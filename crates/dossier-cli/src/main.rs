mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dossier_core::{CollectionMode, CollectionTarget};

#[derive(Debug, Parser)]
#[command(name = "dossier-cli")]
#[command(about = "Collect creator dossiers across social platforms")]
struct Cli {
    /// Platform capability table (YAML). Falls back to the built-in table.
    #[arg(long, global = true, env = "DOSSIER_PLATFORMS_PATH")]
    platforms_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Profile plus one bounded content batch
    Quick { platform: String, handle: String },
    /// Every stage: content, comments, transcripts, demographics, discovery
    Deep {
        platform: String,
        handle: String,
        #[arg(long)]
        no_comments: bool,
        #[arg(long)]
        no_transcripts: bool,
        #[arg(long)]
        no_discovery: bool,
    },
    /// Collect several platforms and merge them into one footprint
    Footprint {
        #[arg(long, default_value = "quick")]
        mode: CollectionMode,
        /// Targets as platform=handle
        #[arg(required = true)]
        targets: Vec<CollectionTarget>,
    },
    /// Look one handle up across platforms
    Discover {
        handle: String,
        #[arg(long, value_delimiter = ',')]
        platforms: Option<Vec<String>>,
    },
    /// List the platform capability table
    Platforms,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded before parsing so `.env` values reach clap's `env` fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let platforms_file = cli.platforms_file;

    match cli.command {
        Commands::Platforms => {
            let registry = commands::load_registry(platforms_file.as_deref())?;
            commands::list_platforms(&registry)
        }
        Commands::Quick { platform, handle } => {
            let orchestrator = commands::init(platforms_file)?;
            commands::run_quick(&orchestrator, &platform, &handle).await
        }
        Commands::Deep {
            platform,
            handle,
            no_comments,
            no_transcripts,
            no_discovery,
        } => {
            let orchestrator = commands::init(platforms_file)?;
            let options = dossier_collector::DeepOptions {
                include_comments: !no_comments,
                include_transcripts: !no_transcripts,
                include_discovery: !no_discovery,
                discovery_platforms: None,
            };
            commands::run_deep(&orchestrator, &platform, &handle, &options).await
        }
        Commands::Footprint { mode, targets } => {
            let orchestrator = commands::init(platforms_file)?;
            commands::run_footprint(orchestrator, &targets, mode).await
        }
        Commands::Discover { handle, platforms } => {
            let orchestrator = commands::init(platforms_file)?;
            commands::run_discover(&orchestrator, &handle, platforms.as_deref()).await
        }
    }
}
